use crate::core::loops::{LoopHashLibrary, LoopHashParams};
use crate::core::models::fragment::Fragment;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument, warn};

/// Harvests loop windows of every length in `loop_sizes` from `fragments`.
///
/// The returned library is not written to disk; call [`LoopHashLibrary::save`]
/// to persist it.
#[instrument(skip_all, name = "library_workflow")]
pub fn build(
    fragments: &[Fragment],
    loop_sizes: Vec<usize>,
    params: LoopHashParams,
    reporter: &ProgressReporter,
) -> Result<LoopHashLibrary, EngineError> {
    let mut library = LoopHashLibrary::new(loop_sizes, params)?;

    reporter.phase("Harvesting Loops", || {
        reporter.report(Progress::TaskStart {
            total_steps: fragments.len() as u64,
        });
        for (index, fragment) in fragments.iter().enumerate() {
            let added = library.harvest(fragment);
            if added == 0 {
                warn!(fragment = index, "No loop windows found in fragment.");
            }
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        Ok::<(), EngineError>(())
    })?;

    info!(segments = library.len(), "Loop library built.");
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loops::LoopLibraryError;
    use crate::core::models::atom::Atom;
    use crate::core::models::chain::ChainType;
    use nalgebra::Point3;
    use tempfile::tempdir;

    fn helix_fragment(length: usize) -> Fragment {
        let mut fragment = Fragment::new();
        let chain = fragment.add_chain('A', ChainType::Protein);
        for i in 0..length {
            let residue = fragment.add_residue(chain, i as isize + 1, "GLY").unwrap();
            let angle = i as f64 * 100f64.to_radians();
            let point = |r: f64, phase: f64, dz: f64| {
                Point3::new(
                    r * (angle + phase).cos(),
                    r * (angle + phase).sin(),
                    i as f64 * 1.5 + dz,
                )
            };
            for (name, pos) in [
                ("N", point(1.55, -0.45, -0.8)),
                ("CA", point(2.3, 0.0, 0.0)),
                ("C", point(1.6, 0.5, 0.9)),
            ] {
                fragment.add_atom_to_residue(residue, Atom::new(name, residue, pos));
            }
        }
        fragment
    }

    #[test]
    fn build_harvests_all_fragments_and_saves() {
        let fragments = vec![helix_fragment(8), helix_fragment(6)];
        let reporter = ProgressReporter::new();
        let library = build(&fragments, vec![3, 4], LoopHashParams::default(), &reporter).unwrap();

        // Windows span L + 2 residues: 4 + 2 for L = 3 and 3 + 1 for L = 4.
        assert_eq!(library.segment_count(3), 6);
        assert_eq!(library.segment_count(4), 4);
        assert_eq!(library.len(), 10);

        let dir = tempdir().unwrap();
        library.save(dir.path()).unwrap();
        assert!(LoopHashLibrary::table_path(dir.path(), 3).exists());
        assert!(LoopHashLibrary::table_path(dir.path(), 4).exists());
    }

    #[test]
    fn build_rejects_zero_loop_length() {
        let err = build(
            &[helix_fragment(5)],
            vec![0],
            LoopHashParams::default(),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::LoopLibrary {
                source: LoopLibraryError::UnsupportedLoopLength(0)
            }
        ));
    }
}
