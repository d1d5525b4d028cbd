use super::potentials::{LINKER_SCORE_SCALE, linker_count_score};
use super::{RigidScore, ScoreError};
use crate::core::geometry::{Xform, backbone_stub};
use crate::core::loops::{LoopClosureLibrary, LoopLibraryError};
use crate::core::models::chain::ChainType;
use crate::core::models::fragment::Fragment;
use crate::core::models::ids::ResidueId;
use std::sync::Arc;
use tracing::{debug, info};

/// Shortest loop the linker score will look for.
pub const MIN_LOOP_LENGTH: usize = 3;

/// Backbone frame of a chain's first or last residue, in the fragment's local frame.
#[derive(Debug, Clone, Copy)]
pub struct Terminus {
    pub chain: char,
    pub residue_number: isize,
    pub stub: Xform,
}

#[derive(Debug, Default, Clone)]
struct Termini {
    /// Chain starts, where a loop would arrive.
    uppers: Vec<Terminus>,
    /// Chain ends, where a loop would leave from.
    lowers: Vec<Terminus>,
}

fn terminus(fragment: &Fragment, residue_id: ResidueId, chain: char) -> Option<Terminus> {
    let residue = fragment.residue(residue_id)?;
    let n = fragment.named_atom_position(residue_id, "N")?;
    let ca = fragment.named_atom_position(residue_id, "CA")?;
    let c = fragment.named_atom_position(residue_id, "C")?;
    Some(Terminus {
        chain,
        residue_number: residue.residue_number,
        stub: backbone_stub(&n, &ca, &c)?,
    })
}

fn collect_termini(fragment: &Fragment) -> Termini {
    let mut termini = Termini::default();
    for (_, chain) in fragment.chains_iter() {
        if chain.chain_type != ChainType::Protein {
            continue;
        }
        let mut framed = chain
            .residues()
            .iter()
            .filter_map(|&residue_id| terminus(fragment, residue_id, chain.id));
        let Some(first) = framed.next() else {
            continue;
        };
        let last = framed.last().unwrap_or(first);
        termini.uppers.push(first);
        termini.lowers.push(last);
    }
    termini
}

/// Rewards placements where a short loop could join a chain end of one
/// fragment to a chain start of the other.
///
/// For every transform pair, each (lower of one fragment, upper of the other)
/// combination in both directions contributes
/// `linker_count_score(count of compatible loops)`. The sum is multiplied by
/// [`LINKER_SCORE_SCALE`].
pub struct LinkerScore {
    loop_sizes: Vec<usize>,
    lookup_radius: usize,
    tag: String,
    termini1: Termini,
    termini2: Termini,
    library: Arc<dyn LoopClosureLibrary>,
}

impl std::fmt::Debug for LinkerScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkerScore")
            .field("loop_sizes", &self.loop_sizes)
            .field("lookup_radius", &self.lookup_radius)
            .field("tag", &self.tag)
            .field("termini1", &self.termini1)
            .field("termini2", &self.termini2)
            .finish_non_exhaustive()
    }
}

impl LinkerScore {
    /// Builds the score for loops of length `3..=max_loop_len`.
    ///
    /// # Errors
    ///
    /// Returns an error if `library` does not hold one of the requested loop lengths.
    pub fn new(
        fragment1: &Fragment,
        fragment2: &Fragment,
        max_loop_len: usize,
        lookup_radius: usize,
        tag: &str,
        library: Arc<dyn LoopClosureLibrary>,
    ) -> Result<Self, ScoreError> {
        let loop_sizes: Vec<usize> = (MIN_LOOP_LENGTH..=max_loop_len).collect();
        if let Some(&missing) = loop_sizes.iter().find(|&&size| !library.supports(size)) {
            return Err(LoopLibraryError::UnsupportedLoopLength(missing).into());
        }

        let termini1 = collect_termini(fragment1);
        let termini2 = collect_termini(fragment2);
        info!(
            lowers1 = termini1.lowers.len(),
            uppers1 = termini1.uppers.len(),
            lowers2 = termini2.lowers.len(),
            uppers2 = termini2.uppers.len(),
            "Linker score termini"
        );

        Ok(Self {
            loop_sizes,
            lookup_radius,
            tag: tag.to_string(),
            termini1,
            termini2,
            library,
        })
    }

    pub fn loop_sizes(&self) -> &[usize] {
        &self.loop_sizes
    }

    pub fn lookup_radius(&self) -> usize {
        self.lookup_radius
    }

    /// Terminus pairs to test under placements `x1` and `x2`, as
    /// `(lower, upper)` frames in the global frame.
    fn placed_pairs<'s>(
        &'s self,
        x1: &'s Xform,
        x2: &'s Xform,
    ) -> impl Iterator<Item = (&'s Terminus, Xform, &'s Terminus, Xform)> + 's {
        let forward = self.termini1.lowers.iter().flat_map(move |lower| {
            self.termini2
                .uppers
                .iter()
                .map(move |upper| (lower, x1 * lower.stub, upper, x2 * upper.stub))
        });
        let backward = self.termini2.lowers.iter().flat_map(move |lower| {
            self.termini1
                .uppers
                .iter()
                .map(move |upper| (lower, x2 * lower.stub, upper, x1 * upper.stub))
        });
        forward.chain(backward)
    }

    /// Writes every compatible loop between the fragments placed by `x1` and `x2`.
    ///
    /// Files are named `{out_prefix}{tag}_{lower chain}{lower residue}_{upper chain}{upper residue}…`.
    /// Returns whether anything was written.
    pub fn dump_linkers(&self, x1: &Xform, x2: &Xform, out_prefix: &str) -> Result<bool, ScoreError> {
        let mut dumped = 0;
        for (lower, lower_frame, upper, upper_frame) in self.placed_pairs(x1, x2) {
            let prefix = format!(
                "{}{}_{}{}_{}{}",
                out_prefix,
                self.tag,
                lower.chain,
                lower.residue_number,
                upper.chain,
                upper.residue_number
            );
            dumped += self.library.dump_examples(
                &lower_frame,
                &upper_frame,
                &self.loop_sizes,
                self.lookup_radius,
                &prefix,
            )?;
        }
        debug!(dumped, tag = %self.tag, "Dumped linker examples");
        Ok(dumped > 0)
    }
}

impl RigidScore for LinkerScore {
    fn score(&self, x1s: &[Xform], x2s: &[Xform]) -> Result<f64, ScoreError> {
        if self.loop_sizes.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for x1 in x1s {
            for x2 in x2s {
                for (_, lower, _, upper) in self.placed_pairs(x1, x2) {
                    let count = self.library.count_compatible(
                        &lower,
                        &upper,
                        &self.loop_sizes,
                        self.lookup_radius,
                    );
                    total += linker_count_score(count);
                }
            }
        }
        Ok(LINKER_SCORE_SCALE * total)
    }

    fn type_name(&self) -> &'static str {
        "LinkerScore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::xform_from_parts;
    use crate::core::loops::{BackboneResidue, LoopHashLibrary, LoopHashParams};
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FixedCountLibrary {
        sizes: Vec<usize>,
        count: usize,
        queries: Mutex<Vec<Vec<usize>>>,
    }

    impl FixedCountLibrary {
        fn new(sizes: Vec<usize>, count: usize) -> Self {
            Self {
                sizes,
                count,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    impl LoopClosureLibrary for FixedCountLibrary {
        fn loop_sizes(&self) -> &[usize] {
            &self.sizes
        }

        fn count_compatible(&self, _: &Xform, _: &Xform, loop_sizes: &[usize], _: usize) -> usize {
            self.queries.lock().unwrap().push(loop_sizes.to_vec());
            self.count
        }

        fn dump_examples(
            &self,
            _: &Xform,
            _: &Xform,
            _: &[usize],
            _: usize,
            _: &str,
        ) -> Result<usize, LoopLibraryError> {
            Ok(self.count)
        }
    }

    fn helix_backbone(i: usize) -> BackboneResidue {
        let angle = i as f64 * 100f64.to_radians();
        let rise = i as f64 * 1.5;
        let at = |r: f64, phase: f64, dz: f64| {
            Point3::new(r * (angle + phase).cos(), r * (angle + phase).sin(), rise + dz)
        };
        BackboneResidue::new(at(1.55, -0.45, -0.8), at(2.3, 0.0, 0.0), at(1.6, 0.5, 0.9))
    }

    fn helix_chain(fragment: &mut Fragment, id: char, range: std::ops::Range<usize>) {
        let chain = fragment.add_chain(id, ChainType::Protein);
        for i in range {
            let residue = fragment.add_residue(chain, i as isize + 1, "ALA").unwrap();
            let bb = helix_backbone(i);
            for (name, pos) in [("N", bb.n()), ("CA", bb.ca()), ("C", bb.c())] {
                fragment.add_atom_to_residue(residue, Atom::new(name, residue, pos));
            }
        }
    }

    fn helix_fragment(id: char, range: std::ops::Range<usize>) -> Fragment {
        let mut fragment = Fragment::new();
        helix_chain(&mut fragment, id, range);
        fragment
    }

    #[test]
    fn fixed_count_library_gives_closed_form_score() {
        let f1 = helix_fragment('A', 0..4);
        let f2 = helix_fragment('B', 10..14);
        let n = 7;
        let library = Arc::new(FixedCountLibrary::new(vec![3], n));
        let score = LinkerScore::new(&f1, &f2, 3, 2, "t", library.clone()).unwrap();

        let identity = [Xform::identity()];
        let value = score.score(&identity, &identity).unwrap();
        let expected = 10.0 * linker_count_score(n) * 2.0;
        assert!((value - expected).abs() < 1e-12);

        let queries = library.queries.lock().unwrap();
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|sizes| sizes == &vec![3]));
    }

    #[test]
    fn every_terminus_pair_and_transform_pair_contributes() {
        let mut f1 = Fragment::new();
        helix_chain(&mut f1, 'A', 0..4);
        helix_chain(&mut f1, 'B', 20..24);
        let f2 = helix_fragment('C', 40..44);
        let library = Arc::new(FixedCountLibrary::new(vec![3, 4], 1));
        let score = LinkerScore::new(&f1, &f2, 4, 0, "t", library).unwrap();

        let x1s = [Xform::identity(), xform_from_parts([1.0, 0.0, 0.0], [0.0; 3])];
        let x2s = [Xform::identity()];
        // 2 lowers of f1 x 1 upper of f2 + 1 lower of f2 x 2 uppers of f1, for 2 transform pairs
        let expected = 10.0 * linker_count_score(1) * 4.0 * 2.0;
        assert!((score.score(&x1s, &x2s).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn unsupported_loop_size_fails_construction() {
        let f1 = helix_fragment('A', 0..4);
        let f2 = helix_fragment('B', 10..14);
        let library = Arc::new(FixedCountLibrary::new(vec![3, 4], 1));
        let err = LinkerScore::new(&f1, &f2, 6, 1, "t", library).unwrap_err();
        assert!(matches!(
            err,
            ScoreError::LoopLibrary {
                source: LoopLibraryError::UnsupportedLoopLength(5)
            }
        ));
    }

    #[test]
    fn non_protein_chains_have_no_termini() {
        let mut f1 = Fragment::new();
        let chain = f1.add_chain('L', ChainType::Ligand);
        let residue = f1.add_residue(chain, 1, "LIG").unwrap();
        let bb = helix_backbone(0);
        for (name, pos) in [("N", bb.n()), ("CA", bb.ca()), ("C", bb.c())] {
            f1.add_atom_to_residue(residue, Atom::new(name, residue, pos));
        }
        let f2 = helix_fragment('B', 0..4);
        let library = Arc::new(FixedCountLibrary::new(vec![3], 5));
        let score = LinkerScore::new(&f1, &f2, 3, 1, "t", library).unwrap();
        let identity = [Xform::identity()];
        assert_eq!(score.score(&identity, &identity).unwrap(), 0.0);
    }

    #[test]
    fn score_is_non_negative_and_monotone_in_radius() {
        let mut library = LoopHashLibrary::new(
            vec![3, 4, 5],
            LoopHashParams {
                cart_resolution: 0.75,
                angle_resolution: 10.0,
            },
        )
        .unwrap();
        library.harvest(&helix_fragment('H', 0..16));
        let library: Arc<dyn LoopClosureLibrary> = Arc::new(library);

        let f1 = helix_fragment('A', 0..4);
        let f2 = helix_fragment('B', 8..12);
        let x1s = [Xform::identity()];
        let x2s = [
            Xform::identity(),
            xform_from_parts([0.6, -0.4, 0.3], [0.05, 0.02, -0.04]),
            xform_from_parts([5.0, 5.0, 5.0], [0.5, 0.5, 0.5]),
        ];

        let mut previous = 0.0;
        for radius in 0..5 {
            let score = LinkerScore::new(&f1, &f2, 5, radius, "t", Arc::clone(&library)).unwrap();
            let value = score.score(&x1s, &x2s).unwrap();
            assert!(value >= 0.0);
            assert!(value >= previous);
            previous = value;
        }
        // f1 ends at residue 3 and f2 starts at residue 8, four residues apart.
        assert!(previous > 0.0);
    }

    #[test]
    fn dump_linkers_reports_whether_files_were_written() {
        let dir = tempdir().unwrap();
        let mut library = LoopHashLibrary::new(vec![3, 4], LoopHashParams::default()).unwrap();
        library.harvest(&helix_fragment('H', 0..10));
        let library: Arc<dyn LoopClosureLibrary> = Arc::new(library);

        let f1 = helix_fragment('A', 0..4);
        let f2 = helix_fragment('B', 8..12);
        let score = LinkerScore::new(&f1, &f2, 4, 1, "pose1", library).unwrap();
        let prefix = dir.path().join("out_");
        let prefix = prefix.to_str().unwrap();

        let identity = Xform::identity();
        assert!(score.dump_linkers(&identity, &identity, prefix).unwrap());
        let written = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("out_pose1_A4_B9"))
            .count();
        assert!(written > 0);

        let far = xform_from_parts([200.0, 0.0, 0.0], [0.0; 3]);
        assert!(!score.dump_linkers(&identity, &far, prefix).unwrap());
    }
}
