use super::segment::{BackboneResidue, LoopSegment};
use super::{LoopClosureLibrary, LoopLibraryError};
use crate::core::geometry::Xform;
use crate::core::io::dump::write_backbone_pdb;
use crate::core::models::chain::ChainType;
use crate::core::models::fragment::Fragment;
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

type BinKey = [i64; 6];

/// Bin widths of the six-dimensional transform hash.
///
/// Rotations are binned by their rotation vector. Near a rotation angle of
/// π that vector flips sign, so two almost identical anchor transforms there
/// can fall into bins far apart and are only matched with a large radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LoopHashParams {
    /// Translation bin width, in Å.
    pub cart_resolution: f64,
    /// Rotation-vector bin width, in degrees.
    pub angle_resolution: f64,
}

impl Default for LoopHashParams {
    fn default() -> Self {
        Self {
            cart_resolution: 1.0,
            angle_resolution: 15.0,
        }
    }
}

impl LoopHashParams {
    fn bin(&self, xform: &Xform) -> BinKey {
        let t = xform.translation.vector / self.cart_resolution;
        let r = xform.rotation.scaled_axis().map(f64::to_degrees) / self.angle_resolution;
        [
            t.x.floor() as i64,
            t.y.floor() as i64,
            t.z.floor() as i64,
            r.x.floor() as i64,
            r.y.floor() as i64,
            r.z.floor() as i64,
        ]
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct LoopFile {
    loop_length: usize,
    #[serde(default)]
    segments: Vec<LoopSegment>,
}

#[derive(Debug, Default, Clone)]
struct LoopTable {
    segments: Vec<LoopSegment>,
    bins: HashMap<BinKey, Vec<usize>>,
}

impl LoopTable {
    fn insert(&mut self, key: BinKey, segment: LoopSegment) {
        self.bins.entry(key).or_default().push(self.segments.len());
        self.segments.push(segment);
    }

    fn for_each_match<F>(&self, center: BinKey, radius: usize, mut visit: F)
    where
        F: FnMut(&LoopSegment),
    {
        let r = i64::try_from(radius).unwrap_or(i64::MAX);
        let side = 2 * radius as u128 + 1;
        let neighbourhood = side.saturating_pow(6);

        let mut visit_bin = |indices: &Vec<usize>| {
            for &i in indices {
                visit(&self.segments[i]);
            }
        };

        if neighbourhood > self.bins.len() as u128 {
            for (key, indices) in &self.bins {
                let within = key
                    .iter()
                    .zip(center.iter())
                    .all(|(a, b)| (a - b).abs() <= r);
                if within {
                    visit_bin(indices);
                }
            }
        } else {
            let span = |d: usize| center[d].saturating_sub(r)..=center[d].saturating_add(r);
            for (a, b, c, d, e, f) in iproduct!(span(0), span(1), span(2), span(3), span(4), span(5)) {
                if let Some(indices) = self.bins.get(&[a, b, c, d, e, f]) {
                    visit_bin(indices);
                }
            }
        }
    }
}

/// File-backed loop library keyed by a coarse hash of the anchor-to-anchor transform.
///
/// One table is kept per supported loop length. Two anchor frames are
/// compatible with a stored loop when the bin of `lower⁻¹ · upper` lies within
/// a Chebyshev distance of `radius` bins from the loop's own bin.
#[derive(Debug, Clone)]
pub struct LoopHashLibrary {
    loop_sizes: Vec<usize>,
    params: LoopHashParams,
    tables: BTreeMap<usize, LoopTable>,
}

impl LoopHashLibrary {
    pub fn new(loop_sizes: Vec<usize>, params: LoopHashParams) -> Result<Self, LoopLibraryError> {
        if !(params.cart_resolution > 0.0) {
            return Err(LoopLibraryError::InvalidParameter(
                "cart-resolution must be positive",
            ));
        }
        if !(params.angle_resolution > 0.0) {
            return Err(LoopLibraryError::InvalidParameter(
                "angle-resolution must be positive",
            ));
        }
        let mut loop_sizes = loop_sizes;
        loop_sizes.sort_unstable();
        loop_sizes.dedup();
        if loop_sizes.contains(&0) {
            return Err(LoopLibraryError::UnsupportedLoopLength(0));
        }

        let tables = loop_sizes
            .iter()
            .map(|&size| (size, LoopTable::default()))
            .collect();
        Ok(Self {
            loop_sizes,
            params,
            tables,
        })
    }

    pub fn params(&self) -> &LoopHashParams {
        &self.params
    }

    /// Path of the table file for one loop length inside a database directory.
    pub fn table_path(db_path: &Path, loop_length: usize) -> PathBuf {
        db_path.join(format!("loops_{}.toml", loop_length))
    }

    /// Total number of stored segments.
    pub fn len(&self) -> usize {
        self.tables.values().map(|t| t.segments.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn segment_count(&self, loop_length: usize) -> usize {
        self.tables
            .get(&loop_length)
            .map_or(0, |t| t.segments.len())
    }

    /// Adds a segment to the table for its loop length.
    ///
    /// # Return
    ///
    /// Returns `Ok(false)` if the segment's anchors are degenerate and it was skipped.
    pub fn insert(&mut self, segment: LoopSegment) -> Result<bool, LoopLibraryError> {
        let loop_length = segment.loop_length();
        let table = self
            .tables
            .get_mut(&loop_length)
            .ok_or(LoopLibraryError::UnsupportedLoopLength(loop_length))?;
        let Some(xform) = segment.transform() else {
            return Ok(false);
        };
        table.insert(self.params.bin(&xform), segment);
        Ok(true)
    }

    /// Collects every loop window from the protein chains of a fragment.
    ///
    /// Windows never cross a chain break (a gap in residue numbering) or a
    /// residue lacking N, CA or C. Returns the number of segments added.
    pub fn harvest(&mut self, fragment: &Fragment) -> usize {
        let mut added = 0;
        for (_, chain) in fragment.chains_iter() {
            if chain.chain_type != ChainType::Protein {
                continue;
            }

            let mut runs: Vec<Vec<BackboneResidue>> = Vec::new();
            let mut last_number: Option<isize> = None;
            for &residue_id in chain.residues() {
                let Some(residue) = fragment.residue(residue_id) else {
                    continue;
                };
                let backbone = (
                    fragment.named_atom_position(residue_id, "N"),
                    fragment.named_atom_position(residue_id, "CA"),
                    fragment.named_atom_position(residue_id, "C"),
                );
                let (Some(n), Some(ca), Some(c)) = backbone else {
                    last_number = None;
                    continue;
                };

                let contiguous = last_number == Some(residue.residue_number - 1);
                if !contiguous || runs.is_empty() {
                    runs.push(Vec::new());
                }
                if let Some(run) = runs.last_mut() {
                    run.push(BackboneResidue::new(n, ca, c));
                }
                last_number = Some(residue.residue_number);
            }

            for run in &runs {
                for &size in &self.loop_sizes.clone() {
                    for window in run.windows(size + 2) {
                        let Some(segment) = LoopSegment::from_backbone(window) else {
                            continue;
                        };
                        if matches!(self.insert(segment), Ok(true)) {
                            added += 1;
                        }
                    }
                }
            }
            debug!(chain = %chain.id, runs = runs.len(), "Harvested loop windows");
        }
        added
    }

    /// Loads `loops_<L>.toml` for every supported size from `db_path`.
    pub fn load(&mut self, db_path: &Path) -> Result<(), LoopLibraryError> {
        for size in self.loop_sizes.clone() {
            let path = Self::table_path(db_path, size);
            let content = fs::read_to_string(&path).map_err(|e| LoopLibraryError::Io {
                path: path.clone(),
                source: e,
            })?;
            let file: LoopFile = toml::from_str(&content).map_err(|e| LoopLibraryError::Toml {
                path: path.clone(),
                source: e,
            })?;
            if file.loop_length != size {
                return Err(LoopLibraryError::LengthMismatch {
                    path,
                    expected: size,
                    found: file.loop_length,
                });
            }

            let mut skipped = 0;
            for segment in file.segments {
                if segment.loop_length() != size {
                    return Err(LoopLibraryError::LengthMismatch {
                        path,
                        expected: size,
                        found: segment.loop_length(),
                    });
                }
                if !self.insert(segment)? {
                    skipped += 1;
                }
            }
            if skipped > 0 {
                warn!(path = %path.display(), skipped, "Skipped loops with degenerate anchors");
            }
            debug!(loop_length = size, segments = self.segment_count(size), "Loaded loop table");
        }
        info!(
            path = %db_path.display(),
            sizes = ?self.loop_sizes,
            segments = self.len(),
            "Loop library loaded"
        );
        Ok(())
    }

    /// Writes one `loops_<L>.toml` per supported size into `db_path`, creating it if needed.
    pub fn save(&self, db_path: &Path) -> Result<(), LoopLibraryError> {
        fs::create_dir_all(db_path).map_err(|e| LoopLibraryError::Io {
            path: db_path.to_path_buf(),
            source: e,
        })?;
        for (&size, table) in &self.tables {
            let file = LoopFile {
                loop_length: size,
                segments: table.segments.clone(),
            };
            let content = toml::to_string(&file).map_err(|e| LoopLibraryError::Serialize {
                loop_length: size,
                source: e,
            })?;
            let path = Self::table_path(db_path, size);
            fs::write(&path, content).map_err(|e| LoopLibraryError::Io { path, source: e })?;
        }
        Ok(())
    }

    fn for_each_match<F>(
        &self,
        lower: &Xform,
        upper: &Xform,
        loop_sizes: &[usize],
        radius: usize,
        mut visit: F,
    ) where
        F: FnMut(&LoopSegment),
    {
        let key = self.params.bin(&(lower.inverse() * upper));
        for size in loop_sizes {
            if let Some(table) = self.tables.get(size) {
                table.for_each_match(key, radius, &mut visit);
            }
        }
    }
}

impl LoopClosureLibrary for LoopHashLibrary {
    fn loop_sizes(&self) -> &[usize] {
        &self.loop_sizes
    }

    fn count_compatible(
        &self,
        lower: &Xform,
        upper: &Xform,
        loop_sizes: &[usize],
        radius: usize,
    ) -> usize {
        let mut count = 0;
        self.for_each_match(lower, upper, loop_sizes, radius, |_| count += 1);
        count
    }

    fn dump_examples(
        &self,
        lower: &Xform,
        upper: &Xform,
        loop_sizes: &[usize],
        radius: usize,
        out_prefix: &str,
    ) -> Result<usize, LoopLibraryError> {
        let mut matches = Vec::new();
        self.for_each_match(lower, upper, loop_sizes, radius, |segment| {
            matches.push(segment.clone());
        });

        for (i, segment) in matches.iter().enumerate() {
            let path = PathBuf::from(format!(
                "{}_loop{}_{:03}.pdb",
                out_prefix,
                segment.loop_length(),
                i + 1
            ));
            write_backbone_pdb(&path, &segment.placed(lower))
                .map_err(|e| LoopLibraryError::Io { path, source: e })?;
        }
        Ok(matches.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::xform_from_parts;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;
    use tempfile::tempdir;

    fn backbone(i: usize) -> BackboneResidue {
        let angle = i as f64 * 100f64.to_radians();
        let rise = i as f64 * 1.5;
        let at = |r: f64, phase: f64, dz: f64| {
            Point3::new(r * (angle + phase).cos(), r * (angle + phase).sin(), rise + dz)
        };
        BackboneResidue::new(at(1.55, -0.45, -0.8), at(2.3, 0.0, 0.0), at(1.6, 0.5, 0.9))
    }

    fn helix_fragment(residue_count: usize) -> Fragment {
        let mut fragment = Fragment::new();
        let chain = fragment.add_chain('A', ChainType::Protein);
        for i in 0..residue_count {
            let residue = fragment.add_residue(chain, i as isize + 1, "ALA").unwrap();
            let bb = backbone(i);
            for (name, pos) in [("N", bb.n()), ("CA", bb.ca()), ("C", bb.c())] {
                fragment
                    .add_atom_to_residue(residue, Atom::new(name, residue, pos))
                    .unwrap();
            }
        }
        fragment
    }

    fn anchors(start: usize, loop_length: usize) -> (Xform, Xform) {
        (
            backbone(start).stub().unwrap(),
            backbone(start + loop_length + 1).stub().unwrap(),
        )
    }

    #[test]
    fn new_rejects_non_positive_resolution() {
        let params = LoopHashParams {
            cart_resolution: 0.0,
            angle_resolution: 10.0,
        };
        assert!(matches!(
            LoopHashLibrary::new(vec![3], params),
            Err(LoopLibraryError::InvalidParameter(_))
        ));
    }

    #[test]
    fn harvest_collects_every_window() {
        let mut library = LoopHashLibrary::new(vec![3, 4], LoopHashParams::default()).unwrap();
        let added = library.harvest(&helix_fragment(10));
        // 10 residues: 6 windows of 5 residues and 5 windows of 6 residues
        assert_eq!(added, 11);
        assert_eq!(library.segment_count(3), 6);
        assert_eq!(library.segment_count(4), 5);
    }

    #[test]
    fn harvested_geometry_is_found_again() {
        let mut library = LoopHashLibrary::new(vec![3], LoopHashParams::default()).unwrap();
        library.harvest(&helix_fragment(8));

        let (lower, upper) = anchors(0, 3);
        // An ideal helix repeats the same anchor transform for every window.
        assert_eq!(library.count_compatible(&lower, &upper, &[3], 0), 4);
        assert_eq!(library.count_compatible(&lower, &upper, &[4], 0), 0);

        let moved = xform_from_parts([20.0, -5.0, 3.0], [0.4, 1.2, -0.8]);
        assert_eq!(
            library.count_compatible(&(moved * lower), &(moved * upper), &[3], 0),
            4
        );
    }

    #[test]
    fn count_is_monotone_in_radius_and_scan_matches_enumeration() {
        let mut library = LoopHashLibrary::new(
            vec![3, 4, 5],
            LoopHashParams {
                cart_resolution: 0.5,
                angle_resolution: 5.0,
            },
        )
        .unwrap();
        library.harvest(&helix_fragment(12));
        let lower = backbone(0).stub().unwrap();
        let upper = xform_from_parts([1.0, 0.5, 0.0], [0.0, 0.0, 0.3]) * backbone(5).stub().unwrap();

        let mut previous = 0;
        for radius in 0..6 {
            let count = library.count_compatible(&lower, &upper, &[3, 4, 5], radius);
            assert!(count >= previous);
            previous = count;
        }
        assert_eq!(
            library.count_compatible(&lower, &upper, &[3, 4, 5], 10_000),
            library.len()
        );
        for radius in [usize::MAX / 2 + 1, usize::MAX] {
            assert_eq!(
                library.count_compatible(&lower, &upper, &[3, 4, 5], radius),
                library.len()
            );
        }
    }

    #[test]
    fn save_and_load_preserve_counts() {
        let dir = tempdir().unwrap();
        let mut library = LoopHashLibrary::new(vec![3, 4], LoopHashParams::default()).unwrap();
        library.harvest(&helix_fragment(9));
        library.save(dir.path()).unwrap();
        assert!(LoopHashLibrary::table_path(dir.path(), 3).exists());

        let mut loaded = LoopHashLibrary::new(vec![3, 4], LoopHashParams::default()).unwrap();
        loaded.load(dir.path()).unwrap();
        assert_eq!(loaded.len(), library.len());

        let (lower, upper) = anchors(1, 4);
        assert_eq!(
            loaded.count_compatible(&lower, &upper, &[4], 1),
            library.count_compatible(&lower, &upper, &[4], 1)
        );
    }

    #[test]
    fn load_reports_missing_table() {
        let dir = tempdir().unwrap();
        let mut library = LoopHashLibrary::new(vec![3], LoopHashParams::default()).unwrap();
        let err = library.load(dir.path()).unwrap_err();
        assert!(matches!(err, LoopLibraryError::Io { .. }));
    }

    #[test]
    fn load_rejects_table_of_wrong_length() {
        let dir = tempdir().unwrap();
        let mut library = LoopHashLibrary::new(vec![4], LoopHashParams::default()).unwrap();
        library.harvest(&helix_fragment(8));
        library.save(dir.path()).unwrap();
        fs::rename(
            LoopHashLibrary::table_path(dir.path(), 4),
            LoopHashLibrary::table_path(dir.path(), 3),
        )
        .unwrap();

        let mut wrong = LoopHashLibrary::new(vec![3], LoopHashParams::default()).unwrap();
        let err = wrong.load(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            LoopLibraryError::LengthMismatch {
                expected: 3,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn insert_rejects_unsupported_length() {
        let mut library = LoopHashLibrary::new(vec![3], LoopHashParams::default()).unwrap();
        let residues: Vec<_> = (0..4).map(backbone).collect();
        let segment = LoopSegment::from_backbone(&residues).unwrap();
        assert!(matches!(
            library.insert(segment),
            Err(LoopLibraryError::UnsupportedLoopLength(2))
        ));
    }

    #[test]
    fn dump_examples_writes_one_file_per_match() {
        let dir = tempdir().unwrap();
        let mut library = LoopHashLibrary::new(vec![3], LoopHashParams::default()).unwrap();
        library.harvest(&helix_fragment(6));
        let (lower, upper) = anchors(0, 3);

        let prefix = dir.path().join("example");
        let written = library
            .dump_examples(&lower, &upper, &[3], 0, prefix.to_str().unwrap())
            .unwrap();
        assert_eq!(written, 2);
        assert!(dir.path().join("example_loop3_001.pdb").exists());
        assert!(dir.path().join("example_loop3_002.pdb").exists());
    }
}
