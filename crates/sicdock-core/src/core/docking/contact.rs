use super::potentials::contact_decay;
use super::{RigidScore, ScoreError};
use crate::core::geometry::{CbCreationParams, Xform, calculate_cb_position, relative_xform};
use crate::core::models::fragment::Fragment;
use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::spatial::{SpatialIndex, WeightedPoint};
use std::collections::HashMap;
use tracing::debug;

/// Representative contact point of a residue: its CB, or a virtual CB built
/// from the backbone when the residue has none. Residues with neither are skipped.
fn representative_point(fragment: &Fragment, residue_id: ResidueId) -> Option<nalgebra::Point3<f64>> {
    if let Some(cb) = fragment.named_atom_position(residue_id, "CB") {
        return Some(cb);
    }
    let n = fragment.named_atom_position(residue_id, "N")?;
    let ca = fragment.named_atom_position(residue_id, "CA")?;
    let c = fragment.named_atom_position(residue_id, "C")?;
    Some(calculate_cb_position(&n, &ca, &c, &CbCreationParams::default()))
}

/// One point per residue, weight 1.
pub fn representative_points(fragment: &Fragment) -> Vec<WeightedPoint> {
    fragment
        .residues_iter()
        .filter_map(|(residue_id, _)| representative_point(fragment, residue_id))
        .map(|position| WeightedPoint::new(position, 1.0))
        .collect()
}

/// Points for the atoms named in `weights`; zero weights are dropped.
pub fn weighted_points(
    fragment: &Fragment,
    weights: &HashMap<AtomId, f64>,
) -> Result<Vec<WeightedPoint>, ScoreError> {
    let mut entries: Vec<_> = weights.iter().filter(|&(_, &w)| w != 0.0).collect();
    // Stable order keeps summation order reproducible.
    entries.sort_by_key(|&(id, _)| *id);
    entries
        .into_iter()
        .map(|(&atom_id, &weight)| {
            fragment
                .atom_position(atom_id)
                .map(|position| WeightedPoint::new(position, weight))
                .ok_or(ScoreError::AtomNotFound(atom_id))
        })
        .collect()
}

/// Steric contact score between two point clouds.
///
/// The cloud with more points is placed in a [`SpatialIndex`]; the other one is
/// iterated as queries. Each pair closer than the contact distance contributes
/// `contact_decay(d², clash, contact) · w_query · w_indexed`.
#[derive(Debug)]
pub struct CbScore {
    index_first: bool,
    clash_dis: f64,
    contact_dis: f64,
    queries: Vec<WeightedPoint>,
    index: SpatialIndex,
}

impl CbScore {
    pub fn new(fragment1: &Fragment, fragment2: &Fragment, clash_dis: f64, contact_dis: f64) -> Self {
        Self::from_points(
            representative_points(fragment1),
            representative_points(fragment2),
            clash_dis,
            contact_dis,
        )
    }

    pub fn with_weights(
        fragment1: &Fragment,
        fragment2: &Fragment,
        clash_dis: f64,
        contact_dis: f64,
        weights1: &HashMap<AtomId, f64>,
        weights2: &HashMap<AtomId, f64>,
    ) -> Result<Self, ScoreError> {
        Ok(Self::from_points(
            weighted_points(fragment1, weights1)?,
            weighted_points(fragment2, weights2)?,
            clash_dis,
            contact_dis,
        ))
    }

    pub fn from_points(
        points1: Vec<WeightedPoint>,
        points2: Vec<WeightedPoint>,
        clash_dis: f64,
        contact_dis: f64,
    ) -> Self {
        let index_first = points1.len() >= points2.len();
        let (indexed, queries) = if index_first {
            (points1, points2)
        } else {
            (points2, points1)
        };
        debug!(
            indexed = indexed.len(),
            queries = queries.len(),
            index_first,
            "Built contact score index"
        );
        Self {
            index_first,
            clash_dis,
            contact_dis,
            queries,
            index: SpatialIndex::new(indexed, contact_dis),
        }
    }

    /// Whether fragment 1 is the indexed side.
    pub fn indexes_first(&self) -> bool {
        self.index_first
    }

    fn score_pair(&self, x1: &Xform, x2: &Xform) -> f64 {
        let placement = if self.index_first {
            relative_xform(x1, x2)
        } else {
            relative_xform(x2, x1)
        };

        let mut total = 0.0;
        for query in &self.queries {
            self.index.visit(&placement, query, |contact| {
                total += contact_decay(contact.dist_sq, self.clash_dis, self.contact_dis)
                    * contact.query_weight
                    * contact.indexed_weight;
            });
        }
        total
    }
}

impl RigidScore for CbScore {
    fn score(&self, x1s: &[Xform], x2s: &[Xform]) -> Result<f64, ScoreError> {
        let mut total = 0.0;
        for x1 in x1s {
            for x2 in x2s {
                total += self.score_pair(x1, x2);
            }
        }
        Ok(total)
    }

    fn type_name(&self) -> &'static str {
        "CBScore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::xform_from_parts;
    use crate::core::models::atom::Atom;
    use crate::core::models::chain::ChainType;
    use nalgebra::Point3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn points(coords: &[[f64; 3]]) -> Vec<WeightedPoint> {
        coords
            .iter()
            .map(|&c| WeightedPoint::new(Point3::from(c), 1.0))
            .collect()
    }

    fn random_xform(rng: &mut StdRng) -> Xform {
        xform_from_parts(
            [
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
            ],
            [
                rng.gen_range(-1.5..1.5),
                rng.gen_range(-1.5..1.5),
                rng.gen_range(-1.5..1.5),
            ],
        )
    }

    fn random_cloud(rng: &mut StdRng, count: usize) -> Vec<WeightedPoint> {
        (0..count)
            .map(|_| {
                WeightedPoint::new(
                    Point3::new(
                        rng.gen_range(-6.0..6.0),
                        rng.gen_range(-6.0..6.0),
                        rng.gen_range(-6.0..6.0),
                    ),
                    rng.gen_range(0.5..2.0),
                )
            })
            .collect()
    }

    #[test]
    fn hand_computed_identity_score_for_four_by_six_points() {
        let a = points(&[
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [0.0, 10.0, 0.0],
            [20.0, 20.0, 20.0],
        ]);
        let b = points(&[
            [3.0, 0.0, 0.0],
            [0.0, 5.0, 0.0],
            [0.0, 0.0, 4.5],
            [15.0, 0.0, 0.0],
            [10.0, 0.0, 5.0],
            [0.0, 10.0, 7.0],
        ]);
        let expected: f64 = a
            .iter()
            .flat_map(|p| b.iter().map(move |q| (p.position - q.position).norm_squared()))
            .map(|d2| contact_decay(d2, 4.0, 6.0))
            .sum();
        // Pairs within 6 Å: (a0,b0)=3 → 1, (a0,b2)=4.5 → 0.87890625, and four pairs at
        // 5 Å → 0.5625 each: (a0,b1), (a1,b3), (a1,b4), (a2,b1). Everything else is 7 Å or more.
        let by_hand = 1.0 + 0.87890625 + 4.0 * 0.5625;
        assert!((expected - by_hand).abs() < 1e-12);

        let score = CbScore::from_points(a, b, 4.0, 6.0);
        assert!(!score.indexes_first());
        let identity = [Xform::identity()];
        let value = score.score(&identity, &identity).unwrap();
        assert!((value - by_hand).abs() < 1e-6);
    }

    #[test]
    fn stacked_points_score_every_pair() {
        let stacked = points(&[[0.0, 0.0, 0.0]; 100]);
        let single = points(&[[0.0, 0.0, 2.0]]);
        let score = CbScore::from_points(stacked, single, 4.0, 8.0);
        assert!(score.indexes_first());

        let total = score.score(&[Xform::identity()], &[Xform::identity()]).unwrap();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn score_is_symmetric_when_fragments_are_swapped() {
        let mut rng = StdRng::seed_from_u64(7);
        let cloud1 = random_cloud(&mut rng, 25);
        let cloud2 = random_cloud(&mut rng, 12);

        let forward = CbScore::from_points(cloud1.clone(), cloud2.clone(), 3.0, 6.0);
        let swapped = CbScore::from_points(cloud2, cloud1, 3.0, 6.0);
        assert!(forward.indexes_first());
        assert!(!swapped.indexes_first());

        for _ in 0..20 {
            let x1s: Vec<_> = (0..2).map(|_| random_xform(&mut rng)).collect();
            let x2s: Vec<_> = (0..3).map(|_| random_xform(&mut rng)).collect();
            let a = forward.score(&x1s, &x2s).unwrap();
            let b = swapped.score(&x2s, &x1s).unwrap();
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }

    #[test]
    fn score_depends_only_on_relative_placement() {
        let mut rng = StdRng::seed_from_u64(11);
        let score = CbScore::from_points(random_cloud(&mut rng, 10), random_cloud(&mut rng, 10), 3.5, 7.0);
        let x1 = random_xform(&mut rng);
        let x2 = random_xform(&mut rng);
        let g = random_xform(&mut rng);

        let a = score.score(&[x1], &[x2]).unwrap();
        let b = score.score(&[g * x1], &[g * x2]).unwrap();
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn batch_score_sums_over_cross_product() {
        let mut rng = StdRng::seed_from_u64(3);
        let score = CbScore::from_points(random_cloud(&mut rng, 8), random_cloud(&mut rng, 6), 3.0, 6.0);
        let x1s: Vec<_> = (0..3).map(|_| random_xform(&mut rng)).collect();
        let x2s: Vec<_> = (0..2).map(|_| random_xform(&mut rng)).collect();

        let mut expected = 0.0;
        for x1 in &x1s {
            for x2 in &x2s {
                expected += score.score(&[*x1], &[*x2]).unwrap();
            }
        }
        assert!((score.score(&x1s, &x2s).unwrap() - expected).abs() < 1e-9);
        assert_eq!(score.score(&[], &x2s).unwrap(), 0.0);
    }

    #[test]
    fn fragments_use_cb_or_virtual_cb() {
        let mut fragment = Fragment::new();
        let chain = fragment.add_chain('A', ChainType::Protein);
        let ala = fragment.add_residue(chain, 1, "ALA").unwrap();
        fragment.add_atom_to_residue(ala, Atom::new("CB", ala, Point3::new(1.0, 1.0, 1.0)));
        let gly = fragment.add_residue(chain, 2, "GLY").unwrap();
        for (name, pos) in [
            ("N", Point3::new(-0.525, 1.363, 0.0)),
            ("CA", Point3::new(0.0, 0.0, 0.0)),
            ("C", Point3::new(1.526, 0.0, 0.0)),
        ] {
            fragment.add_atom_to_residue(gly, Atom::new(name, gly, pos));
        }
        let lig = fragment.add_residue(chain, 3, "LIG").unwrap();
        fragment.add_atom_to_residue(lig, Atom::new("C1", lig, Point3::origin()));

        let points = representative_points(&fragment);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].position, Point3::new(1.0, 1.0, 1.0));
        assert!(((points[1].position - Point3::origin()).norm() - 1.53).abs() < 1e-9);
    }

    #[test]
    fn weighted_points_report_missing_atoms() {
        let mut fragment = Fragment::new();
        let chain = fragment.add_chain('A', ChainType::Protein);
        let residue = fragment.add_residue(chain, 1, "ALA").unwrap();
        let cb = fragment
            .add_atom_to_residue(residue, Atom::new("CB", residue, Point3::new(0.0, 0.0, 2.0)))
            .unwrap();

        let weights = HashMap::from([(cb, 2.5)]);
        let points = weighted_points(&fragment, &weights).unwrap();
        assert_eq!(points, vec![WeightedPoint::new(Point3::new(0.0, 0.0, 2.0), 2.5)]);

        let missing = HashMap::from([(AtomId::default(), 1.0)]);
        assert!(matches!(
            weighted_points(&fragment, &missing),
            Err(ScoreError::AtomNotFound(_))
        ));
    }
}
