use super::potentials::{bounded, flat_harmonic, harmonic};
use super::{RigidScore, ScoreError};
use crate::core::geometry::Xform;
use crate::core::models::fragment::Fragment;
use crate::core::models::ids::AtomId;
use crate::core::models::residue::Residue;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An atom of either fragment, as referenced by a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintAtom {
    FragmentOne(AtomId),
    FragmentTwo(AtomId),
}

/// Source of atom coordinates for constraint evaluation.
pub trait CoordinateResolver {
    fn xyz(&self, atom: ConstraintAtom) -> Result<Point3<f64>, ScoreError>;

    /// The residue that owns `atom`.
    fn residue(&self, atom: ConstraintAtom) -> Result<&Residue, ScoreError>;
}

/// Resolves atoms against the two fragments as they are.
#[derive(Debug, Clone, Copy)]
pub struct PairCoordinates<'a> {
    pub fragment1: &'a Fragment,
    pub fragment2: &'a Fragment,
}

impl<'a> PairCoordinates<'a> {
    pub fn new(fragment1: &'a Fragment, fragment2: &'a Fragment) -> Self {
        Self {
            fragment1,
            fragment2,
        }
    }

    fn locate(&self, atom: ConstraintAtom) -> (&'a Fragment, AtomId) {
        match atom {
            ConstraintAtom::FragmentOne(id) => (self.fragment1, id),
            ConstraintAtom::FragmentTwo(id) => (self.fragment2, id),
        }
    }
}

impl CoordinateResolver for PairCoordinates<'_> {
    fn xyz(&self, atom: ConstraintAtom) -> Result<Point3<f64>, ScoreError> {
        let (fragment, id) = self.locate(atom);
        fragment.atom_position(id).ok_or(ScoreError::AtomNotFound(id))
    }

    fn residue(&self, atom: ConstraintAtom) -> Result<&Residue, ScoreError> {
        let (fragment, id) = self.locate(atom);
        let residue_id = fragment
            .atom(id)
            .ok_or(ScoreError::AtomNotFound(id))?
            .residue_id;
        fragment
            .residue(residue_id)
            .ok_or(ScoreError::AtomNotFound(id))
    }
}

/// Resolves atoms from cached local coordinates placed by a transform pair.
///
/// There is no structure behind the points, so residue queries fail with
/// [`ScoreError::UnsupportedResidueQuery`].
#[derive(Debug, Clone, Copy)]
pub struct TransformedCoordinates<'a> {
    start_coords: &'a HashMap<ConstraintAtom, Point3<f64>>,
    x1: &'a Xform,
    x2: &'a Xform,
}

impl<'a> TransformedCoordinates<'a> {
    pub fn new(
        start_coords: &'a HashMap<ConstraintAtom, Point3<f64>>,
        x1: &'a Xform,
        x2: &'a Xform,
    ) -> Self {
        Self {
            start_coords,
            x1,
            x2,
        }
    }
}

impl CoordinateResolver for TransformedCoordinates<'_> {
    fn xyz(&self, atom: ConstraintAtom) -> Result<Point3<f64>, ScoreError> {
        let local = self
            .start_coords
            .get(&atom)
            .ok_or(ScoreError::AtomNotCached(atom))?;
        Ok(match atom {
            ConstraintAtom::FragmentOne(_) => self.x1 * local,
            ConstraintAtom::FragmentTwo(_) => self.x2 * local,
        })
    }

    fn residue(&self, _atom: ConstraintAtom) -> Result<&Residue, ScoreError> {
        Err(ScoreError::UnsupportedResidueQuery)
    }
}

/// Penalty as a function of a constraint's measured distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DistanceFunc {
    Harmonic {
        x0: f64,
        sd: f64,
    },
    FlatHarmonic {
        x0: f64,
        sd: f64,
        tolerance: f64,
    },
    Bounded {
        lower: f64,
        upper: f64,
        sd: f64,
        #[serde(default = "default_rswitch")]
        rswitch: f64,
    },
}

fn default_rswitch() -> f64 {
    0.5
}

impl DistanceFunc {
    pub fn evaluate(&self, dist: f64) -> f64 {
        match *self {
            DistanceFunc::Harmonic { x0, sd } => harmonic(dist, x0, sd),
            DistanceFunc::FlatHarmonic { x0, sd, tolerance } => {
                flat_harmonic(dist, x0, sd, tolerance)
            }
            DistanceFunc::Bounded {
                lower,
                upper,
                sd,
                rswitch,
            } => bounded(dist, lower, upper, sd, rswitch),
        }
    }
}

/// A geometric restraint between atoms of the two fragments.
pub trait Constraint: Send + Sync + fmt::Debug {
    fn atoms(&self) -> &[ConstraintAtom];

    /// Measures the constrained quantity using `coords`.
    fn dist(&self, coords: &dyn CoordinateResolver) -> Result<f64, ScoreError>;

    fn penalty(&self, distance: f64) -> f64;
}

/// Restrains the distance between two atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomPairConstraint {
    atoms: [ConstraintAtom; 2],
    func: DistanceFunc,
}

impl AtomPairConstraint {
    pub fn new(atom1: ConstraintAtom, atom2: ConstraintAtom, func: DistanceFunc) -> Self {
        Self {
            atoms: [atom1, atom2],
            func,
        }
    }

    pub fn func(&self) -> &DistanceFunc {
        &self.func
    }
}

impl Constraint for AtomPairConstraint {
    fn atoms(&self) -> &[ConstraintAtom] {
        &self.atoms
    }

    fn dist(&self, coords: &dyn CoordinateResolver) -> Result<f64, ScoreError> {
        let a = coords.xyz(self.atoms[0])?;
        let b = coords.xyz(self.atoms[1])?;
        Ok((a - b).norm())
    }

    fn penalty(&self, distance: f64) -> f64 {
        self.func.evaluate(distance)
    }
}

/// Sum of constraint penalties with the fragments placed by each transform pair.
///
/// Reference coordinates of every constrained atom are captured once, in the
/// owning fragment's local frame, when the score is built.
#[derive(Debug)]
pub struct ConstraintSetScore {
    constraints: Vec<Arc<dyn Constraint>>,
    start_coords: HashMap<ConstraintAtom, Point3<f64>>,
}

impl ConstraintSetScore {
    pub fn new(
        fragment1: &Fragment,
        fragment2: &Fragment,
        constraints: Vec<Arc<dyn Constraint>>,
    ) -> Result<Self, ScoreError> {
        let coords = PairCoordinates::new(fragment1, fragment2);
        let mut start_coords = HashMap::new();
        for constraint in &constraints {
            for &atom in constraint.atoms() {
                if let std::collections::hash_map::Entry::Vacant(entry) = start_coords.entry(atom) {
                    entry.insert(coords.xyz(atom)?);
                }
            }
        }
        debug!(
            constraints = constraints.len(),
            atoms = start_coords.len(),
            "Cached constraint reference coordinates"
        );
        Ok(Self {
            constraints,
            start_coords,
        })
    }

    pub fn constraints(&self) -> &[Arc<dyn Constraint>] {
        &self.constraints
    }

    pub fn start_coords(&self) -> &HashMap<ConstraintAtom, Point3<f64>> {
        &self.start_coords
    }
}

impl RigidScore for ConstraintSetScore {
    fn score(&self, x1s: &[Xform], x2s: &[Xform]) -> Result<f64, ScoreError> {
        let mut total = 0.0;
        for x1 in x1s {
            for x2 in x2s {
                let coords = TransformedCoordinates::new(&self.start_coords, x1, x2);
                for constraint in &self.constraints {
                    total += constraint.penalty(constraint.dist(&coords)?);
                }
            }
        }
        Ok(total)
    }

    fn type_name(&self) -> &'static str {
        "ConstraintSetScore"
    }
}
