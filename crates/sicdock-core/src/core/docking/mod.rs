//! Scores for a pair of rigid fragments under candidate placements.
//!
//! Every score implements [`RigidScore`]: it receives one batch of transforms
//! per fragment and sums its contribution over the full cross product of the
//! two batches. Scores hold only state derived once at construction, so a
//! single instance can be shared across threads.

pub mod constraints;
pub mod contact;
pub mod joint;
pub mod linker;
pub mod potentials;

pub use constraints::{
    AtomPairConstraint, Constraint, ConstraintAtom, ConstraintSetScore, CoordinateResolver,
    DistanceFunc, PairCoordinates, TransformedCoordinates,
};
pub use contact::CbScore;
pub use joint::JointScore;
pub use linker::LinkerScore;

use crate::core::geometry::Xform;
use crate::core::loops::LoopLibraryError;
use crate::core::models::ids::AtomId;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Score/weight length mismatch: {scores} scores but {weights} weights")]
    WeightCountMismatch { scores: usize, weights: usize },

    #[error("Residue-level queries are not available from transformed reference coordinates")]
    UnsupportedResidueQuery,

    #[error("Atom {0:?} not found in fragment")]
    AtomNotFound(AtomId),

    #[error("No reference coordinate cached for constraint atom {0:?}")]
    AtomNotCached(ConstraintAtom),

    #[error("Loop library error: {source}")]
    LoopLibrary {
        #[from]
        source: LoopLibraryError,
    },

    #[error("Failed to format score output: {0}")]
    Format(#[from] fmt::Error),
}

/// A score over pairs of rigid placements of two fragments.
pub trait RigidScore: Send + Sync {
    /// Sums the score over every `(x1, x2)` in `x1s × x2s`.
    fn score(&self, x1s: &[Xform], x2s: &[Xform]) -> Result<f64, ScoreError>;

    /// Short label used in tabular output.
    fn type_name(&self) -> &'static str;

    /// Writes the label right-aligned in `width` columns.
    fn show(&self, out: &mut dyn fmt::Write, width: usize) -> fmt::Result {
        write!(out, "{:>width$}", self.type_name(), width = width)
    }

    /// Writes the score for the given batches with three decimals in `width` columns.
    fn show_scores(
        &self,
        out: &mut dyn fmt::Write,
        x1s: &[Xform],
        x2s: &[Xform],
        width: usize,
    ) -> Result<(), ScoreError> {
        let value = self.score(x1s, x2s)?;
        write!(out, "{:>width$.3}", value, width = width)?;
        Ok(())
    }
}

impl<S: RigidScore + ?Sized> RigidScore for std::sync::Arc<S> {
    fn score(&self, x1s: &[Xform], x2s: &[Xform]) -> Result<f64, ScoreError> {
        (**self).score(x1s, x2s)
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}
