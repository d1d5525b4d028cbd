//! Loop-closure feasibility lookups.
//!
//! A loop-closure library answers one question for the linker score: given the
//! frame of a chain end on one fragment and the frame of a chain start on the
//! other, how many observed backbone loops of a supported length would bridge
//! them? [`LoopHashLibrary`] is the file-backed implementation; the
//! [`LoopClosureLibrary`] trait is the seam the scoring code depends on.

pub mod hash;
pub mod segment;
pub mod shared;

pub use hash::{LoopHashLibrary, LoopHashParams};
pub use segment::{BackboneResidue, LoopSegment};
pub use shared::{LoopLibraryConfig, SharedLoopLibrary};

use crate::core::geometry::Xform;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoopLibraryError {
    #[error("Loop library database path is not set; a loop database directory is required for linker scoring")]
    DatabasePathNotSet,

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize loop table for size {loop_length}: {source}")]
    Serialize {
        loop_length: usize,
        source: toml::ser::Error,
    },

    #[error("Loop file '{path}' holds segments of length {found}, expected {expected}")]
    LengthMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("Loop length {0} is not supported by this library")]
    UnsupportedLoopLength(usize),

    #[error("Invalid loop hash parameter: {0}")]
    InvalidParameter(&'static str),
}

/// Lookup service over precomputed loop geometries.
///
/// `lower` is the frame of the residue the loop leaves from (a chain's last
/// residue) and `upper` the frame of the residue it joins (a chain's first
/// residue), both in the same global frame. `radius` is measured in hash bins.
pub trait LoopClosureLibrary: Send + Sync {
    fn loop_sizes(&self) -> &[usize];

    fn count_compatible(&self, lower: &Xform, upper: &Xform, loop_sizes: &[usize], radius: usize)
    -> usize;

    /// Writes every compatible loop, placed onto `lower`, to files starting
    /// with `out_prefix`. Returns the number of files written.
    fn dump_examples(
        &self,
        lower: &Xform,
        upper: &Xform,
        loop_sizes: &[usize],
        radius: usize,
        out_prefix: &str,
    ) -> Result<usize, LoopLibraryError>;

    fn supports(&self, loop_length: usize) -> bool {
        self.loop_sizes().contains(&loop_length)
    }
}
