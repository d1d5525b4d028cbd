//! Provides input/output for fragment structures and diagnostic dumps.
//!
//! Fragments are read and written through the [`traits::FragmentFile`]
//! interface; the TOML layout lives in [`fragment`]. The [`dump`] module writes
//! placed fragments and loop backbones for visual inspection.

pub mod dump;
pub mod fragment;
pub mod traits;
