use super::hash::{LoopHashLibrary, LoopHashParams};
use super::{LoopClosureLibrary, LoopLibraryError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Where the loop database lives and how it is binned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopLibraryConfig {
    pub db_path: Option<PathBuf>,
    pub params: LoopHashParams,
}

/// A loop library loaded at most once and shared by every linker score of a run.
///
/// The first successful [`get_or_load`](Self::get_or_load) loads the database;
/// later calls hand out the same `Arc`. A failed load leaves the handle empty so
/// the caller sees the error and may retry with a corrected configuration.
#[derive(Default)]
pub struct SharedLoopLibrary {
    slot: Mutex<Option<Arc<dyn LoopClosureLibrary>>>,
}

impl std::fmt::Debug for SharedLoopLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLoopLibrary")
            .field("loaded", &self.get().is_some())
            .finish()
    }
}

impl SharedLoopLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an already built library.
    pub fn with_library(library: Arc<dyn LoopClosureLibrary>) -> Self {
        Self {
            slot: Mutex::new(Some(library)),
        }
    }

    pub fn get(&self) -> Option<Arc<dyn LoopClosureLibrary>> {
        match self.slot.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns the shared library, loading it for `loop_sizes` on first use.
    ///
    /// # Errors
    ///
    /// Returns [`LoopLibraryError::DatabasePathNotSet`] if nothing is loaded yet and
    /// `config.db_path` is `None`, or any error raised while reading the tables.
    pub fn get_or_load(
        &self,
        config: &LoopLibraryConfig,
        loop_sizes: &[usize],
    ) -> Result<Arc<dyn LoopClosureLibrary>, LoopLibraryError> {
        let mut guard = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(library) = guard.as_ref() {
            return Ok(Arc::clone(library));
        }

        let db_path = config
            .db_path
            .as_deref()
            .ok_or(LoopLibraryError::DatabasePathNotSet)?;

        info!(path = %db_path.display(), sizes = ?loop_sizes, "Loading loop library");
        let mut library = LoopHashLibrary::new(loop_sizes.to_vec(), config.params)?;
        if !loop_sizes.is_empty() {
            library.load(db_path)?;
        }

        let library: Arc<dyn LoopClosureLibrary> = Arc::new(library);
        *guard = Some(Arc::clone(&library));
        Ok(library)
    }
}
