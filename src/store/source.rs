//! Translation sources
//!
//! A [`TranslationSource`] produces a complete [`Catalog`] on demand. The
//! store calls it on every reload and never edits the returned catalog.
//!
//! # Example
//!
//! ```ignore
//! use miniphrase::store::{Catalog, MapSource, TranslationStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = TranslationStore::new(MapSource::new(|| {
//!         Ok(Catalog::from_iter([("en", "greeting", "Hello, <name>!")]))
//!     }));
//!     store.reload().await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::store::Catalog;

/// Generic trait for translation backends
///
/// Implementations may read from disk, embed maps for tests, or proxy to
/// any other storage. Loading is async so that I/O-bound sources do not
/// block the caller's runtime.
#[async_trait]
pub trait TranslationSource: Send + Sync {
    /// Build a complete catalog.
    ///
    /// # Returns
    ///
    /// * `Ok(Catalog)` - every translation the source currently holds
    /// * `Err(StoreError)` - if any part of the source could not be read;
    ///   partial catalogs are never returned
    async fn load(&self) -> StoreResult<Catalog>;

    /// Name of the source, used for logging.
    fn source_name(&self) -> &str;
}

/// A source backed by a catalog supplier, called again on every reload.
pub struct MapSource {
    supplier: Box<dyn Fn() -> StoreResult<Catalog> + Send + Sync>,
}

impl MapSource {
    pub fn new<F>(supplier: F) -> Self
    where
        F: Fn() -> StoreResult<Catalog> + Send + Sync + 'static,
    {
        MapSource {
            supplier: Box::new(supplier),
        }
    }

    /// A source that always yields the same catalog.
    pub fn fixed(catalog: Catalog) -> Self {
        MapSource::new(move || Ok(catalog.clone()))
    }
}

#[async_trait]
impl TranslationSource for MapSource {
    async fn load(&self) -> StoreResult<Catalog> {
        (self.supplier)()
    }

    fn source_name(&self) -> &str {
        "map"
    }
}

/// A source without any translations.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

#[async_trait]
impl TranslationSource for EmptySource {
    async fn load(&self) -> StoreResult<Catalog> {
        Ok(Catalog::new())
    }

    fn source_name(&self) -> &str {
        "empty"
    }
}
