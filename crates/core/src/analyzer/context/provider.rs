//! Access to catalog snapshots.

use std::sync::Arc;

use super::schema::SchemaCatalog;

/// Hands out the current catalog snapshot.
///
/// Freshness is the provider's concern. Callers take one snapshot per
/// verification and never hold on to it across requests.
pub trait SchemaCatalogProvider: Send + Sync {
    fn current(&self) -> Arc<SchemaCatalog>;
}

/// A provider that always returns the same catalog.
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
    catalog: Arc<SchemaCatalog>,
}

impl StaticCatalog {
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }
}

impl From<SchemaCatalog> for StaticCatalog {
    fn from(catalog: SchemaCatalog) -> Self {
        Self::new(catalog)
    }
}

impl SchemaCatalogProvider for StaticCatalog {
    fn current(&self) -> Arc<SchemaCatalog> {
        Arc::clone(&self.catalog)
    }
}

impl<P: SchemaCatalogProvider + ?Sized> SchemaCatalogProvider for Arc<P> {
    fn current(&self) -> Arc<SchemaCatalog> {
        (**self).current()
    }
}
