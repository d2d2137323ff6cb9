//! Schema catalogs loaded from disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, RunnerError};
use sqlguard_core::analyzer::context::{SchemaCatalog, SchemaCatalogProvider};

/// Loads a catalog from a `.sql` DDL file, a `.json` snapshot, or a directory
/// of them. Directory entries are merged in file name order.
pub fn load_catalog(path: &Path) -> Result<SchemaCatalog> {
    if !path.is_dir() {
        return load_file(path);
    }

    let mut catalog = SchemaCatalog::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|_| RunnerError::InvalidPath(path.to_path_buf()))?;
        let is_schema = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == "sql" || ext == "json");
        if entry.file_type().is_file() && is_schema {
            catalog.merge(load_file(entry.path())?);
        }
    }
    Ok(catalog)
}

fn load_file(path: &Path) -> Result<SchemaCatalog> {
    let content = fs::read_to_string(path)?;
    let catalog = if path.extension().is_some_and(|ext| ext == "json") {
        SchemaCatalog::from_snapshot(&content)?
    } else {
        SchemaCatalog::from_ddl(&content)?
    };
    debug!(path = %path.display(), tables = catalog.len(), "schema file loaded");
    Ok(catalog)
}

struct Snapshot {
    catalog: Arc<SchemaCatalog>,
    loaded_at: Instant,
}

/// A catalog provider that reloads its schema source once the snapshot is
/// older than the TTL.
///
/// Readers always get a complete snapshot: a reload builds a new catalog and
/// swaps the `Arc` under the write lock. A failed reload keeps serving the
/// previous snapshot and retries after another TTL.
pub struct CachedSchemaProvider {
    path: PathBuf,
    ttl: Duration,
    snapshot: RwLock<Snapshot>,
}

impl CachedSchemaProvider {
    /// Loads the initial snapshot. Unlike later reloads, a failure here is
    /// returned to the caller.
    pub fn load(path: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let path = path.into();
        let catalog = load_catalog(&path)?;
        info!(path = %path.display(), tables = catalog.len(), "schema loaded");
        Ok(Self {
            path,
            ttl,
            snapshot: RwLock::new(Snapshot {
                catalog: Arc::new(catalog),
                loaded_at: Instant::now(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reloads now, regardless of age.
    pub fn refresh(&self) -> Result<Arc<SchemaCatalog>> {
        let catalog = Arc::new(load_catalog(&self.path)?);
        let mut snapshot = self.snapshot.write();
        snapshot.catalog = Arc::clone(&catalog);
        snapshot.loaded_at = Instant::now();
        info!(path = %self.path.display(), tables = catalog.len(), "schema reloaded");
        Ok(catalog)
    }

    fn is_stale(&self, snapshot: &Snapshot) -> bool {
        snapshot.loaded_at.elapsed() >= self.ttl
    }
}

impl SchemaCatalogProvider for CachedSchemaProvider {
    fn current(&self) -> Arc<SchemaCatalog> {
        {
            let snapshot = self.snapshot.read();
            if !self.is_stale(&snapshot) {
                return Arc::clone(&snapshot.catalog);
            }
        }

        let mut snapshot = self.snapshot.write();
        if self.is_stale(&snapshot) {
            match load_catalog(&self.path) {
                Ok(catalog) => {
                    info!(path = %self.path.display(), tables = catalog.len(), "schema reloaded");
                    snapshot.catalog = Arc::new(catalog);
                }
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "schema reload failed, keeping previous snapshot");
                }
            }
            snapshot.loaded_at = Instant::now();
        }
        Arc::clone(&snapshot.catalog)
    }
}
