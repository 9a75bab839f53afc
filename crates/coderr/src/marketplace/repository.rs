use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::store::MarketplaceData;

/// Storage abstraction so the service can be exercised in isolation.
///
/// `write` runs the closure against a draft copy; the draft replaces the
/// committed state only when the closure succeeds.
pub trait MarketplaceRepository: Send + Sync {
    fn read<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&MarketplaceData) -> T;

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut MarketplaceData) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("snapshot {path} could not be read or written: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {path} is not valid marketplace data: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Mutex-guarded store, optionally mirrored to a JSON snapshot file.
#[derive(Default, Clone)]
pub struct InMemoryMarketplaceRepository {
    data: Arc<Mutex<MarketplaceData>>,
    snapshot: Option<PathBuf>,
}

impl InMemoryMarketplaceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: MarketplaceData) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            snapshot: None,
        }
    }

    /// Loads `path` when it exists and saves every committed write back to it.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let data = if path.exists() {
            load_snapshot(&path)?
        } else {
            MarketplaceData::default()
        };
        debug!(path = %path.display(), "marketplace snapshot attached");
        Ok(Self {
            data: Arc::new(Mutex::new(data)),
            snapshot: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MarketplaceData>, RepositoryError> {
        self.data
            .lock()
            .map_err(|_| RepositoryError::Unavailable("marketplace store mutex poisoned".into()))
    }
}

impl MarketplaceRepository for InMemoryMarketplaceRepository {
    fn read<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&MarketplaceData) -> T,
    {
        let guard = self.lock()?;
        Ok(f(&guard))
    }

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut MarketplaceData) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.lock()?;
        let mut draft = guard.clone();
        let output = f(&mut draft)?;
        if let Some(path) = &self.snapshot {
            save_snapshot(path, &draft)?;
        }
        *guard = draft;
        Ok(output)
    }
}

fn load_snapshot(path: &Path) -> Result<MarketplaceData, RepositoryError> {
    let raw = fs::read(path).map_err(|source| RepositoryError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| RepositoryError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn save_snapshot(path: &Path, data: &MarketplaceData) -> Result<(), RepositoryError> {
    let raw = serde_json::to_vec_pretty(data).map_err(|source| RepositoryError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, raw)
        .and_then(|()| fs::rename(&staging, path))
        .map_err(|source| RepositoryError::Snapshot {
            path: path.to_path_buf(),
            source,
        })
}
