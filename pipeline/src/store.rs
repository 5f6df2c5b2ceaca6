use std::{
    io,
    path::{Path, PathBuf},
};

use dataset::WireBuffer;
use log::debug;
use tokio::fs;

use crate::{location::Location, services::ObjectStore};

/// An `ObjectStore` keeping every bucket as a directory under `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file backing `location`.
    pub fn path(&self, location: &Location) -> PathBuf {
        let mut path = self.root.join(&location.bucket);
        path.extend(location.key.split('/').filter(|s| !s.is_empty()));
        path
    }
}

impl ObjectStore for LocalStore {
    async fn upload(&self, buffer: &WireBuffer, location: &Location) -> io::Result<Location> {
        let path = self.path(location);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, buffer.as_bytes()).await?;
        debug!(bytes = buffer.len(); "stored {location} at {}", path.display());

        Ok(location.clone())
    }

    async fn download(&self, location: &Location) -> io::Result<Vec<u8>> {
        fs::read(self.path(location)).await
    }
}
