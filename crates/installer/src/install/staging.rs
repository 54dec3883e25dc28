//! Access to extracted archive content during instruction synthesis

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::game;
use crate::install::error::{InstallError, Result};

/// Reads complete text content of already-extracted archive entries
#[async_trait]
pub trait StagingReader: Send + Sync {
    /// Read the full content of an archive entry (Windows-style relative path)
    async fn read_staged_file(&self, archive_path: &str) -> Result<String>;
}

/// Staging reader backed by an extraction directory on disk
#[derive(Debug, Clone)]
pub struct FsStagingReader {
    staging_dir: PathBuf,
}

impl FsStagingReader {
    pub fn new<P: Into<PathBuf>>(staging_dir: P) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Host path of an archive entry inside the staging directory
    pub fn resolve(&self, archive_path: &str) -> PathBuf {
        game::host_path(&self.staging_dir, archive_path)
    }
}

#[async_trait]
impl StagingReader for FsStagingReader {
    async fn read_staged_file(&self, archive_path: &str) -> Result<String> {
        let path = self.resolve(archive_path);
        debug!("Reading staged file {}", path.display());

        let data = fs::read(&path).await.map_err(|source| InstallError::StagingRead {
            path: path.clone(),
            source,
        })?;
        String::from_utf8(data).map_err(|_| InstallError::InvalidUtf8 { path })
    }
}
