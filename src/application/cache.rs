use std::future::Future;
use std::path::{Path, PathBuf};

use crate::domain::Result;
use crate::logging::Logger;

/// Downloaded artifacts keyed by file name.
///
/// A file's presence is the only validity check; entries are never expired.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    logger: Logger,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>, logger: Logger) -> Self {
        Self {
            dir: dir.into(),
            logger,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `name` in the cache, running `populate` on a miss.
    ///
    /// The path is returned after `populate` succeeds whether or not it actually
    /// created the file.
    pub async fn get_or_populate<F, Fut>(&self, name: &str, populate: F) -> Result<PathBuf>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if !tokio::fs::try_exists(&self.dir).await? {
            self.logger.log("Cache dir not found. Creating...");
            tokio::fs::create_dir_all(&self.dir).await?;
        }

        let path = self.dir.join(name);
        if is_file(&path).await {
            self.logger
                .log(format!("Cached file found. Returning '{}'", path.display()));
            return Ok(path);
        }

        self.logger
            .log(format!("Cached file not found: '{}'", path.display()));
        populate(path.clone()).await?;
        Ok(path)
    }
}

pub(crate) async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
