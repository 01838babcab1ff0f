//! Bounded filesystem helpers shared by the store adapter and the state
//! repository.

use std::fs::File;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::timeout;

use crate::{Error, Result};

/// Runs an I/O future, failing with [`Error::Timeout`] after `limit`.
pub async fn bounded<T, F>(limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    match timeout(limit, future).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => Err(Error::Timeout(limit)),
    }
}

/// Reads a file, returning `None` if it does not exist.
pub async fn read_optional(path: &Path, limit: Duration) -> Result<Option<Vec<u8>>> {
    match timeout(limit, tokio::fs::read(path)).await {
        Ok(Ok(bytes)) => Ok(Some(bytes)),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Ok(Err(e)) => Err(Error::Io(e)),
        Err(_) => Err(Error::Timeout(limit)),
    }
}

/// Replaces `path` with `contents` atomically.
///
/// The bytes go to a temporary file in the same directory, which is synced
/// and then renamed over the target. A crash at any point leaves either the
/// old or the new file, never a partial one.
pub async fn write_atomic(path: &Path, contents: Vec<u8>, limit: Duration) -> Result<()> {
    let target = path.to_path_buf();
    let task = tokio::task::spawn_blocking(move || replace_file(&target, &contents));

    match timeout(limit, task).await {
        Ok(Ok(result)) => result.map_err(Error::from),
        Ok(Err(join)) => Err(Error::Io(std::io::Error::other(join))),
        // The blocking write keeps running to completion; the rename is atomic either way.
        Err(_) => Err(Error::Timeout(limit)),
    }
}

fn replace_file(target: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = parent_dir(target);
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;

    // Make the rename itself durable. Not every platform can open a directory.
    if let Ok(handle) = File::open(&dir) {
        let _ = handle.sync_all();
    }
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
