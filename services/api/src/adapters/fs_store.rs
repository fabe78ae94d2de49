//! services/api/src/adapters/fs_store.rs
//!
//! This module contains the file-backed blob store, the concrete implementation
//! of the `BlobStore` port used when `DATA_DIR` is configured. Each key is one
//! JSON file; writes go to a temporary file that is synced and renamed over the
//! target, so a value is always either fully old or fully new.

use appointment_core::ports::{BlobStore, PortError, PortResult};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A blob store that keeps every key in its own file under `root`.
#[derive(Clone, Debug)]
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Creates the store, creating `root` if it does not exist yet.
    pub async fn open(root: impl Into<PathBuf>) -> PortResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| io_error(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(key)))
    }
}

/// Maps a key to a safe file name: ASCII alphanumerics, `-` and `_` pass
/// through, every other byte becomes `%XX`.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

fn io_error(path: &Path, err: std::io::Error) -> PortError {
    PortError::Unavailable(format!("{}: {}", path.display(), err))
}

//=========================================================================================
// `BlobStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> PortResult<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> PortResult<()> {
        let path = self.path_for(key);
        let tmp_path = self.root.join(format!(".{}.json.tmp", encode_key(key)));

        let write = async {
            let mut tmp_file = fs::File::create(&tmp_path).await?;
            tmp_file.write_all(&value).await?;
            tmp_file.sync_all().await?;
            drop(tmp_file);
            fs::rename(&tmp_path, &path).await
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(io_error(&path, e));
        }
        debug!(key, bytes = value.len(), "Blob written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}
