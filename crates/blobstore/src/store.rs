//! Content-addressed stores
//!
//! Objects are immutable and named by the SHA-1 of their bytes, so uploading
//! the same object twice is harmless and needs no coordination.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::{Error, Result};
use crate::hash::{hash_content, validate_hash};

/// Content store keyed by content hash
pub trait ContentStore: Send + Sync {
    fn exists(&self, hash: &str) -> Result<bool>;

    /// Store `content`, returning its hash
    fn upload(&self, content: &[u8]) -> Result<String>;

    fn download(&self, hash: &str) -> Result<Vec<u8>>;

    /// Upload only if no object with this hash exists yet
    ///
    /// Returns true when bytes were transferred.
    fn upload_if_absent(&self, hash: &str, content: &[u8]) -> Result<bool> {
        if self.exists(hash)? {
            log::debug!("object {hash} already stored");
            return Ok(false);
        }
        self.upload(content)?;
        Ok(true)
    }
}

/// Store backed by a local directory, one file per object under `aa/<hash>`
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, hash: &str) -> Result<PathBuf> {
        validate_hash(hash)?;
        Ok(self.root.join(&hash[..2]).join(hash))
    }
}

impl ContentStore for DirStore {
    fn exists(&self, hash: &str) -> Result<bool> {
        Ok(self.object_path(hash)?.is_file())
    }

    fn upload(&self, content: &[u8]) -> Result<String> {
        let hash = hash_content(content);
        let path = self.object_path(&hash)?;
        if path.is_file() {
            return Ok(hash);
        }
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)?;

        // Temp name plus rename: readers never see a partial object
        let (tmp_path, mut file) = tempfile_in(dir, &hash)?;
        file.write_all(content)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, &path)?;
        log::debug!("stored object {hash} ({} bytes)", content.len());
        Ok(hash)
    }

    fn download(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.object_path(hash)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(hash.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn tempfile_in(dir: &Path, hash: &str) -> Result<(PathBuf, fs::File)> {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = dir.join(format!(".{hash}.{}.{n}.tmp", std::process::id()));
    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)?;
    Ok((path, file))
}

/// In-memory store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    uploads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store bytes under an arbitrary key, bypassing hashing
    ///
    /// Lets tests plant corrupted objects.
    pub fn insert_raw(&self, hash: &str, content: impl Into<Vec<u8>>) {
        self.lock().insert(hash.to_string(), content.into());
    }

    /// Number of upload calls that reached the store
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ContentStore for MemoryStore {
    fn exists(&self, hash: &str) -> Result<bool> {
        Ok(self.lock().contains_key(hash))
    }

    fn upload(&self, content: &[u8]) -> Result<String> {
        let hash = hash_content(content);
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.lock().insert(hash.clone(), content.to_vec());
        Ok(hash)
    }

    fn download(&self, hash: &str) -> Result<Vec<u8>> {
        self.lock()
            .get(hash)
            .cloned()
            .ok_or_else(|| Error::NotFound(hash.to_string()))
    }
}
