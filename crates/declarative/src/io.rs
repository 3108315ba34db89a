//! Execution/IO capability used by every handler
//!
//! Handlers never touch the host directly; they go through [`HostIo`], so the
//! same reconciliation logic runs against the real host or the in-memory
//! [`MockIo`](crate::mock::MockIo).

use std::path::Path;

use crate::error::Result;
use crate::types::CommandOutput;

/// Kind of filesystem entry at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// Ownership and mode of a filesystem entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    pub owner: String,
    pub group: String,
    /// Permission bits, e.g. `0o644`
    pub permissions: u32,
}

/// Blocking command execution and filesystem primitives
pub trait HostIo: Send + Sync {
    /// Run a command to completion, capturing stdout, stderr and exit code
    ///
    /// A non-zero exit is not an error at this level.
    fn run(&self, command: &str, args: &[&str]) -> Result<CommandOutput>;

    /// True if anything exists at `path`, dangling symlinks included
    fn file_exists(&self, path: &Path) -> bool;

    fn is_symlink(&self, path: &Path) -> bool;

    /// Source a symlink points at
    fn readlink(&self, path: &Path) -> Result<String>;

    /// Create `target` as a symlink pointing at `source`
    fn symlink(&self, source: &str, target: &Path) -> Result<()>;

    fn stat(&self, path: &Path) -> Result<FileStat>;

    fn chmod(&self, path: &Path, mode: u32) -> Result<()>;

    /// Change owner and/or group; `None` leaves that side untouched
    fn chown(&self, path: &Path, owner: Option<&str>, group: Option<&str>) -> Result<()>;

    fn mkdir(&self, path: &Path) -> Result<()>;

    /// Remove an empty directory
    fn rmdir(&self, path: &Path) -> Result<()>;

    /// Remove a file or symlink
    fn remove(&self, path: &Path) -> Result<()>;

    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write `content` to `path`, replacing any file there
    fn put(&self, path: &Path, content: &[u8]) -> Result<()>;
}
