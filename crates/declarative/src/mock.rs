//! In-memory host for testing handlers without touching the real system.
//!
//! [`MockIo`] keeps a small filesystem tree and a table of scripted command
//! responses. Every command that runs is recorded so tests can assert on the
//! exact invocations.
//!
//! ```
//! use declarative::{CommandOutput, HostIo, MockIo};
//!
//! let io = MockIo::new();
//! io.respond("/usr/bin/systemctl is-active nginx.service", CommandOutput::ok("active"));
//!
//! let out = io.run("/usr/bin/systemctl", &["is-active", "nginx.service"]).unwrap();
//! assert!(out.success());
//! assert_eq!(io.commands(), vec!["/usr/bin/systemctl is-active nginx.service"]);
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result, command_line};
use crate::io::{FileKind, FileStat, HostIo};
use crate::types::CommandOutput;

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
    Symlink(String),
}

#[derive(Debug, Clone)]
struct Entry {
    node: Node,
    owner: String,
    group: String,
    mode: u32,
}

#[derive(Debug, Default)]
struct MockState {
    entries: BTreeMap<PathBuf, Entry>,
    responses: HashMap<String, VecDeque<CommandOutput>>,
    commands: Vec<String>,
}

/// In-memory [`HostIo`] implementation
///
/// Clones share state, so a test can keep a handle while a handler owns another.
#[derive(Debug, Clone, Default)]
pub struct MockIo {
    state: Arc<Mutex<MockState>>,
}

impl MockIo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, path: impl AsRef<Path>, node: Node, mode: u32) {
        self.lock().entries.insert(
            path.as_ref().to_path_buf(),
            Entry {
                node,
                owner: "root".to_string(),
                group: "root".to_string(),
                mode,
            },
        );
    }

    /// Add a regular file owned by root:root with mode 0o644
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.insert(path, Node::File(content.into()), 0o644);
    }

    /// Add a directory owned by root:root with mode 0o755
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert(path, Node::Dir, 0o755);
    }

    /// Add a symlink at `target` pointing at `source`
    pub fn add_symlink(&self, source: &str, target: impl AsRef<Path>) {
        self.insert(target, Node::Symlink(source.to_string()), 0o777);
    }

    /// Add an executable file, used to satisfy availability probes
    pub fn add_binary(&self, path: impl AsRef<Path>) {
        self.insert(path, Node::File(Vec::new()), 0o755);
    }

    /// Override ownership and mode of an existing entry
    pub fn set_meta(&self, path: impl AsRef<Path>, owner: &str, group: &str, mode: u32) {
        if let Some(entry) = self.lock().entries.get_mut(path.as_ref()) {
            entry.owner = owner.to_string();
            entry.group = group.to_string();
            entry.mode = mode;
        }
    }

    /// Script the output of a command line such as `"/usr/bin/yum -d 0 info httpd"`
    ///
    /// Responses queue in order; the last one repeats for further calls.
    pub fn respond(&self, command_line: &str, output: CommandOutput) {
        self.lock()
            .responses
            .entry(command_line.to_string())
            .or_default()
            .push_back(output);
    }

    /// Every command line run so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    /// Command lines run so far that start with `prefix`
    pub fn commands_matching(&self, prefix: &str) -> Vec<String> {
        self.lock()
            .commands
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Content of a regular file, if there is one at `path`
    pub fn content(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().entries.get(path.as_ref()).map(|e| &e.node) {
            Some(Node::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Recorded (owner, group, mode) of an entry
    pub fn meta_of(&self, path: impl AsRef<Path>) -> Option<(String, String, u32)> {
        self.lock()
            .entries
            .get(path.as_ref())
            .map(|e| (e.owner.clone(), e.group.clone(), e.mode))
    }
}

fn missing(path: &Path) -> Error {
    Error::io(path, std::io::Error::from(ErrorKind::NotFound))
}

impl HostIo for MockIo {
    fn run(&self, command: &str, args: &[&str]) -> Result<CommandOutput> {
        let line = command_line(command, args);
        let mut state = self.lock();
        state.commands.push(line.clone());
        let output = match state.responses.get_mut(&line) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(output.unwrap_or_else(|| {
            CommandOutput::new("", format!("{command}: command not found"), 127)
        }))
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(
            self.lock().entries.get(path).map(|e| &e.node),
            Some(Node::Symlink(_))
        )
    }

    fn readlink(&self, path: &Path) -> Result<String> {
        match self.lock().entries.get(path).map(|e| &e.node) {
            Some(Node::Symlink(source)) => Ok(source.clone()),
            Some(_) => Err(Error::io(
                path,
                std::io::Error::new(ErrorKind::InvalidInput, "not a symlink"),
            )),
            None => Err(missing(path)),
        }
    }

    fn symlink(&self, source: &str, target: &Path) -> Result<()> {
        if self.file_exists(target) {
            return Err(Error::io(target, std::io::Error::from(ErrorKind::AlreadyExists)));
        }
        self.add_symlink(source, target);
        Ok(())
    }

    fn stat(&self, path: &Path) -> Result<FileStat> {
        let state = self.lock();
        let entry = state.entries.get(path).ok_or_else(|| missing(path))?;
        let kind = match entry.node {
            Node::File(_) => FileKind::File,
            Node::Dir => FileKind::Directory,
            Node::Symlink(_) => FileKind::Symlink,
        };
        Ok(FileStat {
            kind,
            owner: entry.owner.clone(),
            group: entry.group.clone(),
            permissions: entry.mode,
        })
    }

    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        let mut state = self.lock();
        let entry = state.entries.get_mut(path).ok_or_else(|| missing(path))?;
        entry.mode = mode;
        Ok(())
    }

    fn chown(&self, path: &Path, owner: Option<&str>, group: Option<&str>) -> Result<()> {
        let mut state = self.lock();
        let entry = state.entries.get_mut(path).ok_or_else(|| missing(path))?;
        if let Some(owner) = owner {
            entry.owner = owner.to_string();
        }
        if let Some(group) = group {
            entry.group = group.to_string();
        }
        Ok(())
    }

    fn mkdir(&self, path: &Path) -> Result<()> {
        if self.file_exists(path) {
            return Err(Error::io(path, std::io::Error::from(ErrorKind::AlreadyExists)));
        }
        self.add_dir(path);
        Ok(())
    }

    fn rmdir(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        match state.entries.get(path).map(|e| &e.node) {
            Some(Node::Dir) => {}
            Some(_) => {
                return Err(Error::io(
                    path,
                    std::io::Error::new(ErrorKind::InvalidInput, "not a directory"),
                ));
            }
            None => return Err(missing(path)),
        }
        let has_children = state
            .entries
            .keys()
            .any(|p| p.parent() == Some(path));
        if has_children {
            return Err(Error::io(
                path,
                std::io::Error::other("directory not empty"),
            ));
        }
        state.entries.remove(path);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        match state.entries.get(path).map(|e| &e.node) {
            Some(Node::Dir) => Err(Error::io(
                path,
                std::io::Error::new(ErrorKind::InvalidInput, "is a directory"),
            )),
            Some(_) => {
                state.entries.remove(path);
                Ok(())
            }
            None => Err(missing(path)),
        }
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.content(path).ok_or_else(|| missing(path))
    }

    fn put(&self, path: &Path, content: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(path) {
            return match entry.node {
                Node::File(_) => {
                    entry.node = Node::File(content.to_vec());
                    Ok(())
                }
                _ => Err(Error::io(
                    path,
                    std::io::Error::new(ErrorKind::InvalidInput, "not a regular file"),
                )),
            };
        }
        state.entries.insert(
            path.to_path_buf(),
            Entry {
                node: Node::File(content.to_vec()),
                owner: "root".to_string(),
                group: "root".to_string(),
                mode: 0o644,
            },
        );
        Ok(())
    }
}
