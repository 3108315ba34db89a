//! Host IO on the local machine
//!
//! Commands run with captured output and a hard timeout. Each command gets
//! its own process group so a timeout kills everything it spawned. Ownership
//! is resolved through the passwd/group databases with libc.

use std::ffi::{CStr, CString};
use std::fs;
use std::io::Read;
use std::mem::MaybeUninit;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use declarative::{CommandOutput, Error, FileKind, FileStat, HostIo, Result, command_line};
use wait_timeout::ChildExt;

/// Buffer size for the reentrant passwd/group lookups
const LOOKUP_BUFFER: usize = 16 * 1024;

/// How long to wait for the output readers after a timed-out command is killed
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// [`HostIo`] backed by the local filesystem and process table
#[derive(Debug, Clone)]
pub struct LocalIo {
    timeout: Duration,
}

impl LocalIo {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl HostIo for LocalIo {
    fn run(&self, command: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()
            .map_err(|e| Error::io(command, e))?;

        // Drain both pipes while waiting so a chatty child cannot block on a full pipe
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                kill_group(child.id());
                let _ = child.kill();
                let _ = child.wait();
                // Output is discarded, the readers only need to stop
                for reader in [stdout, stderr].into_iter().flatten() {
                    settle(reader, DRAIN_GRACE);
                }
                return Err(Error::Timeout {
                    command: command_line(command, args),
                    secs: self.timeout.as_secs(),
                });
            }
            Err(e) => return Err(Error::io(command, e)),
        };

        let stdout = stdout.map(join_output).unwrap_or_default();
        let stderr = stderr.map(join_output).unwrap_or_default();
        // Killed by a signal: no exit code
        let code = status.code().unwrap_or(-1);
        Ok(CommandOutput::new(stdout, stderr, code))
    }

    fn file_exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    fn readlink(&self, path: &Path) -> Result<String> {
        fs::read_link(path)
            .map(|p| p.to_string_lossy().into_owned())
            .map_err(|e| Error::io(path, e))
    }

    fn symlink(&self, source: &str, target: &Path) -> Result<()> {
        std::os::unix::fs::symlink(source, target).map_err(|e| Error::io(target, e))
    }

    fn stat(&self, path: &Path) -> Result<FileStat> {
        let meta = fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };
        Ok(FileStat {
            kind,
            owner: user_name(meta.uid()).unwrap_or_else(|| meta.uid().to_string()),
            group: group_name(meta.gid()).unwrap_or_else(|| meta.gid().to_string()),
            permissions: meta.mode() & 0o7777,
        })
    }

    fn chmod(&self, path: &Path, mode: u32) -> Result<()> {
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| Error::io(path, e))
    }

    fn chown(&self, path: &Path, owner: Option<&str>, group: Option<&str>) -> Result<()> {
        let uid = owner.map(resolve_user).transpose()?;
        let gid = group.map(resolve_group).transpose()?;
        if uid.is_none() && gid.is_none() {
            return Ok(());
        }
        std::os::unix::fs::chown(path, uid, gid).map_err(|e| Error::io(path, e))
    }

    fn mkdir(&self, path: &Path) -> Result<()> {
        fs::create_dir(path).map_err(|e| Error::io(path, e))
    }

    fn rmdir(&self, path: &Path) -> Result<()> {
        fs::remove_dir(path).map_err(|e| Error::io(path, e))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| Error::io(path, e))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| Error::io(path, e))
    }

    fn put(&self, path: &Path, content: &[u8]) -> Result<()> {
        let tmp = temp_sibling(path);
        fs::write(&tmp, content).map_err(|e| Error::io(&tmp, e))?;

        // A replaced file keeps its mode and ownership
        if let Ok(meta) = fs::metadata(path) {
            let kept = fs::set_permissions(&tmp, meta.permissions())
                .and_then(|()| std::os::unix::fs::chown(&tmp, Some(meta.uid()), Some(meta.gid())));
            if let Err(e) = kept {
                let _ = fs::remove_file(&tmp);
                return Err(Error::io(path, e));
            }
        }

        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::io(path, e)
        })
    }
}

fn drain(mut pipe: impl Read + Send + 'static) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_output(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Join a reader within `grace`; one still blocked after that is left behind
fn settle(handle: thread::JoinHandle<String>, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            log::warn!("output reader still open {}s after kill, detaching it", grace.as_secs());
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
    let _ = handle.join();
    true
}

/// SIGKILL the whole process group led by `pid`
fn kill_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill has no memory-safety preconditions; a stale group only yields ESRCH
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        log::debug!("kill of process group {pgid} failed: {}", std::io::Error::last_os_error());
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.converge.{}.{n}", std::process::id()))
}

// ============================================================================
// passwd / group lookups
// ============================================================================

fn user_name(uid: u32) -> Option<String> {
    let mut pwd = MaybeUninit::<libc::passwd>::uninit();
    let mut buf = vec![0 as libc::c_char; LOOKUP_BUFFER];
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    // SAFETY: all pointers are valid for the duration of the call and buf.len() is its size
    let rc = unsafe { libc::getpwuid_r(uid, pwd.as_mut_ptr(), buf.as_mut_ptr(), buf.len(), &raw mut result) };
    if rc != 0 || result.is_null() {
        return None;
    }
    // SAFETY: on success result points at pwd, whose strings live in buf
    let name = unsafe { CStr::from_ptr((*result).pw_name) };
    Some(name.to_string_lossy().into_owned())
}

fn group_name(gid: u32) -> Option<String> {
    let mut grp = MaybeUninit::<libc::group>::uninit();
    let mut buf = vec![0 as libc::c_char; LOOKUP_BUFFER];
    let mut result: *mut libc::group = std::ptr::null_mut();
    // SAFETY: as in user_name
    let rc = unsafe { libc::getgrgid_r(gid, grp.as_mut_ptr(), buf.as_mut_ptr(), buf.len(), &raw mut result) };
    if rc != 0 || result.is_null() {
        return None;
    }
    // SAFETY: as in user_name
    let name = unsafe { CStr::from_ptr((*result).gr_name) };
    Some(name.to_string_lossy().into_owned())
}

/// Numeric ids are taken as-is, names go through the passwd database
fn resolve_user(name: &str) -> Result<u32> {
    if let Ok(uid) = name.parse() {
        return Ok(uid);
    }
    let c_name = lookup_name(name, "owner")?;
    let mut pwd = MaybeUninit::<libc::passwd>::uninit();
    let mut buf = vec![0 as libc::c_char; LOOKUP_BUFFER];
    let mut result: *mut libc::passwd = std::ptr::null_mut();
    // SAFETY: as in user_name
    let rc = unsafe {
        libc::getpwnam_r(c_name.as_ptr(), pwd.as_mut_ptr(), buf.as_mut_ptr(), buf.len(), &raw mut result)
    };
    if rc != 0 || result.is_null() {
        return Err(Error::not_found(format!("user {name}")));
    }
    // SAFETY: on success result points at pwd
    Ok(unsafe { (*result).pw_uid })
}

fn resolve_group(name: &str) -> Result<u32> {
    if let Ok(gid) = name.parse() {
        return Ok(gid);
    }
    let c_name = lookup_name(name, "group")?;
    let mut grp = MaybeUninit::<libc::group>::uninit();
    let mut buf = vec![0 as libc::c_char; LOOKUP_BUFFER];
    let mut result: *mut libc::group = std::ptr::null_mut();
    // SAFETY: as in user_name
    let rc = unsafe {
        libc::getgrnam_r(c_name.as_ptr(), grp.as_mut_ptr(), buf.as_mut_ptr(), buf.len(), &raw mut result)
    };
    if rc != 0 || result.is_null() {
        return Err(Error::not_found(format!("group {name}")));
    }
    // SAFETY: on success result points at grp
    Ok(unsafe { (*result).gr_gid })
}

fn lookup_name(name: &str, attribute: &str) -> Result<CString> {
    CString::new(name).map_err(|_| Error::InvalidAttribute {
        attribute: attribute.to_string(),
        message: "contains a NUL byte".to_string(),
    })
}
