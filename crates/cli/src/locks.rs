//! Single-watcher lock per workspace
//!
//! Two watchers on one tree would both prompt for every save and race each
//! other's manifest writes, so `csync watch` holds `<root>/.csync/locks/watch.lock`
//! for as long as it runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "locks/watch.lock";

/// Held for the lifetime of a watcher; the file is removed on drop
pub struct WatchLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Who holds the lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub started_at: u64,
}

impl WatchLock {
    /// Acquire the lock under `state_dir`.
    ///
    /// Fails while another live process holds it. A lock left behind by a
    /// dead process is reclaimed.
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        let lock_path = state_dir.join(LOCK_FILE);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create locks directory")?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        if !try_flock_exclusive(&file)? {
            match read_info(&mut file) {
                Ok(info) if !is_process_alive(info.pid) => {
                    tracing::warn!("Removing stale watch lock left by pid {}", info.pid);
                    drop(file);
                    std::fs::remove_file(&lock_path)?;
                    return Self::acquire(state_dir);
                }
                Ok(info) => anyhow::bail!("Already watching this workspace (pid {})", info.pid),
                // The holder may not have written its pid yet
                Err(_) => anyhow::bail!("Already watching this workspace"),
            }
        }

        write_info(&mut file)?;
        Ok(Self {
            path: lock_path,
            file,
        })
    }

    /// Current holder, if a live watcher owns the workspace
    pub fn holder(state_dir: &Path) -> Option<LockInfo> {
        let mut file = File::open(state_dir.join(LOCK_FILE)).ok()?;
        let info = read_info(&mut file).ok()?;
        is_process_alive(info.pid).then_some(info)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WatchLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn write_info(file: &mut File) -> Result<()> {
    let info = LockInfo {
        pid: std::process::id(),
        started_at: current_timestamp_ms(),
    };
    let serialized = serde_json::to_string(&info).context("Failed to serialize lock content")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_info(file: &mut File) -> Result<LockInfo> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to deserialize lock content")
}

/// Try to acquire exclusive file lock (non-blocking)
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

// No advisory locking; the recorded pid alone decides
#[cfg(not(unix))]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    let mut file = file.try_clone()?;
    Ok(!matches!(read_info(&mut file), Ok(info) if is_process_alive(info.pid)))
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // Null signal: existence check only
    match kill(Pid::from_raw(pid as i32), None::<Signal>) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

#[cfg(not(unix))]
fn is_process_alive(pid: u32) -> bool {
    pid == std::process::id()
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
