//! # Session Files
//!
//! Persists a [`CalculatorContext`] between runs:
//! - **Atomic saves**: write to `.tmp`, fsync, rename over the target
//! - **File locking**: one writer at a time, also across machines on a shared drive
//! - **Version validation**: refuse files written by an incompatible schema
//!
//! ## File Format
//!
//! Sessions are saved as pretty-printed JSON (conventionally `.calc`):
//!
//! ```json
//! {
//!   "meta": { "version": "0.1.0", "created": "...", "modified": "..." },
//!   "context": { "variables": { ... }, "timezone": "UTC", "ppi": 96.0, "emSize": 16.0 }
//! }
//! ```
//!
//! Lock files sit next to the session as `<name>.lock` and hold [`LockInfo`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use calc_core::context::CalculatorContext;
//! use calc_core::file_io::{save_session, load_session, FileLock, SessionFile};
//! use std::path::Path;
//!
//! let path = Path::new("budget.calc");
//! let lock = FileLock::acquire(path, "me@example.com").unwrap();
//! save_session(&SessionFile::new(CalculatorContext::default()), path).unwrap();
//! drop(lock);
//!
//! let restored = load_session(path).unwrap();
//! assert_eq!(restored.context.timezone, "UTC");
//! ```

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::CalculatorContext;
use crate::errors::{CalcError, CalcResult};

/// Current schema version for session files
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Hours after which a lock is considered abandoned
const STALE_LOCK_HOURS: i64 = 24;

/// On-disk session container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub meta: SessionMetadata,
    pub context: CalculatorContext,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Schema version (for migration compatibility)
    pub version: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl SessionFile {
    pub fn new(context: CalculatorContext) -> Self {
        let now = Utc::now();
        SessionFile {
            meta: SessionMetadata {
                version: SCHEMA_VERSION.to_string(),
                created: now,
                modified: now,
            },
            context,
        }
    }

    /// Replace the context and bump the modified timestamp.
    pub fn update(&mut self, context: CalculatorContext) {
        self.context = context;
        self.meta.modified = Utc::now();
    }
}

/// Lock file metadata stored in `.lock` files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    /// Machine name where lock was acquired
    pub machine: String,
    /// Process ID that holds the lock
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::env::var("HOST").ok())
    }
}

/// Exclusive lock on a session file, released on drop.
///
/// Combines an OS-level lock (via fs2) with a `.lock` file whose metadata
/// tells other users who holds it.
pub struct FileLock {
    session_path: PathBuf,
    lock_path: PathBuf,
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire an exclusive lock on a session file.
    ///
    /// Fails with [`CalcError::FileLocked`] if a live lock is held elsewhere.
    /// Stale locks (dead pid on this machine, or older than a day) are taken over.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> CalcResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if lock_path.exists() {
            if let Ok(existing) = read_lock_info(&lock_path) {
                if !is_lock_stale(&existing) {
                    return Err(CalcError::file_locked(
                        path.display().to_string(),
                        format!("{} ({})", existing.user_id, existing.machine),
                        existing.locked_at.to_rfc3339(),
                    ));
                }
                warn!(
                    path = %path.display(),
                    previous_owner = %existing.user_id,
                    "taking over stale session lock"
                );
            }
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| CalcError::file_error("create lock", lock_path.display().to_string(), e.to_string()))?;

        lock_file.try_lock_exclusive().map_err(|_| {
            CalcError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;

        let lock_json = serde_json::to_string_pretty(&info).map_err(CalcError::serialization)?;

        lock_file
            .write_all(lock_json.as_bytes())
            .map_err(|e| CalcError::file_error("write lock", lock_path.display().to_string(), e.to_string()))?;

        lock_file
            .sync_all()
            .map_err(|e| CalcError::file_error("sync lock", lock_path.display().to_string(), e.to_string()))?;

        Ok(FileLock {
            session_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Who holds a live lock on `path`, if anyone.
    pub fn check(path: &Path) -> Option<LockInfo> {
        let lock_path = lock_path_for(path);
        if lock_path.exists() {
            if let Ok(info) = read_lock_info(&lock_path) {
                if !is_lock_stale(&info) {
                    return Some(info);
                }
            }
        }
        None
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // OS lock goes with the handle
        let _ = fs::remove_file(&self.lock_path);
    }
}

/// `<file>.<ext>` -> `<file>.<ext>.<suffix>`
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn lock_path_for(session_path: &Path) -> PathBuf {
    sibling_with_suffix(session_path, "lock")
}

fn read_lock_info(lock_path: &Path) -> CalcResult<LockInfo> {
    let mut file = File::open(lock_path)
        .map_err(|e| CalcError::file_error("read lock", lock_path.display().to_string(), e.to_string()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| CalcError::file_error("read lock", lock_path.display().to_string(), e.to_string()))?;

    serde_json::from_str(&contents).map_err(CalcError::serialization)
}

/// A lock is stale when its process is gone (same machine) or it is older than a day.
fn is_lock_stale(info: &LockInfo) -> bool {
    if let Some(our_machine) = hostname() {
        if info.machine == our_machine {
            #[cfg(windows)]
            {
                use std::process::Command;
                let output = Command::new("tasklist")
                    .args(["/FI", &format!("PID eq {}", info.pid), "/NH"])
                    .output();
                if let Ok(output) = output {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if stdout.contains("No tasks") || !stdout.contains(&info.pid.to_string()) {
                        return true;
                    }
                }
            }
            #[cfg(unix)]
            {
                if fs::metadata(format!("/proc/{}", info.pid)).is_err() {
                    return true;
                }
            }
        }
    }

    let age = Utc::now() - info.locked_at;
    age.num_hours() > STALE_LOCK_HOURS
}

/// Save a session with atomic write semantics.
///
/// Serializes to JSON, writes `<path>.tmp`, fsyncs, then renames over `path`.
pub fn save_session(session: &SessionFile, path: &Path) -> CalcResult<()> {
    let json = serde_json::to_string_pretty(session).map_err(CalcError::serialization)?;

    let tmp_path = sibling_with_suffix(path, "tmp");

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| CalcError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .write_all(json.as_bytes())
        .map_err(|e| CalcError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .sync_all()
        .map_err(|e| CalcError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

    drop(tmp_file);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CalcError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    Ok(())
}

/// Load a session file and check its schema version.
pub fn load_session(path: &Path) -> CalcResult<SessionFile> {
    let mut file =
        File::open(path).map_err(|e| CalcError::file_error("open", path.display().to_string(), e.to_string()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| CalcError::file_error("read", path.display().to_string(), e.to_string()))?;

    let session: SessionFile = serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })?;

    validate_version(&session.meta.version)?;

    Ok(session)
}

/// Load a session together with any live lock held on it.
pub fn load_session_with_lock_check(path: &Path) -> CalcResult<(SessionFile, Option<LockInfo>)> {
    let session = load_session(path)?;
    let lock_info = FileLock::check(path);
    Ok((session, lock_info))
}

/// Major must match; on 0.x a newer minor is also rejected.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version.split('.').filter_map(|p| p.parse().ok()).collect();
    let current_parts: Vec<u32> = SCHEMA_VERSION.split('.').filter_map(|p| p.parse().ok()).collect();

    let (Some(file_major), Some(current_major)) = (file_parts.first(), current_parts.first()) else {
        return Err(mismatch());
    };
    if file_major != current_major {
        return Err(mismatch());
    }
    if *current_major == 0 {
        if let (Some(file_minor), Some(current_minor)) = (file_parts.get(1), current_parts.get(1)) {
            if file_minor > current_minor {
                return Err(mismatch());
            }
        }
    }

    Ok(())
}
