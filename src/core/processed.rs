//! Completed-URL log: one URL per line, appended after each successful archive.
//!
//! Membership is exact string equality against whole lines. Inserts take an exclusive
//! `<log>.lock` file, re-read the log and append only when the URL is still absent, so two
//! runs sharing a log never record the same URL twice.
//!
//! A busy lock is retried for about a second. A lock file older than [`STALE_LOCK_AGE`]
//! was left by a crashed run and is taken over.
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct ProcessedLog {
    path: PathBuf,
    entries: HashSet<String>,
}

/// Held while the log is re-read and appended; removes the lock file on drop
struct LockGuard {
    path: PathBuf,
}

/// The lock only covers a re-read and an append; anything older is abandoned
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(30);
const LOCK_ATTEMPTS: u32 = 20;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(50);

fn lock_path(log: &Path) -> PathBuf {
    let mut name = log.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}

impl LockGuard {
    fn acquire(log: &Path) -> Result<Self> {
        let path = lock_path(log);
        for attempt in 1..=LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut f) => {
                    let guard = LockGuard { path };
                    writeln!(f, "{}", std::process::id())?;
                    return Ok(guard);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        warn!("Removing stale lock file {:?}", path);
                        match fs::remove_file(&path) {
                            Ok(()) => continue,
                            Err(e) if e.kind() == ErrorKind::NotFound => continue,
                            Err(e) => return Err(e.into()),
                        }
                    }
                    if attempt < LOCK_ATTEMPTS {
                        thread::sleep(LOCK_RETRY_DELAY);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::LockHeld { path })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove lock file {:?}: {}", self.path, e);
        }
    }
}

fn read_entries(path: &Path) -> Result<HashSet<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashSet::new()),
        Err(e) => Err(e.into()),
    }
}

impl ProcessedLog {
    /// Load the log; a missing file is an empty log
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = read_entries(&path)?;
        debug!("Loaded {} completed URL(s) from {:?}", entries.len(), path);
        Ok(ProcessedLog { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Pick up entries appended by other runs. Goes through the lock, so a log that
    /// cannot be written fails here rather than after the work is done.
    pub fn refresh(&mut self) -> Result<()> {
        self.ensure_parent()?;
        let _lock = LockGuard::acquire(&self.path)?;
        self.entries = read_entries(&self.path)?;
        Ok(())
    }

    /// Record `url`; returns false if it was already present on disk
    pub fn insert(&mut self, url: &str) -> Result<bool> {
        if url.contains('\n') {
            return Err(Error::InvalidArgument {
                arg: "url",
                value: url.to_string(),
            });
        }
        self.ensure_parent()?;
        let _lock = LockGuard::acquire(&self.path)?;
        self.entries = read_entries(&self.path)?;
        if self.entries.contains(url) {
            return Ok(false);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // An earlier writer may have left the last line unterminated
        if file.metadata()?.len() > 0 && !ends_with_newline(&self.path)? {
            writeln!(file)?;
        }
        writeln!(file, "{}", url)?;
        file.sync_all()?;
        self.entries.insert(url.to_string());
        Ok(true)
    }
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    use std::io::{Read, Seek, SeekFrom};
    let mut f = File::open(path)?;
    f.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    f.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = ProcessedLog::open(dir.path().join("logfile.txt")).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn membership_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logfile.txt");
        fs::write(&path, "https://host/a.zip\nhttps://host/b.zip \n").unwrap();
        let log = ProcessedLog::open(&path).unwrap();
        assert!(log.contains("https://host/a.zip"));
        assert!(!log.contains("https://host/a.zip "));
        assert!(!log.contains("https://host/b.zip"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn insert_appends_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("logfile.txt");
        let mut log = ProcessedLog::open(&path).unwrap();
        assert!(log.insert("https://host/a.zip").unwrap());
        assert!(!log.insert("https://host/a.zip").unwrap());
        assert!(log.insert("https://host/b.zip").unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "https://host/a.zip\nhttps://host/b.zip\n"
        );
        assert!(!dir.path().join("sub").join("logfile.txt.lock").exists());
    }

    #[test]
    fn insert_sees_entries_from_other_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logfile.txt");
        let mut first = ProcessedLog::open(&path).unwrap();
        let mut second = ProcessedLog::open(&path).unwrap();
        assert!(first.insert("https://host/a.zip").unwrap());
        assert!(!second.contains("https://host/a.zip"));
        assert!(!second.insert("https://host/a.zip").unwrap());
        assert!(second.contains("https://host/a.zip"));
    }

    #[test]
    fn unterminated_last_line_is_kept_separate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logfile.txt");
        fs::write(&path, "https://host/a.zip").unwrap();
        let mut log = ProcessedLog::open(&path).unwrap();
        log.insert("https://host/b.zip").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "https://host/a.zip\nhttps://host/b.zip\n"
        );
    }

    #[test]
    fn held_lock_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logfile.txt");
        fs::write(dir.path().join("logfile.txt.lock"), "4242\n").unwrap();
        let mut log = ProcessedLog::open(&path).unwrap();
        let err = log.insert("https://host/a.zip").unwrap_err();
        assert!(matches!(err, Error::LockHeld { .. }));
        assert!(!path.exists());
        assert!(matches!(log.refresh().unwrap_err(), Error::LockHeld { .. }));
    }

    #[test]
    fn stale_lock_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logfile.txt");
        let lock = dir.path().join("logfile.txt.lock");
        fs::write(&lock, "4242\n").unwrap();
        File::options()
            .write(true)
            .open(&lock)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();

        let mut log = ProcessedLog::open(&path).unwrap();
        assert!(log.insert("https://host/a.zip").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "https://host/a.zip\n");
        assert!(!lock.exists());
    }

    #[test]
    fn refresh_sees_other_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logfile.txt");
        let mut log = ProcessedLog::open(&path).unwrap();
        fs::write(&path, "https://host/a.zip\n").unwrap();
        assert!(!log.contains("https://host/a.zip"));
        log.refresh().unwrap();
        assert!(log.contains("https://host/a.zip"));
        assert!(!dir.path().join("logfile.txt.lock").exists());
    }
}
