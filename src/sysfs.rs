// SPDX-License-Identifier: GPL-3.0-only

//! Sysfs/procfs I/O primitives (spec §4.1). Every path passed to these functions is
//! relative to the real filesystem root unless `UMOCKDEV_DIR` is set, in which case it
//! is rooted under that directory instead — grounded on the teacher's own use of an
//! analogous `UMOCKDEV_DIR` convention for testability.

use crate::errors::SysfsError;
use inotify::{Inotify, WatchMask};
use std::{
    io::{self, ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU32, Ordering},
};

/// Resolves a sysfs-absolute path against the `UMOCKDEV_DIR` override, if set.
pub fn resolve(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match std::env::var_os("UMOCKDEV_DIR") {
        Some(root) if !root.is_empty() => {
            let root = Path::new(&root);
            // `path` is always absolute (a sysfs/procfs path); strip the leading `/`
            // so `Path::join` doesn't treat it as itself-absolute and discard root.
            root.join(path.strip_prefix("/").unwrap_or(path))
        }
        _ => path.to_owned(),
    }
}

/// Open-truncate-write-close, retried across `EINTR`, flushed before returning so the
/// write is observable immediately after `write_attr` returns (spec §4.1).
pub fn write_attr(path: impl AsRef<Path>, value: &str) -> Result<(), SysfsError> {
    let resolved = resolve(&path);
    let mut attempts = 0;
    loop {
        let result = std::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&resolved)
            .and_then(|mut file| {
                file.write_all(value.as_bytes())?;
                file.flush()
            });

        match result {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted && attempts < 8 => {
                attempts += 1;
                continue;
            }
            Err(source) => {
                return Err(SysfsError::Write { path: path.as_ref().to_owned(), source });
            }
        }
    }
}

/// Reads an attribute, trimming the trailing newline. Distinguishes `NotFound` from
/// other I/O errors per spec §4.1.
pub fn read_attr(path: impl AsRef<Path>) -> Result<String, SysfsError> {
    let resolved = resolve(&path);
    match std::fs::read_to_string(&resolved) {
        Ok(mut contents) => {
            if contents.ends_with('\n') {
                contents.pop();
            }
            Ok(contents)
        }
        Err(source) if source.kind() == ErrorKind::NotFound => {
            Err(SysfsError::NotFound(path.as_ref().to_owned()))
        }
        Err(source) => Err(SysfsError::Read { path: path.as_ref().to_owned(), source }),
    }
}

/// A watcher over a single sysfs attribute, suppressible across self-initiated writes
/// so they don't generate spurious external-change events (spec §5).
pub struct AttrWatcher {
    inotify: Inotify,
    path: PathBuf,
    /// Incremented by [`Self::suppressed`] around self-writes; events are dropped
    /// while this is non-zero, replacing a signal-handler-id block/unblock pair with a
    /// plain counter (design notes §9).
    suppress_depth: AtomicU32,
}

impl AttrWatcher {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SysfsError> {
        let resolved = resolve(&path);
        let mut inotify = Inotify::init().map_err(|source| SysfsError::Watch {
            path: path.as_ref().to_owned(),
            source,
        })?;
        inotify
            .watches()
            .add(&resolved, WatchMask::MODIFY | WatchMask::CLOSE_WRITE)
            .map_err(|source| SysfsError::Watch { path: path.as_ref().to_owned(), source })?;

        Ok(Self { inotify, path: path.as_ref().to_owned(), suppress_depth: AtomicU32::new(0) })
    }

    /// Runs `f`, a self-initiated write, while suppressing the watcher's next events.
    pub fn suppressed<T>(&self, f: impl FnOnce() -> T) -> T {
        self.suppress_depth.fetch_add(1, Ordering::SeqCst);
        let result = f();
        // Drain whatever inotify already buffered from our own write before
        // un-suppressing, so it isn't mistaken for an external change later.
        let mut buf = [0; 1024];
        let _ = self.inotify.read_events(&mut buf);
        self.suppress_depth.fetch_sub(1, Ordering::SeqCst);
        result
    }

    /// Non-blocking poll for a change event; `Ok(true)` means the file changed and was
    /// not suppressed.
    pub fn poll_changed(&mut self) -> io::Result<bool> {
        let mut buf = [0; 1024];
        match self.inotify.read_events(&mut buf) {
            Ok(events) => {
                let any = events.count() > 0;
                Ok(any && self.suppress_depth.load(Ordering::SeqCst) == 0)
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn path(&self) -> &Path { &self.path }
}

/// Rewinds and re-reads an already-open file; some sysfs attributes require seeking to
/// the start rather than reopening (kept as a small helper for drivers that hold a
/// long-lived handle, e.g. the MSR-style attributes some platform quirks touch).
pub fn reread(file: &mut std::fs::File) -> io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    if buf.ends_with('\n') {
        buf.pop();
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_without_override_is_identity() {
        let _guard = crate::test_support::lock_env();
        std::env::remove_var("UMOCKDEV_DIR");
        assert_eq!(resolve("/sys/class/foo"), PathBuf::from("/sys/class/foo"));
    }

    #[test]
    fn read_attr_trims_trailing_newline() {
        let dir = std::env::temp_dir().join(format!("ppm-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("attr");
        std::fs::write(&file, "performance\n").unwrap();
        assert_eq!(read_attr(&file).unwrap(), "performance");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn read_attr_missing_is_not_found() {
        let err = read_attr("/nonexistent/path/for/sure").unwrap_err();
        assert!(matches!(err, SysfsError::NotFound(_)));
    }
}
