//! Atomic file writes.
//!
//! Both helpers write into a hidden sibling (`.<name>.part`) and rename it
//! into place, so readers never observe a truncated destination file.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temporary sibling used while `dest` is being written.
fn part_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.part"))
}

/// Run `fill` against a temporary file, then rename it over `dest`.
///
/// The temporary file is removed if anything fails.
fn commit_with(dest: &Path, fill: impl FnOnce(&mut File) -> io::Result<()>) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let part = part_path(dest);
    let result = File::create(&part).and_then(|mut file| {
        fill(&mut file)?;
        file.sync_all()
    });

    match result.and_then(|()| fs::rename(&part, dest)) {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = fs::remove_file(&part);
            Err(err)
        }
    }
}

/// Write `bytes` to `dest` atomically, creating parent directories.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    commit_with(dest, |file| file.write_all(bytes))
}

/// Copy `source` to `dest` atomically, byte for byte. Returns bytes copied.
///
/// The source is opened before anything is created at the destination, so
/// an unreadable source leaves no trace.
pub fn copy_atomic(source: &Path, dest: &Path) -> io::Result<u64> {
    let mut reader = File::open(source)?;
    let mut copied = 0;
    commit_with(dest, |file| {
        copied = io::copy(&mut reader, file)?;
        Ok(())
    })?;
    Ok(copied)
}
