//! Path normalization.
//!
//! Two stages:
//! - `normalize_lexical` - drop `.`, fold `..`, unify separators (no I/O)
//! - `normalize_path` - lexical, then resolve symlinks on the longest
//!   existing prefix so missing files still normalize consistently

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Normalize a path without touching the filesystem.
///
/// `..` pops the previous normal component; at the root it is dropped, and
/// at the start of a relative path it is kept.
pub fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    let mut depth = 0usize;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth > 0 {
                    out.pop();
                    depth -= 1;
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }

    out
}

/// Normalize a file system path to canonical absolute form.
///
/// Relative input is joined with the current directory first. Symlinks are
/// resolved on the longest existing prefix; the missing tail is appended
/// as-is, so `normalize_path(normalize_path(p)) == normalize_path(p)`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    let lexical = normalize_lexical(&absolute);

    if let Ok(canonical) = lexical.canonicalize() {
        return canonical;
    }

    // Walk up until something exists, then re-append the missing tail
    let mut tail: Vec<OsString> = Vec::new();
    let mut cursor = lexical.as_path();
    while let Some(parent) = cursor.parent() {
        if let Some(name) = cursor.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(canonical) = parent.canonicalize() {
            let mut out = canonical;
            out.extend(tail.iter().rev());
            return out;
        }
        cursor = parent;
    }

    lexical
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lexical_dots() {
        assert_eq!(
            normalize_lexical(Path::new("/a/./b/../c/d.png")),
            PathBuf::from("/a/c/d.png")
        );
        assert_eq!(normalize_lexical(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_lexical(Path::new("../x/./y")), PathBuf::from("../x/y"));
        assert_eq!(normalize_lexical(Path::new("a/b/")), PathBuf::from("a/b"));
    }

    #[test]
    fn test_normalize_relative_is_absolute() {
        let normalized = normalize_path(Path::new("relative/path/file.txt"));
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_normalize_missing_tail_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope").join("..").join("later").join("x.exr");
        let once = normalize_path(&missing);
        assert!(once.ends_with("later/x.exr"));
        assert_eq!(normalize_path(&once), once);
    }

    #[test]
    fn test_normalize_existing_matches_canonicalize() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.bin");
        fs::write(&file, [0u8, 1, 2]).unwrap();
        assert_eq!(normalize_path(&file), file.canonicalize().unwrap());
    }
}
