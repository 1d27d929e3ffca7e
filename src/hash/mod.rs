//! Content fingerprints and duplicate detection using blake3.
//!
//! Fingerprints cover the full file bytes: renamed-but-identical files
//! group together, same-name-different-content files never do.

mod detect;

pub use detect::{DuplicateGroup, DuplicateIndex, detect};

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Buffer size for streaming reads.
const CHUNK: usize = 64 * 1024;

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 16 hex chars are plenty for log lines
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Hash an in-memory buffer.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    ContentHash::new(*blake3::hash(bytes).as_bytes())
}

/// Stream a file through blake3.
pub fn compute_file_hash(path: &Path) -> io::Result<ContentHash> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(CHUNK, file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(ContentHash::new(*hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_hash_matches_bytes_hash() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.bin");
        let bytes: Vec<u8> = (0..=255u8).cycle().take(3 * CHUNK + 17).collect();
        fs::write(&path, &bytes).unwrap();

        assert_eq!(compute_file_hash(&path).unwrap(), hash_bytes(&bytes));
    }

    #[test]
    fn test_same_content_different_names() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), b"pixels").unwrap();
        fs::write(dir.path().join("b.png"), b"pixels").unwrap();
        fs::write(dir.path().join("c.png"), b"other").unwrap();

        let a = compute_file_hash(&dir.path().join("a.png")).unwrap();
        let b = compute_file_hash(&dir.path().join("b.png")).unwrap();
        let c = compute_file_hash(&dir.path().join("c.png")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = compute_file_hash(Path::new("/packrat-no-such-root/x.bin")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = hash_bytes(b"hello");
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(ContentHash::from_hex(&hex), Some(hash));
        assert_eq!(hash.to_string(), hex[..16]);
        assert_eq!(ContentHash::from_hex("abcd"), None);
    }
}
