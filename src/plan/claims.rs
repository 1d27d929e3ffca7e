//! Ledger of destination names taken during one plan.

use std::fs;
use std::path::{Component, Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use super::name::suffixed;
use crate::error::CollectError;
use crate::hash::{ContentHash, compute_file_hash};

/// Upper bound on `name_N` candidates before giving up.
pub const MAX_SUFFIX: usize = 10_000;

/// Outcome of claiming a name, relative to the destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// Nothing lives there yet.
    Fresh(PathBuf),
    /// A file with identical content is already there.
    Reuse(PathBuf),
}

impl Claim {
    pub fn path(&self) -> &Path {
        match self {
            Self::Fresh(p) | Self::Reuse(p) => p,
        }
    }

    pub const fn is_reuse(&self) -> bool {
        matches!(self, Self::Reuse(_))
    }
}

/// Destination names claimed so far.
///
/// Keys are compared case-insensitively so the tree survives a move to a
/// case-insensitive filesystem. Files already under the root count as
/// taken unless their content matches the claimant's hash.
#[derive(Debug, Clone, Default)]
pub struct NameClaims {
    root: PathBuf,
    claimed: FxHashSet<String>,
    /// Lazily read directory listings: relative dir -> lowercase -> actual name
    listings: FxHashMap<PathBuf, FxHashMap<String, String>>,
}

impl NameClaims {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    /// `rel` (relative to the root) has been handed out.
    pub fn is_claimed(&self, rel: &Path) -> bool {
        self.claimed.contains(&claim_key(rel))
    }

    /// Claim `dir/name`, or the first free suffixed variant.
    ///
    /// With `hash`, an existing file of identical content is reused in place.
    /// A name claimed earlier in this ledger is never handed out twice.
    pub fn claim(
        &mut self,
        dir: &Path,
        name: &str,
        hash: Option<ContentHash>,
    ) -> Result<Claim, CollectError> {
        for n in 0..=MAX_SUFFIX {
            let candidate = suffixed(name, n);
            let rel = dir.join(&candidate);
            let key = claim_key(&rel);
            if self.claimed.contains(&key) {
                continue;
            }

            let claim = match self.existing(dir, &candidate) {
                None => Claim::Fresh(rel),
                Some(actual) => {
                    let existing = dir.join(actual);
                    if !self.same_content(&existing, hash) {
                        continue;
                    }
                    Claim::Reuse(existing)
                }
            };
            self.claimed.insert(key);
            return Ok(claim);
        }

        Err(CollectError::NameCollisionUnresolved(
            self.root.join(dir).join(name),
        ))
    }

    /// Actual on-disk name matching `name` case-insensitively in `dir`.
    fn existing(&mut self, dir: &Path, name: &str) -> Option<String> {
        let listing = self
            .listings
            .entry(dir.to_path_buf())
            .or_insert_with(|| list_dir(&self.root.join(dir)));
        listing.get(&name.to_lowercase()).cloned()
    }

    fn same_content(&self, rel: &Path, hash: Option<ContentHash>) -> bool {
        let Some(hash) = hash else { return false };
        let path = self.root.join(rel);
        path.is_file() && compute_file_hash(&path).is_ok_and(|h| h == hash)
    }
}

fn list_dir(dir: &Path) -> FxHashMap<String, String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return FxHashMap::default();
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|e| e.file_name().into_string().ok())
        .map(|name| (name.to_lowercase(), name))
        .collect()
}

/// Case-folded, forward-slash key of a relative path.
fn claim_key(rel: &Path) -> String {
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_lowercase()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use tempfile::TempDir;

    #[test]
    fn test_suffixes_on_collision() {
        let dir = TempDir::new().unwrap();
        let mut claims = NameClaims::new(dir.path());
        let images = Path::new("images");

        let first = claims.claim(images, "tex.png", None).unwrap();
        let second = claims.claim(images, "tex.png", None).unwrap();
        let third = claims.claim(images, "TEX.png", None).unwrap();

        assert_eq!(first, Claim::Fresh(PathBuf::from("images/tex.png")));
        assert_eq!(second, Claim::Fresh(PathBuf::from("images/tex_1.png")));
        assert_eq!(third, Claim::Fresh(PathBuf::from("images/TEX_2.png")));
        assert_eq!(claims.len(), 3);
    }

    #[test]
    fn test_same_name_in_other_folder_is_free() {
        let dir = TempDir::new().unwrap();
        let mut claims = NameClaims::new(dir.path());
        claims.claim(Path::new("images"), "a.png", None).unwrap();
        let other = claims.claim(Path::new("fonts"), "a.png", None).unwrap();
        assert_eq!(other.path(), Path::new("fonts/a.png"));
    }

    #[test]
    fn test_reuses_identical_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("images")).unwrap();
        fs::write(dir.path().join("images/tex.png"), b"same").unwrap();

        let mut claims = NameClaims::new(dir.path());
        let claim = claims
            .claim(Path::new("images"), "tex.png", Some(hash_bytes(b"same")))
            .unwrap();
        assert_eq!(claim, Claim::Reuse(PathBuf::from("images/tex.png")));
        assert!(claims.is_claimed(Path::new("images/TEX.PNG")));
    }

    #[test]
    fn test_skips_unrelated_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tex.png"), b"unrelated").unwrap();
        fs::write(dir.path().join("Tex_1.png"), b"also unrelated").unwrap();

        let mut claims = NameClaims::new(dir.path());
        let claim = claims
            .claim(Path::new(""), "tex.png", Some(hash_bytes(b"mine")))
            .unwrap();
        assert_eq!(claim, Claim::Fresh(PathBuf::from("tex_2.png")));
    }

    #[test]
    fn test_existing_file_without_hash_is_never_reused() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("scene.json"), b"{}").unwrap();

        let mut claims = NameClaims::new(dir.path());
        let claim = claims.claim(Path::new(""), "scene.json", None).unwrap();
        assert_eq!(claim, Claim::Fresh(PathBuf::from("scene_1.json")));
    }

    #[test]
    fn test_reused_name_is_not_handed_out_twice() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), b"same").unwrap();

        let mut claims = NameClaims::new(dir.path());
        let hash = Some(hash_bytes(b"same"));
        let first = claims.claim(Path::new(""), "a.png", hash).unwrap();
        let second = claims.claim(Path::new(""), "a.png", hash).unwrap();
        assert!(first.is_reuse());
        assert_eq!(second, Claim::Fresh(PathBuf::from("a_1.png")));
    }

    #[test]
    fn test_claim_key_folds_case() {
        assert_eq!(claim_key(Path::new("Images/Tex.PNG")), "images/tex.png");
    }
}
