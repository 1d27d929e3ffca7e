//! In-memory host document, persisted as a JSON manifest.
//!
//! Stands in for a real host application: tests drive the whole pipeline
//! through it, and embedders can keep a reference snapshot outside the host.
//!
//! ```json
//! {
//!   "references": [
//!     { "stored_path": "//textures/wood.png", "category": "image",
//!       "datablock_name": "Wood", "is_used": true },
//!     { "stored_path": "logo.png", "category": "image",
//!       "datablock_name": "Logo", "is_embedded": true, "blob": "89504e47" }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{DocumentWriter, HostDocument, HostError, RawReference, ReferenceId};
use crate::utils::write_atomic;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDocument {
    /// Where the manifest lives; `None` for a never-saved document
    #[serde(skip)]
    path: Option<PathBuf>,
    /// Reject all path rewrites (simulates a locked document)
    #[serde(skip)]
    read_only: bool,
    references: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    #[serde(flatten)]
    raw: RawReference,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "blob_hex")]
    blob: Option<Vec<u8>>,
}

impl MemoryDocument {
    /// A document that has never been saved.
    pub fn new() -> Self {
        Self::default()
    }

    /// A document considered saved at `path` (nothing is written yet).
    pub fn saved_at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let content =
            fs::read_to_string(path).map_err(|err| HostError::Io(path.to_path_buf(), err))?;
        let mut doc: Self = serde_json::from_str(&content)?;
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    /// Write the manifest to its own path.
    pub fn save(&self) -> Result<(), HostError> {
        let path = self.path.as_deref().ok_or(HostError::Unsaved)?;
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json).map_err(|err| HostError::Io(path.to_path_buf(), err))
    }

    /// Save under a new path, which becomes the document's path.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), HostError> {
        self.path = Some(path.into());
        self.save()
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Append a reference and return its id.
    pub fn push(&mut self, raw: RawReference) -> ReferenceId {
        let embedded = raw.is_embedded;
        self.references.push(Entry {
            raw,
            blob: embedded.then(Vec::new),
        });
        ReferenceId(self.references.len() - 1)
    }

    /// Append an embedded reference carrying `bytes`.
    pub fn push_embedded(&mut self, raw: RawReference, bytes: Vec<u8>) -> ReferenceId {
        let id = self.push(raw.embedded());
        self.references[id.0].blob = Some(bytes);
        id
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn reference(&self, id: ReferenceId) -> Option<&RawReference> {
        self.references.get(id.0).map(|e| &e.raw)
    }

    pub fn blob(&self, id: ReferenceId) -> Option<&[u8]> {
        self.references.get(id.0).and_then(|e| e.blob.as_deref())
    }

    fn entry_mut(&mut self, id: ReferenceId) -> Result<&mut Entry, HostError> {
        self.references
            .get_mut(id.0)
            .ok_or(HostError::UnknownReference(id))
    }
}

impl DocumentWriter for MemoryDocument {
    fn set_path(&mut self, id: ReferenceId, new_path: &str) -> Result<(), HostError> {
        if self.read_only {
            return Err(HostError::Rejected("document is read-only".into()));
        }
        self.entry_mut(id)?.raw.stored_path = new_path.to_string();
        Ok(())
    }

    /// Saved documents write their manifest; unsaved ones only live in memory.
    fn flush(&mut self) -> Result<(), HostError> {
        if self.path.is_some() {
            self.save()
        } else {
            Ok(())
        }
    }
}

impl HostDocument for MemoryDocument {
    fn enumerate_references(&self) -> Vec<RawReference> {
        self.references.iter().map(|e| e.raw.clone()).collect()
    }

    fn document_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn embed_blob(&mut self, id: ReferenceId, bytes: Vec<u8>) -> Result<(), HostError> {
        let entry = self.entry_mut(id)?;
        entry.blob = Some(bytes);
        entry.raw.is_embedded = true;
        Ok(())
    }

    fn extract_blob(&self, id: ReferenceId) -> Result<Vec<u8>, HostError> {
        let entry = self
            .references
            .get(id.0)
            .ok_or(HostError::UnknownReference(id))?;
        entry.blob.clone().ok_or(HostError::NotEmbedded(id))
    }

    fn release_blob(&mut self, id: ReferenceId) -> Result<(), HostError> {
        let entry = self.entry_mut(id)?;
        entry.blob = None;
        entry.raw.is_embedded = false;
        Ok(())
    }

    fn save_copy(&self, dest: &Path) -> Result<Box<dyn DocumentWriter>, HostError> {
        let mut copy = self.clone();
        copy.read_only = false;
        copy.save_as(dest)?;
        Ok(Box::new(copy))
    }
}

/// Blobs are stored as hex strings in the manifest.
mod blob_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(blob: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match blob {
            Some(bytes) => s.serialize_some(&hex::encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|h| hex::decode(h).map_err(serde::de::Error::custom))
            .transpose()
    }
}
