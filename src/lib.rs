//! packrat - collect a project document's external files into one portable tree.
//!
//! The host application exposes its references through [`host::HostDocument`];
//! everything else in this crate works on the snapshot it returns.
//!
//! ```text
//! host ─▶ scan ─▶ hash ─▶ plan ─▶ collect ─▶ relink ─▶ host (copy)
//!          │
//!          └────────────▶ pack / unpack ───────────▶ host (blobs)
//! ```
//!
//! # Module Structure
//!
//! | Module    | Purpose                                               |
//! |-----------|-------------------------------------------------------|
//! | `path`    | Stored path forms, resolution and relative reduction  |
//! | `scan`    | Reference graph from the host enumeration             |
//! | `hash`    | blake3 fingerprints and duplicate groups              |
//! | `plan`    | Collision-safe destination naming                     |
//! | `collect` | Bounded-parallel copying into the destination tree    |
//! | `relink`  | Path write-back through the host                      |
//! | `pack`    | Embedding into / extracting from the host blob store  |
//! | `project` | The whole collection run, end to end                  |

pub mod logger;

pub mod collect;
pub mod config;
pub mod core;
pub mod error;
pub mod hash;
pub mod host;
pub mod pack;
pub mod path;
pub mod plan;
pub mod project;
pub mod relink;
pub mod scan;
pub mod utils;

pub use crate::core::{AssetCategory, CancelToken, CategorySet};
pub use collect::{CollectionReport, CollectionStatus, collect};
pub use config::{CollectConfig, ConfigError};
pub use error::{CollectError, Failure, FailureKind};
pub use hash::{ContentHash, DuplicateGroup, DuplicateIndex, compute_file_hash, detect};
pub use host::{
    DocumentWriter, HostDocument, HostError, MemoryDocument, RawReference, ReferenceId,
};
pub use pack::{PackReport, PackStatus, UnpackReport, UnpackStatus, pack, unpack};
pub use path::{StoredPath, reduce_to_relative, resolve};
pub use plan::{DestinationPlan, NamingOptions, PlanAction, PlanOptions, assign};
pub use project::{ProjectReport, collect_project, pack_project};
pub use relink::{RelinkReport, RelinkStatus, relink, relink_original};
pub use scan::{AssetReference, ReferenceGraph, ScanOptions, ScanSummary, scan, scan_host};
