//! Configuration section definitions.
//!
//! | Module     | TOML Section  | Purpose                                  |
//! |------------|---------------|------------------------------------------|
//! | `collect`  | `[collect]`   | What to collect, dedup, worker count     |
//! | `layout`   | `[layout]`    | Destination folders and file names       |
//! | `document` | `[document]`  | Document copy and relinking              |
//! | `pack`     | `[pack]`      | Categories embedded by pack              |

mod collect;
mod document;
mod layout;
mod pack;

pub use collect::CollectSection;
pub use document::DocumentSection;
pub use layout::LayoutSection;
pub use pack::PackSection;
