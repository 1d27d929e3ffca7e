//! File name policy: sanitizing, datablock renaming, collision suffixes.

use std::path::Path;

use crate::scan::AssetReference;

/// Used when nothing printable is left of a name.
pub const FALLBACK_NAME: &str = "asset";

/// Characters rejected by at least one common filesystem.
const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Device names Windows refuses regardless of extension.
const RESERVED_STEMS: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// How destination file names are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NamingOptions {
    /// Put every file in the destination root instead of category folders.
    pub flatten: bool,
    /// Name files after their datablock (original extension kept).
    pub rename_to_datablock: bool,
}

/// Make an arbitrary label safe as a portable file name.
///
/// Transliterates to ASCII, replaces reserved and control characters with
/// `_`, trims dots and whitespace at both ends.
///
/// ```ignore
/// assert_eq!(sanitize_name("Ölfass: rost/1"), "Olfass_ rost_1");
/// assert_eq!(sanitize_name("..."), "asset");
/// ```
pub fn sanitize_name(raw: &str) -> String {
    let ascii = deunicode::deunicode(raw);
    let replaced: String = ascii
        .chars()
        .map(|c| {
            if c.is_control() || RESERVED_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        return FALLBACK_NAME.to_string();
    }

    let stem = trimmed.split('.').next().unwrap_or(trimmed);
    if RESERVED_STEMS.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        format!("{stem}_{}", &trimmed[stem.len()..])
    } else {
        trimmed.to_string()
    }
}

/// Extension of a file name, without the dot.
fn extension(file_name: &str) -> Option<&str> {
    Path::new(file_name).extension().and_then(|e| e.to_str())
}

/// Destination file name for a reference, before collision handling.
pub fn target_file_name(reference: &AssetReference, naming: NamingOptions) -> String {
    let original = reference.file_name().filter(|n| !n.is_empty());

    if !naming.rename_to_datablock {
        return original.map_or_else(|| FALLBACK_NAME.to_string(), str::to_string);
    }

    let name = sanitize_name(&reference.datablock_name);
    match original.and_then(extension) {
        Some(ext) => {
            let dotted = format!(".{ext}");
            if name.to_ascii_lowercase().ends_with(&dotted.to_ascii_lowercase()) {
                name
            } else {
                format!("{name}{dotted}")
            }
        }
        None => name,
    }
}

/// `n`-th candidate for a name: `tex.png`, `tex_1.png`, `tex_2.png`, ...
pub fn suffixed(name: &str, n: usize) -> String {
    if n == 0 {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{n}.{ext}"),
        None => format!("{stem}_{n}"),
    }
}
