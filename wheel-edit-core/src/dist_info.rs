//! C6: locating, naming, and renaming the `.dist-info` directory.

use crate::zip::Entry;
use crate::Error;

/// Collapse every maximal run of `-`, `_`, `.` to a single `_`, preserving
/// case. Used for the dist-info directory name.
pub fn normalize_dist_info_name(name: &str) -> String {
    collapse_separators(name, '_')
}

/// PEP 503: lowercase, then collapse every maximal run of `-`, `_`, `.` to
/// a single `-`. Used for the distribution field of the wheel filename.
pub fn normalize_pep503_name(name: &str) -> String {
    collapse_separators(&name.to_ascii_lowercase(), '-')
}

fn collapse_separators(name: &str, replacement: char) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_was_sep = false;
    for c in name.chars() {
        if c == '-' || c == '_' || c == '.' {
            if !prev_was_sep {
                out.push(replacement);
            }
            prev_was_sep = true;
        } else {
            out.push(c);
            prev_was_sep = false;
        }
    }
    out
}

/// The canonical `.dist-info` directory name for a given name/version.
pub fn dist_info_dir_name(name: &str, version: &str) -> String {
    format!("{}-{}.dist-info", normalize_dist_info_name(name), version)
}

/// Find the wheel's single `.dist-info` directory among its entries,
/// returning its directory name (without trailing slash).
pub fn locate_dist_info_dir(entries: &[Entry]) -> Result<String, Error> {
    let mut candidates: Vec<String> = Vec::new();
    for entry in entries {
        if let Some((top, _rest)) = entry.name.split_once('/') {
            if top.ends_with(".dist-info") && top.matches('-').count() >= 1 {
                if !candidates.contains(&top.to_string()) {
                    candidates.push(top.to_string());
                }
            }
        }
    }

    match candidates.len() {
        0 => Err(Error::MalformedWheel("no .dist-info directory found".into())),
        1 => Ok(candidates.remove(0)),
        _ => Err(Error::MalformedWheel(format!(
            "multiple .dist-info directories found: {}",
            candidates.join(", ")
        ))),
    }
}

/// Rewrite every entry whose path starts with `{old_dir}/` to start with
/// `{new_dir}/` instead. No-op if the names are equal.
pub fn rename_dist_info_dir(entries: &mut [Entry], old_dir: &str, new_dir: &str) {
    if old_dir == new_dir {
        return;
    }
    let old_prefix = format!("{old_dir}/");
    let new_prefix = format!("{new_dir}/");
    for entry in entries {
        if let Some(rest) = entry.name.strip_prefix(&old_prefix) {
            entry.name = format!("{new_prefix}{rest}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_hyphen_dot_and_underscore_runs() {
        assert_eq!(normalize_dist_info_name("my-package"), "my_package");
        assert_eq!(normalize_dist_info_name("my.package"), "my_package");
        assert_eq!(normalize_dist_info_name("my--..__package"), "my_package");
        assert_eq!(normalize_dist_info_name("MyPackage"), "MyPackage");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_dist_info_name("My-Cool.Package");
        let twice = normalize_dist_info_name(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn pep503_lowercases_and_uses_hyphen() {
        assert_eq!(normalize_pep503_name("My_Package.Name"), "my-package-name");
    }

    #[test]
    fn locates_single_dist_info_dir() {
        let entries = vec![mk_entry("demo-1.0.dist-info/METADATA"), mk_entry("demo/__init__.py")];
        assert_eq!(locate_dist_info_dir(&entries).unwrap(), "demo-1.0.dist-info");
    }

    #[test]
    fn rejects_multiple_dist_info_dirs() {
        let entries = vec![
            mk_entry("demo-1.0.dist-info/METADATA"),
            mk_entry("other-2.0.dist-info/METADATA"),
        ];
        assert!(locate_dist_info_dir(&entries).is_err());
    }

    fn mk_entry(name: &str) -> Entry {
        Entry {
            name: name.to_string(),
            method: crate::zip::Method::Store,
            uncompressed_size: 0,
            compressed_size: 0,
            crc32: 0,
            flags: 0,
            modified: crate::zip::dostime::MsdosTimestamp::EPOCH,
            extra: Vec::new(),
            payload: crate::zip::Payload::Owned(Vec::new()),
        }
    }
}
