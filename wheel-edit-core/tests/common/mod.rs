//! Shared helpers for building scratch wheels in the end-to-end suite.

use wheel_edit_core::zip::dostime::MsdosTimestamp;
use wheel_edit_core::zip::{Entry, Method, Payload, ZipArchive, ZipWriter};

pub fn mk_entry(name: &str, content: &[u8], method: Method) -> Entry {
    let mut e = Entry {
        name: name.to_string(),
        method,
        uncompressed_size: 0,
        compressed_size: 0,
        crc32: 0,
        flags: 0,
        modified: MsdosTimestamp::EPOCH,
        extra: Vec::new(),
        payload: Payload::Owned(Vec::new()),
    };
    e.set_owned(content.to_vec(), method);
    e
}

/// Streams `entries` through a [`ZipWriter`] into an in-memory archive.
/// Every entry must carry `Payload::Owned` content (true of anything built
/// via [`mk_entry`]), since the writer never needs to read from a source
/// archive for those.
pub fn build_wheel(entries: &[Entry]) -> Vec<u8> {
    let dummy = ZipArchive::empty();
    let mut buf = Vec::new();
    let mut writer = ZipWriter::new(&mut buf);
    for e in entries {
        writer.write_entry(e, &dummy).unwrap();
    }
    writer.finish().unwrap();
    buf
}

/// The three required dist-info members for a minimal, well-formed wheel.
pub fn dist_info_members(dir: &str, name: &str, version: &str, tag: &str) -> Vec<Entry> {
    vec![
        mk_entry(
            &format!("{dir}/METADATA"),
            format!("Metadata-Version: 2.1\nName: {name}\nVersion: {version}\n\n").as_bytes(),
            Method::Store,
        ),
        mk_entry(
            &format!("{dir}/WHEEL"),
            format!("Wheel-Version: 1.0\nGenerator: editwheel\nRoot-Is-Purelib: true\nTag: {tag}\n\n").as_bytes(),
            Method::Store,
        ),
        mk_entry(&format!("{dir}/RECORD"), b"", Method::Store),
    ]
}
