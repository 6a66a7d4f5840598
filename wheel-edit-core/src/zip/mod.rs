//! Zip container support: just enough to enumerate members without
//! decompressing them (C1), and to stream a new archive back out with
//! zip64 promotion where needed (C2).

pub mod archive;
pub mod central;
pub mod dostime;
pub mod entry;
pub mod eocd;
pub mod extra;
pub mod local;
pub mod writer;

pub use archive::ZipArchive;
pub use entry::{Entry, Method, Payload};
pub use writer::ZipWriter;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn build_test_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = ZipWriter::new(&mut buf);
        let mut archive_entries = Vec::new();
        for (name, content) in entries {
            let mut e = entry::Entry {
                name: name.to_string(),
                method: Method::Store,
                uncompressed_size: 0,
                compressed_size: 0,
                crc32: 0,
                flags: 0,
                modified: dostime::MsdosTimestamp::EPOCH,
                extra: Vec::new(),
                payload: Payload::Owned(Vec::new()),
            };
            e.set_owned(content.to_vec(), Method::Store);
            archive_entries.push(e);
        }
        let dummy = ZipArchive::empty();
        for e in &archive_entries {
            writer.write_entry(e, &dummy).unwrap();
        }
        let mut out = writer.finish().unwrap();
        out.flush().unwrap();
        buf
    }

    #[test]
    fn round_trip_small_archive() {
        let bytes = build_test_zip(&[("a.txt", b"hello"), ("b.txt", b"world")]);
        let archive = ZipArchive::from_bytes(bytes).expect("should parse");
        assert_eq!(archive.entries.len(), 2);
        assert_eq!(archive.entries[0].name, "a.txt");
        assert_eq!(archive.read_uncompressed(&archive.entries[0]).unwrap(), b"hello");
        assert_eq!(archive.read_uncompressed(&archive.entries[1]).unwrap(), b"world");
    }

    #[test]
    fn rejects_path_traversal() {
        let mut buf = Vec::new();
        {
            let mut writer = ZipWriter::new(&mut buf);
            let mut e = entry::Entry {
                name: "../evil.txt".to_string(),
                method: Method::Store,
                uncompressed_size: 0,
                compressed_size: 0,
                crc32: 0,
                flags: 0,
                modified: dostime::MsdosTimestamp::EPOCH,
                extra: Vec::new(),
                payload: Payload::Owned(Vec::new()),
            };
            e.set_owned(b"x".to_vec(), Method::Store);
            let dummy = ZipArchive::empty();
            writer.write_entry(&e, &dummy).unwrap();
            writer.finish().unwrap();
        }
        let err = ZipArchive::from_bytes(buf).unwrap_err();
        assert!(matches!(err, crate::Error::PathOutsideArchive(_)));
    }
}
