//! C3: the `dist-info/RECORD` codec.
//!
//! `RECORD` is a headerless CSV manifest: `path,hash,size` per archive
//! member. `RECORD` itself, and any signature files, carry empty `hash`
//! and `size` columns.

use crate::Error;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One row of `RECORD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRow {
    pub path: String,
    pub hash: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct Record {
    pub rows: Vec<RecordRow>,
}

impl Record {
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .escape(Some(b'"'))
            .flexible(true)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for result in reader.deserialize() {
            let row: RecordRow = result?;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .escape(b'"')
            .from_writer(Vec::new());
        for row in &self.rows {
            writer.serialize(row)?;
        }
        Ok(writer.into_inner().expect("in-memory writer never fails to flush"))
    }

    pub fn row_for(&self, path: &str) -> Option<&RecordRow> {
        self.rows.iter().find(|r| r.path == path)
    }
}

/// SHA-256 of `content`, encoded as `sha256=<urlsafe-base64-no-padding>`,
/// per PEP 376 / the wheel spec's RECORD hash format.
pub fn hash_entry(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    format!("sha256={}", URL_SAFE_NO_PAD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_record_with_empty_self_row() {
        let raw = b"pkg/__init__.py,sha256=abc,12\ndemo-1.0.dist-info/RECORD,,\n";
        let record = Record::parse(raw).unwrap();
        assert_eq!(record.rows.len(), 2);
        assert_eq!(record.rows[0].hash.as_deref(), Some("sha256=abc"));
        assert_eq!(record.rows[1].hash, None);
        assert_eq!(record.rows[1].size, None);
    }

    #[test]
    fn round_trips_to_bytes() {
        let raw = b"pkg/__init__.py,sha256=abc,12\ndemo-1.0.dist-info/RECORD,,\n";
        let record = Record::parse(raw).unwrap();
        assert_eq!(record.to_bytes().unwrap(), raw);
    }

    #[test]
    fn hash_entry_matches_known_vector() {
        // well-known sha256 digest of the empty string, url-safe base64, unpadded
        let hash = hash_entry(b"");
        assert_eq!(hash, "sha256=47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU");
    }
}
