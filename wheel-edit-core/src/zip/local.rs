//! 4.3.7 Local file header.
//!
//! We only ever read the local header to find where an entry's compressed
//! payload starts (its filename/extra fields can differ in length from the
//! central directory's copy); we never rely on bit 3 (data descriptor
//! follows), since sizes and CRC always come from the central directory.

use super::dostime::MsdosTimestamp;
use winnow::{
    binary::{le_u16, le_u32},
    seq,
    token::{tag, take},
    PResult, Parser, Partial,
};

#[derive(Debug, Clone)]
pub struct LocalFileHeaderRecord {
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: MsdosTimestamp,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: Vec<u8>,
    pub extra: Vec<u8>,
}

impl LocalFileHeaderRecord {
    pub const SIGNATURE: &'static [u8] = b"PK\x03\x04";

    pub fn parser(i: &mut Partial<&'_ [u8]>) -> PResult<Self> {
        let _ = tag(Self::SIGNATURE).parse_next(i)?;
        seq! {Self {
            version_needed: le_u16,
            flags: le_u16,
            method: le_u16,
            modified: MsdosTimestamp::parser,
            crc32: le_u32,
            compressed_size: le_u32,
            uncompressed_size: le_u32,
            name: le_u16.flat_map(take).map(|s: &[u8]| s.to_vec()),
            extra: le_u16.flat_map(take).map(|s: &[u8]| s.to_vec()),
        }}
        .parse_next(i)
    }
}
