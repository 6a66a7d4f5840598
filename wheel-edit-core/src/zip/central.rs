//! 4.3.12 Central directory structure: file header

use super::dostime::MsdosTimestamp;
use super::extra::{Zip64ExtraField, Zip64FieldPresence};
use winnow::{
    binary::{le_u16, le_u32},
    seq,
    token::{tag, take},
    PResult, Parser, Partial,
};

/// General purpose bit flag bits that indicate some form of encryption.
pub const FLAG_ENCRYPTED: u16 = 0b0000_0000_0000_0001;
/// General purpose bit flag 11: filename/comment are UTF-8.
pub const FLAG_UTF8: u16 = 0b0000_1000_0000_0000;

#[derive(Debug, Clone)]
pub struct CentralDirectoryFileHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: MsdosTimestamp,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub disk_number_start: u16,
    pub internal_attributes: u16,
    pub external_attributes: u32,
    pub header_offset: u32,
    pub name: Vec<u8>,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
}

impl CentralDirectoryFileHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x01\x02";

    pub fn parser(i: &mut Partial<&'_ [u8]>) -> PResult<Self> {
        let _ = tag(Self::SIGNATURE).parse_next(i)?;
        let version_made_by = le_u16.parse_next(i)?;
        let version_needed = le_u16.parse_next(i)?;
        let flags = le_u16.parse_next(i)?;
        let method = le_u16.parse_next(i)?;
        let modified = MsdosTimestamp::parser.parse_next(i)?;
        let crc32 = le_u32.parse_next(i)?;
        let compressed_size = le_u32.parse_next(i)?;
        let uncompressed_size = le_u32.parse_next(i)?;
        let name_len = le_u16.parse_next(i)?;
        let extra_len = le_u16.parse_next(i)?;
        let comment_len = le_u16.parse_next(i)?;
        let disk_number_start = le_u16.parse_next(i)?;
        let internal_attributes = le_u16.parse_next(i)?;
        let external_attributes = le_u32.parse_next(i)?;
        let header_offset = le_u32.parse_next(i)?;
        let name = take(name_len).map(|s: &[u8]| s.to_vec()).parse_next(i)?;
        let extra = take(extra_len).map(|s: &[u8]| s.to_vec()).parse_next(i)?;
        let comment = take(comment_len).map(|s: &[u8]| s.to_vec()).parse_next(i)?;

        Ok(Self {
            version_made_by,
            version_needed,
            flags,
            method,
            modified,
            crc32,
            compressed_size,
            uncompressed_size,
            disk_number_start,
            internal_attributes,
            external_attributes,
            header_offset,
            name,
            extra,
            comment,
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Resolve the true 64-bit sizes/offset, substituting zip64 extra field
    /// values wherever the base 32-bit field was the `0xFFFFFFFF` sentinel.
    pub fn resolved_sizes(&self) -> (u64, u64, u64) {
        let presence = Zip64FieldPresence {
            uncompressed_size: self.uncompressed_size == u32::MAX,
            compressed_size: self.compressed_size == u32::MAX,
            header_offset: self.header_offset == u32::MAX,
            disk_start: self.disk_number_start == u16::MAX,
        };

        if !(presence.uncompressed_size || presence.compressed_size || presence.header_offset) {
            return (
                self.uncompressed_size as u64,
                self.compressed_size as u64,
                self.header_offset as u64,
            );
        }

        match Zip64ExtraField::find_and_parse(&self.extra, presence) {
            Some(z64) => (
                z64.uncompressed_size.unwrap_or(self.uncompressed_size as u64),
                z64.compressed_size.unwrap_or(self.compressed_size as u64),
                z64.header_offset.unwrap_or(self.header_offset as u64),
            ),
            None => (
                self.uncompressed_size as u64,
                self.compressed_size as u64,
                self.header_offset as u64,
            ),
        }
    }
}
