//! The zip64 extended information extra field (tag 0x0001).
//!
//! Other extra field tags (timestamps, unix permissions, NTFS attributes)
//! are read past but not interpreted: this crate only cares about the
//! 32-bit-sentinel-to-64-bit-value substitution zip64 performs.

use winnow::{
    binary::{le_u16, le_u32, le_u64},
    combinator::opt,
    seq,
    token::take,
    PResult, Parser, Partial,
};

pub const ZIP64_TAG: u16 = 0x0001;

/// A raw, untyped extra field record: `tag`, then a length-prefixed payload.
#[derive(Debug, Clone)]
pub struct ExtraFieldRecord<'a> {
    pub tag: u16,
    pub payload: &'a [u8],
}

impl<'a> ExtraFieldRecord<'a> {
    pub fn parser(i: &mut Partial<&'a [u8]>) -> PResult<Self> {
        seq! {Self {
            tag: le_u16,
            payload: le_u16.flat_map(take),
        }}
        .parse_next(i)
    }

    pub fn parse_all(mut buf: &'a [u8]) -> Vec<Self> {
        let mut out = Vec::new();
        while buf.len() >= 4 {
            let tag = u16::from_le_bytes([buf[0], buf[1]]);
            let len = u16::from_le_bytes([buf[2], buf[3]]) as usize;
            if buf.len() < 4 + len {
                break;
            }
            out.push(Self {
                tag,
                payload: &buf[4..4 + len],
            });
            buf = &buf[4 + len..];
        }
        out
    }
}

/// Which 32-bit fields in the enclosing header were sentinel values
/// (`0xFFFFFFFF`), and therefore have a corresponding 64-bit field present
/// in the zip64 extra, in this fixed order: uncompressed size, compressed
/// size, local header offset, disk start number.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zip64FieldPresence {
    pub uncompressed_size: bool,
    pub compressed_size: bool,
    pub header_offset: bool,
    pub disk_start: bool,
}

/// The decoded contents of a zip64 extended information extra field,
/// honoring the conditional presence described by `Zip64FieldPresence`.
#[derive(Debug, Clone, Default)]
pub struct Zip64ExtraField {
    pub uncompressed_size: Option<u64>,
    pub compressed_size: Option<u64>,
    pub header_offset: Option<u64>,
    pub disk_start: Option<u32>,
}

impl Zip64ExtraField {
    pub fn parse(payload: &[u8], presence: Zip64FieldPresence) -> PResult<Self> {
        let mut input = Partial::new(payload);
        let i = &mut input;

        let uncompressed_size = if presence.uncompressed_size {
            Some(le_u64.parse_next(i)?)
        } else {
            None
        };
        let compressed_size = if presence.compressed_size {
            Some(le_u64.parse_next(i)?)
        } else {
            None
        };
        let header_offset = if presence.header_offset {
            Some(le_u64.parse_next(i)?)
        } else {
            None
        };
        let disk_start = if presence.disk_start {
            opt(le_u32).parse_next(i)?
        } else {
            None
        };

        Ok(Self {
            uncompressed_size,
            compressed_size,
            header_offset,
            disk_start,
        })
    }

    /// Find and parse the zip64 extra field within a raw extra-fields blob,
    /// given which base fields were sentinels.
    pub fn find_and_parse(
        extra: &[u8],
        presence: Zip64FieldPresence,
    ) -> Option<Self> {
        for record in ExtraFieldRecord::parse_all(extra) {
            if record.tag == ZIP64_TAG {
                return Self::parse(record.payload, presence).ok();
            }
        }
        None
    }

    /// Build the raw bytes of a zip64 extra field record, including the
    /// tag/length header, containing only the fields the caller marks
    /// present, in the canonical order.
    pub fn build(
        uncompressed_size: Option<u64>,
        compressed_size: Option<u64>,
        header_offset: Option<u64>,
    ) -> Vec<u8> {
        let mut payload = Vec::new();
        if let Some(v) = uncompressed_size {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        if let Some(v) = compressed_size {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        if let Some(v) = header_offset {
            payload.extend_from_slice(&v.to_le_bytes());
        }

        let mut out = Vec::with_capacity(4 + payload.len());
        out.extend_from_slice(&ZIP64_TAG.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }
}
