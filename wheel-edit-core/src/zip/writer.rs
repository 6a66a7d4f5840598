//! C2: streams a new archive to a sequential sink, promoting to zip64
//! only where a classic field would overflow.

use super::archive::ZipArchive;
use super::entry::{Entry, Method, Payload};
use super::extra::Zip64ExtraField;
use crate::Error;
use flate2::{write::DeflateEncoder, Compression};
use std::io::Write;

const SENTINEL_32: u32 = u32::MAX;
const SENTINEL_16: u16 = u16::MAX;

struct WrittenRecord {
    name: String,
    method: u16,
    flags: u16,
    modified_time: u16,
    modified_date: u16,
    crc32: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    local_header_offset: u64,
    is_dir: bool,
}

/// Streaming zip writer: one pass over entries, then the central directory.
pub struct ZipWriter<W: Write> {
    sink: W,
    offset: u64,
    records: Vec<WrittenRecord>,
}

impl<W: Write> ZipWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            offset: 0,
            records: Vec::new(),
        }
    }

    /// Write one entry, reading its bytes from `archive` if the entry is a
    /// raw passthrough, or compressing its owned bytes otherwise.
    pub fn write_entry(&mut self, entry: &Entry, archive: &ZipArchive) -> Result<(), Error> {
        let (payload, compressed_size, uncompressed_size, crc32) = match &entry.payload {
            Payload::Raw { .. } => (
                archive.read_raw(entry).to_vec(),
                entry.compressed_size,
                entry.uncompressed_size,
                entry.crc32,
            ),
            Payload::Owned(bytes) => {
                let compressed = Self::compress(bytes, entry.method)?;
                (compressed.clone(), compressed.len() as u64, bytes.len() as u64, entry.crc32)
            }
        };

        let local_header_offset = self.offset;
        let needs_zip64 =
            compressed_size >= SENTINEL_32 as u64 || uncompressed_size >= SENTINEL_32 as u64;

        let name_bytes = entry.name.as_bytes();
        let mut extra = Vec::new();
        if needs_zip64 {
            extra = Zip64ExtraField::build(Some(uncompressed_size), Some(compressed_size), None);
        }

        let mut header = Vec::with_capacity(30 + name_bytes.len() + extra.len());
        header.extend_from_slice(super::local::LocalFileHeaderRecord::SIGNATURE);
        header.extend_from_slice(&(if needs_zip64 { 45u16 } else { 20u16 }).to_le_bytes());
        header.extend_from_slice(&super::central::FLAG_UTF8.to_le_bytes());
        header.extend_from_slice(&entry.method.to_u16().to_le_bytes());
        header.extend_from_slice(&entry.modified.time.to_le_bytes());
        header.extend_from_slice(&entry.modified.date.to_le_bytes());
        header.extend_from_slice(&crc32.to_le_bytes());
        header.extend_from_slice(&(if needs_zip64 { SENTINEL_32 } else { compressed_size as u32 }).to_le_bytes());
        header.extend_from_slice(&(if needs_zip64 { SENTINEL_32 } else { uncompressed_size as u32 }).to_le_bytes());
        header.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        header.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        header.extend_from_slice(name_bytes);
        header.extend_from_slice(&extra);

        self.sink.write_all(&header)?;
        self.sink.write_all(&payload)?;
        self.offset += header.len() as u64 + payload.len() as u64;

        self.records.push(WrittenRecord {
            name: entry.name.clone(),
            method: entry.method.to_u16(),
            flags: super::central::FLAG_UTF8,
            modified_time: entry.modified.time,
            modified_date: entry.modified.date,
            crc32,
            compressed_size,
            uncompressed_size,
            local_header_offset,
            is_dir: entry.is_directory(),
        });

        Ok(())
    }

    fn compress(bytes: &[u8], method: Method) -> Result<Vec<u8>, Error> {
        match method {
            Method::Store => Ok(bytes.to_vec()),
            Method::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(bytes)?;
                Ok(encoder.finish()?)
            }
        }
    }

    /// Write the central directory, EOCD, and (if needed) the zip64
    /// records, then return the underlying sink.
    pub fn finish(mut self) -> Result<W, Error> {
        let dir_offset = self.offset;
        let mut dir_size: u64 = 0;

        for record in &self.records {
            let name_bytes = record.name.as_bytes();
            let needs_zip64 = record.compressed_size >= SENTINEL_32 as u64
                || record.uncompressed_size >= SENTINEL_32 as u64
                || record.local_header_offset >= SENTINEL_32 as u64;

            let extra = if needs_zip64 {
                Zip64ExtraField::build(
                    (record.uncompressed_size >= SENTINEL_32 as u64).then_some(record.uncompressed_size),
                    (record.compressed_size >= SENTINEL_32 as u64).then_some(record.compressed_size),
                    (record.local_header_offset >= SENTINEL_32 as u64).then_some(record.local_header_offset),
                )
            } else {
                Vec::new()
            };

            let external_attributes: u32 = if record.is_dir { 0o040755 << 16 } else { 0o100644 << 16 };

            let mut header =
                Vec::with_capacity(46 + name_bytes.len() + extra.len());
            header.extend_from_slice(super::central::CentralDirectoryFileHeader::SIGNATURE);
            header.extend_from_slice(&((3u16 << 8) | 63).to_le_bytes()); // version made by: unix host, v6.3
            header.extend_from_slice(&(if needs_zip64 { 45u16 } else { 20u16 }).to_le_bytes());
            header.extend_from_slice(&record.flags.to_le_bytes());
            header.extend_from_slice(&record.method.to_le_bytes());
            header.extend_from_slice(&record.modified_time.to_le_bytes());
            header.extend_from_slice(&record.modified_date.to_le_bytes());
            header.extend_from_slice(&record.crc32.to_le_bytes());
            header.extend_from_slice(&(if needs_zip64 && record.compressed_size >= SENTINEL_32 as u64 { SENTINEL_32 } else { record.compressed_size as u32 }).to_le_bytes());
            header.extend_from_slice(&(if needs_zip64 && record.uncompressed_size >= SENTINEL_32 as u64 { SENTINEL_32 } else { record.uncompressed_size as u32 }).to_le_bytes());
            header.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
            header.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            header.extend_from_slice(&0u16.to_le_bytes()); // comment length
            header.extend_from_slice(&0u16.to_le_bytes()); // disk number start
            header.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
            header.extend_from_slice(&external_attributes.to_le_bytes());
            header.extend_from_slice(&(if needs_zip64 && record.local_header_offset >= SENTINEL_32 as u64 { SENTINEL_32 } else { record.local_header_offset as u32 }).to_le_bytes());
            header.extend_from_slice(name_bytes);
            header.extend_from_slice(&extra);

            self.sink.write_all(&header)?;
            dir_size += header.len() as u64;
        }

        let entry_count = self.records.len();
        let needs_zip64_eocd =
            entry_count >= SENTINEL_16 as usize || dir_size >= SENTINEL_32 as u64 || dir_offset >= SENTINEL_32 as u64;

        if needs_zip64_eocd {
            let zip64_eocd_offset = dir_offset + dir_size;
            let mut rec = Vec::with_capacity(56);
            rec.extend_from_slice(super::eocd::EndOfCentralDirectory64Record::SIGNATURE);
            rec.extend_from_slice(&44u64.to_le_bytes()); // size of this record, post-field
            rec.extend_from_slice(&63u16.to_le_bytes()); // version made by
            rec.extend_from_slice(&45u16.to_le_bytes()); // version needed
            rec.extend_from_slice(&0u32.to_le_bytes()); // disk number
            rec.extend_from_slice(&0u32.to_le_bytes()); // disk with central dir
            rec.extend_from_slice(&(entry_count as u64).to_le_bytes());
            rec.extend_from_slice(&(entry_count as u64).to_le_bytes());
            rec.extend_from_slice(&dir_size.to_le_bytes());
            rec.extend_from_slice(&dir_offset.to_le_bytes());
            self.sink.write_all(&rec)?;

            let mut locator = Vec::with_capacity(20);
            locator.extend_from_slice(super::eocd::EndOfCentralDirectory64Locator::SIGNATURE);
            locator.extend_from_slice(&0u32.to_le_bytes());
            locator.extend_from_slice(&zip64_eocd_offset.to_le_bytes());
            locator.extend_from_slice(&1u32.to_le_bytes());
            self.sink.write_all(&locator)?;
        }

        let mut eocd = Vec::with_capacity(22);
        eocd.extend_from_slice(super::eocd::EndOfCentralDirectoryRecord::SIGNATURE);
        eocd.extend_from_slice(&0u16.to_le_bytes());
        eocd.extend_from_slice(&0u16.to_le_bytes());
        eocd.extend_from_slice(&(if needs_zip64_eocd { SENTINEL_16 } else { entry_count as u16 }).to_le_bytes());
        eocd.extend_from_slice(&(if needs_zip64_eocd { SENTINEL_16 } else { entry_count as u16 }).to_le_bytes());
        eocd.extend_from_slice(&(if needs_zip64_eocd { SENTINEL_32 } else { dir_size as u32 }).to_le_bytes());
        eocd.extend_from_slice(&(if needs_zip64_eocd { SENTINEL_32 } else { dir_offset as u32 }).to_le_bytes());
        eocd.extend_from_slice(&0u16.to_le_bytes()); // comment length
        self.sink.write_all(&eocd)?;

        Ok(self.sink)
    }
}
