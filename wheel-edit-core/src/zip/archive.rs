//! C1: parses a zip archive's central directory without decompressing
//! any entry payload.

use super::central::CentralDirectoryFileHeader;
use super::eocd::{
    repeat_exact, EndOfCentralDirectory, EndOfCentralDirectory64Locator,
    EndOfCentralDirectory64Record, EndOfCentralDirectoryRecord, Located,
};
use super::entry::{Entry, Method, Payload};
use crate::Error;
use std::io::Read;
use std::path::Path;
use winnow::Partial;

/// Maximum size of the EOCD record plus its comment (u16::MAX comment
/// length plus the 22-byte fixed part).
const MAX_EOCD_WINDOW: usize = 22 + u16::MAX as usize;

/// A parsed zip archive: the whole source buffer, plus an entry per
/// central directory record.
pub struct ZipArchive {
    pub(crate) source: Vec<u8>,
    pub entries: Vec<Entry>,
}

impl ZipArchive {
    /// An archive with no source bytes and no entries. Useful as the
    /// `archive` argument to [`super::writer::ZipWriter::write_entry`] when
    /// every entry being written is `Payload::Owned` (never reads from the
    /// archive), such as when building a brand new archive from scratch.
    pub fn empty() -> Self {
        Self {
            source: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(source: Vec<u8>) -> Result<Self, Error> {
        let size = source.len() as u64;
        let window_start = source.len().saturating_sub(MAX_EOCD_WINDOW);
        let located_eocd = EndOfCentralDirectoryRecord::find_in_block(&source[window_start..])
            .map(|mut l| {
                l.offset += window_start as u64;
                l
            })
            .ok_or(Error::NotZip)?;

        let dir64 = Self::find_zip64(&source, &located_eocd)?;
        let eocd = EndOfCentralDirectory::new(located_eocd, dir64, size)?;

        let dir_offset = (eocd.directory_offset() as i64 + eocd.global_offset) as u64;
        if dir_offset > size {
            return Err(Error::truncated("central directory offset past end of file"));
        }

        let dir_records = eocd.directory_records();
        let dir_bytes = &source[dir_offset as usize..];
        let mut input = Partial::new(dir_bytes);
        let headers: Vec<CentralDirectoryFileHeader> = repeat_exact(
            dir_records as usize,
            CentralDirectoryFileHeader::parser,
        )
        .parse_next(&mut input)
        .map_err(|_| Error::truncated("central directory"))?;

        let mut entries = Vec::with_capacity(headers.len());
        for header in headers {
            entries.push(Self::entry_from_header(&source, &header, eocd.global_offset)?);
        }

        tracing::debug!(count = entries.len(), "parsed central directory");

        Ok(Self { source, entries })
    }

    fn find_zip64(
        source: &[u8],
        dir: &Located<EndOfCentralDirectoryRecord>,
    ) -> Result<Option<Located<EndOfCentralDirectory64Record>>, Error> {
        let needs_zip64 = dir.inner.dir_records == u16::MAX
            || dir.inner.dir_size == u32::MAX
            || dir.inner.dir_offset == u32::MAX;
        if !needs_zip64 {
            return Ok(None);
        }

        let locator_len = EndOfCentralDirectory64Locator::LENGTH;
        if dir.offset < locator_len {
            return Err(Error::Zip64Malformed);
        }
        let locator_offset = dir.offset - locator_len;
        let mut input = Partial::new(&source[locator_offset as usize..]);
        let locator = EndOfCentralDirectory64Locator::parser(&mut input)
            .map_err(|_| Error::Zip64Malformed)?;

        let record_offset = locator.directory_offset;
        if record_offset >= source.len() as u64 {
            return Err(Error::Zip64Malformed);
        }
        let mut input = Partial::new(&source[record_offset as usize..]);
        let record = EndOfCentralDirectory64Record::parser(&mut input)
            .map_err(|_| Error::Zip64Malformed)?;

        Ok(Some(Located {
            offset: record_offset,
            inner: record,
        }))
    }

    fn entry_from_header(
        source: &[u8],
        header: &CentralDirectoryFileHeader,
        global_offset: i64,
    ) -> Result<Entry, Error> {
        let name = String::from_utf8(header.name.clone())
            .map_err(|_| Error::MalformedWheel("entry name is not valid UTF-8".into()))?;

        let clean = name.replace('\\', "/");
        if clean.starts_with('/') || clean.split('/').any(|part| part == "..") {
            return Err(Error::PathOutsideArchive(clean.into()));
        }

        if header.is_encrypted() {
            return Err(Error::UnsupportedEncryption(clean));
        }

        let method = Method::from_u16(header.method)
            .ok_or_else(|| Error::UnsupportedMethod(header.method, clean.clone()))?;

        let (uncompressed_size, compressed_size, header_offset) = header.resolved_sizes();
        let local_header_offset = (header_offset as i64 + global_offset) as u64;

        let data_offset = Self::local_data_offset(source, local_header_offset)?;
        if data_offset + compressed_size > source.len() as u64 {
            return Err(Error::truncated("entry payload past end of file"));
        }

        Ok(Entry {
            name: clean,
            method,
            uncompressed_size,
            compressed_size,
            crc32: header.crc32,
            flags: header.flags,
            modified: header.modified,
            extra: header.extra.clone(),
            payload: Payload::Raw {
                offset: data_offset,
                len: compressed_size,
            },
        })
    }

    /// Local headers can carry filename/extra fields of a different length
    /// than the central copy (seen in the wild across packaging tools), so
    /// the payload offset must be computed by actually reading the local
    /// header's own length-prefixed fields rather than trusting the
    /// central directory's.
    ///
    /// Fixed portion of a local file header (4.3.7), signature through
    /// extra field length, is exactly 30 bytes.
    const LOCAL_HEADER_FIXED_LEN: u64 = 30;

    fn local_data_offset(source: &[u8], local_header_offset: u64) -> Result<u64, Error> {
        let start = local_header_offset as usize;
        if start > source.len() {
            return Err(Error::truncated("local header offset past end of file"));
        }
        let mut input = Partial::new(&source[start..]);
        let header = super::local::LocalFileHeaderRecord::parser(&mut input)
            .map_err(|_| Error::truncated("truncated local file header"))?;
        let consumed = Self::LOCAL_HEADER_FIXED_LEN + header.name.len() as u64 + header.extra.len() as u64;
        Ok(local_header_offset + consumed)
    }

    /// Read and, if necessary, decompress an entry's content.
    pub fn read_uncompressed(&self, entry: &Entry) -> Result<Vec<u8>, Error> {
        match &entry.payload {
            Payload::Owned(bytes) => Ok(bytes.clone()),
            Payload::Raw { offset, len } => {
                let compressed = &self.source[*offset as usize..(*offset + *len) as usize];
                match entry.method {
                    Method::Store => Ok(compressed.to_vec()),
                    Method::Deflate => {
                        let mut decoder = flate2::read::DeflateDecoder::new(compressed);
                        let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                        decoder.read_to_end(&mut out)?;
                        Ok(out)
                    }
                }
            }
        }
    }

    /// Read an entry's compressed bytes verbatim, for raw passthrough
    /// copies. Only valid for `Payload::Raw` entries.
    pub fn read_raw(&self, entry: &Entry) -> &[u8] {
        match &entry.payload {
            Payload::Raw { offset, len } => {
                &self.source[*offset as usize..(*offset + *len) as usize]
            }
            Payload::Owned(_) => unreachable!("read_raw called on an owned entry"),
        }
    }
}
