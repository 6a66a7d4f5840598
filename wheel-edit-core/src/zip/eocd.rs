//! End of central directory record, and its ZIP64 companions.

use winnow::{
    binary::{le_u16, le_u32, le_u64},
    seq,
    token::{tag, take},
    PResult, Parser, Partial,
};

/// A value located at a given absolute offset in the archive.
#[derive(Debug, Clone, Copy)]
pub struct Located<T> {
    /// Offset of `inner` in the underlying byte stream.
    pub offset: u64,
    /// The located value.
    pub inner: T,
}

/// 4.3.16 End of central directory record
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectoryRecord {
    pub disk_nbr: u16,
    pub dir_disk_nbr: u16,
    pub dir_records_this_disk: u16,
    pub dir_records: u16,
    pub dir_size: u32,
    pub dir_offset: u32,
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectoryRecord {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    /// Fixed portion, not counting the comment.
    pub const MIN_LENGTH: usize = 22;

    pub fn parser(i: &mut Partial<&'_ [u8]>) -> PResult<Self> {
        let _ = tag(Self::SIGNATURE).parse_next(i)?;
        seq! {Self {
            disk_nbr: le_u16,
            dir_disk_nbr: le_u16,
            dir_records_this_disk: le_u16,
            dir_records: le_u16,
            dir_size: le_u32,
            dir_offset: le_u32,
            comment: le_u16.flat_map(take).map(|s: &[u8]| s.to_vec()),
        }}
        .parse_next(i)
    }

    /// Scan `haystack` backwards for the last occurrence of the EOCD
    /// signature, returning the record and its absolute offset.
    ///
    /// `haystack` must be the entire archive's trailing window (at most
    /// 65557 bytes, the maximum size of an EOCD record plus comment).
    pub fn find_in_block(haystack: &[u8]) -> Option<Located<Self>> {
        for start in (0..=haystack.len().saturating_sub(4)).rev() {
            if haystack[start..].starts_with(Self::SIGNATURE) {
                let mut input = Partial::new(&haystack[start..]);
                if let Ok(inner) = Self::parser(&mut input) {
                    return Some(Located {
                        offset: start as u64,
                        inner,
                    });
                }
            }
        }
        None
    }
}

/// 4.3.15 Zip64 end of central directory locator
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory64Locator {
    pub dir_disk_number: u32,
    pub directory_offset: u64,
    pub total_disks: u32,
}

impl EndOfCentralDirectory64Locator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const LENGTH: u64 = 20;

    pub fn parser(i: &mut Partial<&'_ [u8]>) -> PResult<Self> {
        let _ = tag(Self::SIGNATURE).parse_next(i)?;
        seq! {Self {
            dir_disk_number: le_u32,
            directory_offset: le_u64,
            total_disks: le_u32,
        }}
        .parse_next(i)
    }
}

/// 4.3.14 Zip64 end of central directory record
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory64Record {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_nbr: u32,
    pub dir_disk_nbr: u32,
    pub dir_records_this_disk: u64,
    pub dir_records: u64,
    pub dir_size: u64,
    pub dir_offset: u64,
}

impl EndOfCentralDirectory64Record {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";

    pub fn parser(i: &mut Partial<&'_ [u8]>) -> PResult<Self> {
        let _ = tag(Self::SIGNATURE).parse_next(i)?;
        // record size (8 bytes): length of everything after this field,
        // which we don't need since we parse the fixed fields directly
        // and ignore anything extensible that follows.
        let _record_size = le_u64.parse_next(i)?;
        seq! {Self {
            version_made_by: le_u16,
            version_needed: le_u16,
            disk_nbr: le_u32,
            dir_disk_nbr: le_u32,
            dir_records_this_disk: le_u64,
            dir_records: le_u64,
            dir_size: le_u64,
            dir_offset: le_u64,
        }}
        .parse_next(i)
    }
}

/// The reconciled view over classic + zip64 end-of-central-directory data.
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub dir: Located<EndOfCentralDirectoryRecord>,
    pub dir64: Option<Located<EndOfCentralDirectory64Record>>,
    /// Correction applied to local/central offsets to account for any
    /// prefix bytes (self-extracting stubs) before the archive proper.
    pub global_offset: i64,
}

impl EndOfCentralDirectory {
    pub fn directory_offset(&self) -> u64 {
        match &self.dir64 {
            Some(dir64) => dir64.inner.dir_offset,
            None => self.dir.inner.dir_offset as u64,
        }
    }

    pub fn directory_records(&self) -> u64 {
        match &self.dir64 {
            Some(dir64) => dir64.inner.dir_records,
            None => self.dir.inner.dir_records as u64,
        }
    }

    pub fn new(
        dir: Located<EndOfCentralDirectoryRecord>,
        dir64: Option<Located<EndOfCentralDirectory64Record>>,
        size: u64,
    ) -> Result<Self, crate::Error> {
        // Where the central directory _should_ start, per the EOCD/ZIP64 EOCD.
        let declared_offset = match &dir64 {
            Some(d) => d.inner.dir_offset,
            None => dir.inner.dir_offset as u64,
        };

        // Where it actually starts, judging by where we found the EOCD itself
        // and working backwards by the declared directory size. This lets us
        // tolerate a prefix (e.g. a self-extracting stub) before the archive.
        let dir_record = dir64.as_ref().map(|d| &d.inner);
        let computed_directory_offset = {
            let dir_size = dir_record.map(|d| d.dir_size).unwrap_or(dir.inner.dir_size as u64);
            let eocd_offset = dir64.as_ref().map(|d| d.offset).unwrap_or(dir.offset);
            eocd_offset.saturating_sub(dir_size)
        };

        let global_offset = computed_directory_offset as i64 - declared_offset as i64;

        if global_offset < 0 || computed_directory_offset > size {
            return Err(crate::Error::Zip64Malformed);
        }

        Ok(Self {
            dir,
            dir64,
            global_offset,
        })
    }
}

/// Parses exactly `count` central directory headers (or whatever `parser`
/// produces), since the end-of-central-directory record's declared record
/// count is authoritative.
pub fn repeat_exact<'a, F, O>(
    count: usize,
    parser: F,
) -> impl FnMut(&mut Partial<&'a [u8]>) -> PResult<Vec<O>>
where
    F: FnMut(&mut Partial<&'a [u8]>) -> PResult<O>,
{
    let mut parser = parser;
    move |i| {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(parser.parse_next(i)?);
        }
        Ok(out)
    }
}
