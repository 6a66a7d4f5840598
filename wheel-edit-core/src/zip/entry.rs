//! The in-memory per-member descriptor.

use super::dostime::MsdosTimestamp;

/// Compression method. Only the two methods wheels are allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Store,
    Deflate,
}

impl Method {
    pub fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Method::Store),
            8 => Some(Method::Deflate),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Method::Store => 0,
            Method::Deflate => 8,
        }
    }
}

/// Where an entry's uncompressed bytes come from.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Bytes live in the source archive's buffer, untouched, still
    /// compressed with `method`. `offset`/`len` point at the compressed
    /// payload within the source buffer.
    Raw { offset: u64, len: u64 },

    /// Bytes were produced or mutated during this session: held fully in
    /// memory, uncompressed, to be freshly compressed with `method` on save.
    Owned(Vec<u8>),
}

/// One ZIP archive member, as tracked by the editor.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Forward-slash path, never absolute, never containing `..` segments.
    pub name: String,
    pub method: Method,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub crc32: u32,
    pub flags: u16,
    pub modified: MsdosTimestamp,
    /// Extra field bytes as they appeared in the central directory. Kept
    /// only for entries that are raw-copied; rewritten entries get a fresh,
    /// minimal extra field from the writer.
    pub extra: Vec<u8>,
    pub payload: Payload,
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }

    pub fn is_dirty(&self) -> bool {
        matches!(self.payload, Payload::Owned(_))
    }

    /// Mark this entry dirty with new uncompressed content, to be
    /// (re)compressed with `method` when the archive is saved. Timestamps
    /// are reset to the fixed epoch per the determinism requirement on
    /// rewritten entries.
    pub fn set_owned(&mut self, bytes: Vec<u8>, method: Method) {
        self.crc32 = crc32fast::hash(&bytes);
        self.uncompressed_size = bytes.len() as u64;
        self.method = method;
        self.modified = MsdosTimestamp::EPOCH;
        self.extra.clear();
        self.payload = Payload::Owned(bytes);
    }
}
