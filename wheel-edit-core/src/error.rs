//! All error types used in this crate.

use std::path::PathBuf;

/// Any error produced while reading, mutating, or writing a wheel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The input does not start with a recognizable end-of-central-directory
    /// record; it is not a zip file at all.
    #[error("not a zip file: end of central directory record not found")]
    NotZip,

    /// The archive is shorter than its own central directory / EOCD claims.
    #[error("truncated zip file: {0}")]
    Truncated(&'static str),

    /// A ZIP64 locator was found but the ZIP64 end-of-central-directory
    /// record it points to is missing or malformed.
    #[error("malformed zip64 end of central directory record")]
    Zip64Malformed,

    /// An entry uses a compression method other than stored (0) or deflate (8).
    #[error("unsupported compression method {0} on entry {1:?}")]
    UnsupportedMethod(u16, String),

    /// An entry's general-purpose flags indicate encryption.
    #[error("unsupported encryption on entry {0:?}")]
    UnsupportedEncryption(String),

    /// The wheel is missing, or has more than one, `dist-info` directory.
    #[error("malformed wheel: {0}")]
    MalformedWheel(String),

    /// `METADATA` could not be parsed.
    #[error("could not parse METADATA: {0}")]
    MetadataParse(String),

    /// `WHEEL` could not be parsed.
    #[error("could not parse WHEEL: {0}")]
    WheelParse(String),

    /// `RECORD` could not be parsed.
    #[error("could not parse RECORD: {0}")]
    RecordParse(#[from] csv::Error),

    /// An ELF shared object could not be parsed.
    #[error("could not parse ELF file {0:?}: {1}")]
    ElfParse(String, String),

    /// A replacement RPATH/RUNPATH string did not fit in the existing
    /// string table slot.
    #[error("rpath too long for in-place rewrite in {0:?}: need {1} bytes, have {2}")]
    RPathTooLong(String, usize, usize),

    /// A caller asked for a metadata field name this crate doesn't know about.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// An archive entry's name is absolute or escapes the archive root.
    #[error("entry path outside archive: {0:?}")]
    PathOutsideArchive(PathBuf),
}

impl Error {
    pub(crate) fn truncated(what: &'static str) -> Self {
        Self::Truncated(what)
    }
}
