#![warn(missing_docs)]

//! `wheel-edit-core` edits Python wheel files in near-constant time: every
//! archive member the caller doesn't touch is copied as raw, still-compressed
//! bytes; only the small set of members that actually changed — `METADATA`,
//! `WHEEL`, `RECORD`, and any ELF shared objects with a rewritten
//! `RPATH`/`RUNPATH` — are decompressed, mutated, and recompressed.
//!
//! [`zip`] is a small sans-io zip reader/writer; [`editor::WheelEditor`] is
//! the orchestrating façade most callers want.

pub mod dist_info;
pub mod editor;
pub mod elf;
mod error;
pub mod metadata;
pub mod record;
pub mod wheel_info;
pub mod zip;

pub use editor::WheelEditor;
pub use error::Error;
