//! C7: in-place `DT_RPATH`/`DT_RUNPATH` rewriting for ELF32/ELF64 shared
//! objects nested in the wheel.
//!
//! There is no crate dependency here (no `goblin`, no `object`): this is a
//! narrow, read-the-dynamic-table-and-patch-one-string operation, not a
//! general ELF loader, so it is hand-rolled in the same explicit
//! struct-per-record, little-endian-only style the rest of this crate's
//! binary parsing uses.

use crate::Error;

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";
const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;

const PT_LOAD: u32 = 1;
const PT_DYNAMIC: u32 = 2;

const DT_NULL: u64 = 0;
const DT_STRTAB: u64 = 5;
const DT_STRSZ: u64 = 10;
const DT_RPATH: u64 = 15;
const DT_RUNPATH: u64 = 29;

pub fn is_elf(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[0..4] == ELF_MAGIC
}

#[derive(Clone, Copy)]
struct Segment {
    p_type: u32,
    p_offset: u64,
    p_vaddr: u64,
    p_filesz: u64,
}

struct ElfLayout {
    is_64: bool,
    segments: Vec<Segment>,
}

impl ElfLayout {
    fn parse(bytes: &[u8], label: &str) -> Result<Self, Error> {
        if !is_elf(bytes) {
            return Err(Error::ElfParse(label.to_string(), "missing ELF magic".into()));
        }
        let err = |msg: &str| Error::ElfParse(label.to_string(), msg.to_string());

        let class = *bytes.get(4).ok_or_else(|| err("truncated e_ident"))?;
        let data = *bytes.get(5).ok_or_else(|| err("truncated e_ident"))?;
        if data != ELFDATA2LSB {
            return Err(err("only little-endian ELF files are supported"));
        }

        let is_64 = match class {
            ELFCLASS32 => false,
            ELFCLASS64 => true,
            other => return Err(err(&format!("unknown ELF class {other}"))),
        };

        let (phoff, phentsize, phnum) = if is_64 {
            (
                read_u64(bytes, 0x20).ok_or_else(|| err("truncated header"))?,
                read_u16(bytes, 0x36).ok_or_else(|| err("truncated header"))?,
                read_u16(bytes, 0x38).ok_or_else(|| err("truncated header"))?,
            )
        } else {
            (
                read_u32(bytes, 0x1c).ok_or_else(|| err("truncated header"))? as u64,
                read_u16(bytes, 0x2a).ok_or_else(|| err("truncated header"))?,
                read_u16(bytes, 0x2c).ok_or_else(|| err("truncated header"))?,
            )
        };

        let mut segments = Vec::with_capacity(phnum as usize);
        for i in 0..phnum as u64 {
            let base = phoff + i * phentsize as u64;
            let seg = if is_64 {
                Segment {
                    p_type: read_u32(bytes, base as usize).ok_or_else(|| err("truncated program header"))?,
                    p_offset: read_u64(bytes, base as usize + 8).ok_or_else(|| err("truncated program header"))?,
                    p_vaddr: read_u64(bytes, base as usize + 16).ok_or_else(|| err("truncated program header"))?,
                    p_filesz: read_u64(bytes, base as usize + 32).ok_or_else(|| err("truncated program header"))?,
                }
            } else {
                Segment {
                    p_type: read_u32(bytes, base as usize).ok_or_else(|| err("truncated program header"))?,
                    p_offset: read_u32(bytes, base as usize + 4).ok_or_else(|| err("truncated program header"))? as u64,
                    p_vaddr: read_u32(bytes, base as usize + 8).ok_or_else(|| err("truncated program header"))? as u64,
                    p_filesz: read_u32(bytes, base as usize + 16).ok_or_else(|| err("truncated program header"))? as u64,
                }
            };
            segments.push(seg);
        }

        Ok(Self { is_64, segments })
    }

    fn dynamic_segment(&self) -> Option<&Segment> {
        self.segments.iter().find(|s| s.p_type == PT_DYNAMIC)
    }

    fn vaddr_to_offset(&self, vaddr: u64) -> Option<u64> {
        self.segments
            .iter()
            .find(|s| s.p_type == PT_LOAD && vaddr >= s.p_vaddr && vaddr < s.p_vaddr + s.p_filesz)
            .map(|s| s.p_offset + (vaddr - s.p_vaddr))
    }

    fn dyn_entry_size(&self) -> u64 {
        if self.is_64 {
            16
        } else {
            8
        }
    }

    fn read_dyn_entry(&self, bytes: &[u8], offset: u64) -> Option<(u64, u64)> {
        if self.is_64 {
            Some((
                read_u64(bytes, offset as usize)?,
                read_u64(bytes, offset as usize + 8)?,
            ))
        } else {
            Some((
                read_u32(bytes, offset as usize)? as u64,
                read_u32(bytes, offset as usize + 4)? as u64,
            ))
        }
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    bytes.get(offset..offset + 2).map(|s| u16::from_le_bytes(s.try_into().unwrap()))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes.get(offset..offset + 4).map(|s| u32::from_le_bytes(s.try_into().unwrap()))
}

fn read_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    bytes.get(offset..offset + 8).map(|s| u64::from_le_bytes(s.try_into().unwrap()))
}

/// Rewrite `DT_RPATH`/`DT_RUNPATH` in an ELF32/64 shared object to
/// `new_rpath`, in place, if the existing string (including its NUL
/// terminator) is long enough to hold it. Returns whether any entry was
/// found and rewritten.
pub fn patch_rpath(bytes: &mut [u8], new_rpath: &str, label: &str) -> Result<bool, Error> {
    let layout = ElfLayout::parse(bytes, label)?;
    let err = |msg: String| Error::ElfParse(label.to_string(), msg);

    let dynamic = match layout.dynamic_segment() {
        Some(seg) => *seg,
        None => return Ok(false),
    };

    let mut strtab_vaddr = None;
    let mut strsz = None;
    let mut rpath_offsets: Vec<u64> = Vec::new();

    let entry_size = layout.dyn_entry_size();
    let mut offset = dynamic.p_offset;
    let dynamic_end = dynamic.p_offset + dynamic.p_filesz;
    while offset + entry_size <= dynamic_end {
        let (tag, val) = layout
            .read_dyn_entry(bytes, offset)
            .ok_or_else(|| err("truncated dynamic entry".into()))?;
        match tag {
            DT_NULL => break,
            DT_STRTAB => strtab_vaddr = Some(val),
            DT_STRSZ => strsz = Some(val),
            DT_RPATH | DT_RUNPATH => rpath_offsets.push(val),
            _ => {}
        }
        offset += entry_size;
    }

    if rpath_offsets.is_empty() {
        return Ok(false);
    }

    let strtab_vaddr = strtab_vaddr.ok_or_else(|| err("DT_STRTAB missing".into()))?;
    let strsz = strsz.ok_or_else(|| err("DT_STRSZ missing".into()))?;
    let strtab_file_offset = layout
        .vaddr_to_offset(strtab_vaddr)
        .ok_or_else(|| err("DT_STRTAB address not mapped by any PT_LOAD segment".into()))?;

    let new_bytes = new_rpath.as_bytes();
    for string_offset in rpath_offsets {
        let abs_offset = strtab_file_offset + string_offset;
        if abs_offset >= strtab_file_offset + strsz {
            return Err(err("DT_RPATH/DT_RUNPATH offset outside string table".into()));
        }
        let slot_start = abs_offset as usize;
        let max_len = (strtab_file_offset + strsz - abs_offset) as usize;
        let existing_len = bytes[slot_start..slot_start + max_len]
            .iter()
            .position(|&b| b == 0)
            .map(|p| p + 1) // include the NUL terminator
            .unwrap_or(max_len);

        if new_bytes.len() + 1 > existing_len {
            return Err(Error::RPathTooLong(label.to_string(), new_bytes.len() + 1, existing_len));
        }

        bytes[slot_start..slot_start + new_bytes.len()].copy_from_slice(new_bytes);
        for b in &mut bytes[slot_start + new_bytes.len()..slot_start + existing_len] {
            *b = 0;
        }
    }

    Ok(true)
}
