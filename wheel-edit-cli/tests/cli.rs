//! Exercises the compiled `editwheel` binary end to end.

use assert_cmd::Command;
use predicates::prelude::*;
use wheel_edit_core::zip::dostime::MsdosTimestamp;
use wheel_edit_core::zip::{Entry, Method, Payload, ZipArchive, ZipWriter};

fn mk_entry(name: &str, content: &[u8]) -> Entry {
    let mut e = Entry {
        name: name.to_string(),
        method: Method::Store,
        uncompressed_size: 0,
        compressed_size: 0,
        crc32: 0,
        flags: 0,
        modified: MsdosTimestamp::EPOCH,
        extra: Vec::new(),
        payload: Payload::Owned(Vec::new()),
    };
    e.set_owned(content.to_vec(), Method::Store);
    e
}

fn build_wheel(entries: &[Entry]) -> Vec<u8> {
    let dummy = ZipArchive::empty();
    let mut buf = Vec::new();
    let mut writer = ZipWriter::new(&mut buf);
    for e in entries {
        writer.write_entry(e, &dummy).unwrap();
    }
    writer.finish().unwrap();
    buf
}

fn minimal_wheel() -> Vec<u8> {
    build_wheel(&[
        mk_entry("demo/__init__.py", b"print('hi')\n"),
        mk_entry(
            "demo-1.0.dist-info/METADATA",
            b"Metadata-Version: 2.1\nName: demo\nVersion: 1.0\nSummary: a demo\nRequires-Dist: requests>=2.20.0\n\n",
        ),
        mk_entry(
            "demo-1.0.dist-info/WHEEL",
            b"Wheel-Version: 1.0\nGenerator: editwheel\nRoot-Is-Purelib: true\nTag: py3-none-any\n\n",
        ),
        mk_entry("demo-1.0.dist-info/RECORD", b""),
    ])
}

fn write_wheel(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn show_json_reports_parsed_fields() {
    let dir = tempfile::tempdir().unwrap();
    let wheel = write_wheel(&dir, "demo-1.0-py3-none-any.whl", &minimal_wheel());

    Command::cargo_bin("editwheel")
        .unwrap()
        .args(["show", "--json"])
        .arg(&wheel)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"demo\""))
        .stdout(predicate::str::contains("\"summary\": \"a demo\""));
}

#[test]
fn show_field_filters_to_requested_fields_only() {
    let dir = tempfile::tempdir().unwrap();
    let wheel = write_wheel(&dir, "demo-1.0-py3-none-any.whl", &minimal_wheel());

    Command::cargo_bin("editwheel")
        .unwrap()
        .args(["show", "--json", "--field", "name"])
        .arg(&wheel)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"demo\""))
        .stdout(predicate::str::contains("summary").not());
}

#[test]
fn show_field_accepts_hyphenated_spelling() {
    let dir = tempfile::tempdir().unwrap();
    let wheel = write_wheel(&dir, "demo-1.0-py3-none-any.whl", &minimal_wheel());

    Command::cargo_bin("editwheel")
        .unwrap()
        .args(["show", "--json", "--field", "author-email"])
        .arg(&wheel)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"author_email\""));
}

#[test]
fn show_field_with_unknown_field_fails() {
    let dir = tempfile::tempdir().unwrap();
    let wheel = write_wheel(&dir, "demo-1.0-py3-none-any.whl", &minimal_wheel());

    Command::cargo_bin("editwheel")
        .unwrap()
        .args(["show", "--field", "not-a-real-field"])
        .arg(&wheel)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field"));
}

#[test]
fn edit_set_rpath_rewrites_matching_elf_member_and_saves_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let so_bytes = build_minimal_so_with_runpath("/old/long/path\0\0");
    let wheel_bytes = build_wheel(&[
        mk_entry("demo/lib/native.so", &so_bytes),
        mk_entry(
            "demo-1.0.dist-info/METADATA",
            b"Metadata-Version: 2.1\nName: demo\nVersion: 1.0\n\n",
        ),
        mk_entry(
            "demo-1.0.dist-info/WHEEL",
            b"Wheel-Version: 1.0\nGenerator: editwheel\nRoot-Is-Purelib: true\nTag: py3-none-any\n\n",
        ),
        mk_entry("demo-1.0.dist-info/RECORD", b""),
    ]);
    let wheel = write_wheel(&dir, "demo-1.0-py3-none-any.whl", &wheel_bytes);

    Command::cargo_bin("editwheel")
        .unwrap()
        .args(["edit", "--set-rpath", "*.so", "$ORIGIN"])
        .arg(&wheel)
        .assert()
        .success()
        .stdout(predicate::str::contains("Set RPATH on 1 file(s)"));

    let saved = std::fs::read(&wheel).unwrap();
    let archive = ZipArchive::from_bytes(saved).unwrap();
    let entry = archive.entries.iter().find(|e| e.name == "demo/lib/native.so").unwrap();
    let patched = archive.read_uncompressed(entry).unwrap();
    assert!(runpath_string(&patched).starts_with("$ORIGIN"));
}

#[test]
fn edit_with_no_flags_fails_with_helpful_message() {
    let dir = tempfile::tempdir().unwrap();
    let wheel = write_wheel(&dir, "demo-1.0-py3-none-any.whl", &minimal_wheel());

    Command::cargo_bin("editwheel")
        .unwrap()
        .args(["edit"])
        .arg(&wheel)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No changes specified"));
}

/// A minimal little-endian ELF64 shared object: one `PT_LOAD` segment
/// covering the whole (identity-mapped) file, one `PT_DYNAMIC` segment
/// whose string table holds `runpath` as its `DT_RUNPATH` entry. Duplicated
/// from `wheel-edit-core`'s own end-to-end suite, since this crate has no
/// test-only dependency on that code.
fn build_minimal_so_with_runpath(runpath: &str) -> Vec<u8> {
    let mut buf = vec![0u8; 0x40];
    buf[0..4].copy_from_slice(b"\x7fELF");
    buf[4] = 2; // ELFCLASS64
    buf[5] = 1; // ELFDATA2LSB
    buf[6] = 1;

    let phoff = buf.len() as u64;
    buf[0x20..0x28].copy_from_slice(&phoff.to_le_bytes());
    buf[0x36..0x38].copy_from_slice(&56u16.to_le_bytes());
    buf[0x38..0x3a].copy_from_slice(&2u16.to_le_bytes());
    buf.resize(buf.len() + 2 * 56, 0);

    let mut strtab = vec![0u8];
    let runpath_off = strtab.len() as u64;
    strtab.extend_from_slice(runpath.as_bytes());
    strtab.push(0);

    let strtab_file_offset = buf.len() as u64;
    buf.extend_from_slice(&strtab);

    let dyn_offset = buf.len() as u64;
    let mut push_dyn = |buf: &mut Vec<u8>, tag: u64, val: u64| {
        buf.extend_from_slice(&tag.to_le_bytes());
        buf.extend_from_slice(&val.to_le_bytes());
    };
    push_dyn(&mut buf, 5, strtab_file_offset); // DT_STRTAB
    push_dyn(&mut buf, 10, strtab.len() as u64); // DT_STRSZ
    push_dyn(&mut buf, 29, runpath_off); // DT_RUNPATH
    push_dyn(&mut buf, 0, 0); // DT_NULL
    let dyn_filesz = buf.len() as u64 - dyn_offset;

    let file_len = buf.len() as u64;
    write_phdr64(&mut buf, phoff as usize, 1, 0, 0, file_len); // PT_LOAD
    write_phdr64(&mut buf, phoff as usize + 56, 2, dyn_offset, dyn_offset, dyn_filesz); // PT_DYNAMIC

    buf
}

fn write_phdr64(buf: &mut [u8], at: usize, p_type: u32, p_offset: u64, p_vaddr: u64, p_filesz: u64) {
    buf[at..at + 4].copy_from_slice(&p_type.to_le_bytes());
    buf[at + 8..at + 16].copy_from_slice(&p_offset.to_le_bytes());
    buf[at + 16..at + 24].copy_from_slice(&p_vaddr.to_le_bytes());
    buf[at + 32..at + 40].copy_from_slice(&p_filesz.to_le_bytes());
}

fn runpath_string(so: &[u8]) -> String {
    let phoff = u64::from_le_bytes(so[0x20..0x28].try_into().unwrap());
    let dyn_base = phoff as usize + 56;
    let dyn_offset = u64::from_le_bytes(so[dyn_base + 8..dyn_base + 16].try_into().unwrap());

    let mut offset = dyn_offset as usize;
    let mut strtab_offset = None;
    let mut runpath_offset = None;
    loop {
        let tag = u64::from_le_bytes(so[offset..offset + 8].try_into().unwrap());
        let val = u64::from_le_bytes(so[offset + 8..offset + 16].try_into().unwrap());
        match tag {
            0 => break,
            5 => strtab_offset = Some(val),
            29 => runpath_offset = Some(val),
            _ => {}
        }
        offset += 16;
    }

    let strtab_offset = strtab_offset.unwrap() as usize;
    let runpath_offset = runpath_offset.unwrap() as usize;
    let start = strtab_offset + runpath_offset;
    let end = so[start..].iter().position(|&b| b == 0).map(|p| start + p).unwrap();
    String::from_utf8(so[start..end].to_vec()).unwrap()
}
