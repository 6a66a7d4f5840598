//! C8: orchestrates load -> mutate -> save for a single wheel.

use crate::dist_info::{self, normalize_pep503_name};
use crate::elf;
use crate::metadata::Metadata;
use crate::record::{hash_entry, Record, RecordRow};
use crate::wheel_info::WheelInfo;
use crate::zip::{ZipArchive, ZipWriter};
use crate::Error;
use std::io::Write as _;
use std::path::{Path, PathBuf};

const METADATA_NAME: &str = "METADATA";
const WHEEL_NAME: &str = "WHEEL";
const RECORD_NAME: &str = "RECORD";

/// An in-memory view over one wheel: source entries, decoded dist-info
/// members, and the pending edits that `save` will apply.
pub struct WheelEditor {
    source_path: Option<PathBuf>,
    archive: ZipArchive,
    metadata: Metadata,
    wheel_info: WheelInfo,
    dist_info_dir: String,
}

impl WheelEditor {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let archive = ZipArchive::open(path)?;
        let mut editor = Self::from_archive(archive)?;
        editor.source_path = Some(path.to_path_buf());
        Ok(editor)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        Self::from_archive(ZipArchive::from_bytes(bytes)?)
    }

    fn from_archive(archive: ZipArchive) -> Result<Self, Error> {
        let dist_info_dir = dist_info::locate_dist_info_dir(&archive.entries)?;
        let metadata = Metadata::parse(&Self::read_member(&archive, &dist_info_dir, METADATA_NAME)?)?;
        let wheel_info = WheelInfo::parse(&Self::read_member(&archive, &dist_info_dir, WHEEL_NAME)?)?;
        Ok(Self {
            source_path: None,
            archive,
            metadata,
            wheel_info,
            dist_info_dir,
        })
    }

    fn read_member(archive: &ZipArchive, dist_info_dir: &str, name: &str) -> Result<Vec<u8>, Error> {
        let path = format!("{dist_info_dir}/{name}");
        let entry = archive
            .entries
            .iter()
            .find(|e| e.name == path)
            .ok_or_else(|| Error::MalformedWheel(format!("missing {path}")))?;
        archive.read_uncompressed(entry)
    }

    // --- metadata accessors (§6) ---

    pub fn name(&self) -> Option<&str> {
        self.metadata.get_first("Name")
    }

    pub fn version(&self) -> Option<&str> {
        self.metadata.get_first("Version")
    }

    pub fn summary(&self) -> Option<&str> {
        self.metadata.get_first("Summary")
    }

    pub fn author(&self) -> Option<&str> {
        self.metadata.get_first("Author")
    }

    pub fn author_email(&self) -> Option<&str> {
        self.metadata.get_first("Author-email")
    }

    pub fn license(&self) -> Option<&str> {
        self.metadata.get_first("License")
    }

    pub fn requires_python(&self) -> Option<&str> {
        self.metadata.get_first("Requires-Python")
    }

    pub fn description_content_type(&self) -> Option<&str> {
        self.metadata.get_first("Description-Content-Type")
    }

    pub fn classifiers(&self) -> Vec<&str> {
        self.metadata.get_all("Classifier")
    }

    pub fn requires_dist(&self) -> Vec<&str> {
        self.metadata.get_all("Requires-Dist")
    }

    pub fn project_urls(&self) -> Vec<(String, String)> {
        self.metadata.project_urls()
    }

    pub fn python_tag(&self) -> Option<&str> {
        self.wheel_info.python_tags().into_iter().next()
    }

    pub fn abi_tag(&self) -> Option<&str> {
        self.wheel_info.abi_tags().into_iter().next()
    }

    pub fn platform_tag(&self) -> Option<&str> {
        self.wheel_info.platform_tags().into_iter().next()
    }

    /// `<name>-<version>-<tags>.whl`, with `name` PEP-503-normalized.
    pub fn filename(&self) -> String {
        let name = normalize_pep503_name(self.name().unwrap_or_default());
        let version = self.version().unwrap_or_default();
        format!("{name}-{version}-{}.whl", self.wheel_info.filename_tag_component())
    }

    // --- setters (§6) ---

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.metadata.set_single("Name", value.into());
        self.resync_dist_info_dir();
    }

    pub fn set_version(&mut self, value: impl Into<String>) {
        self.metadata.set_single("Version", value.into());
        self.resync_dist_info_dir();
    }

    fn resync_dist_info_dir(&mut self) {
        let name = self.name().unwrap_or_default().to_string();
        let version = self.version().unwrap_or_default().to_string();
        let new_dir = dist_info::dist_info_dir_name(&name, &version);
        if new_dir != self.dist_info_dir {
            dist_info::rename_dist_info_dir(&mut self.archive.entries, &self.dist_info_dir, &new_dir);
            self.dist_info_dir = new_dir;
        }
    }

    pub fn set_summary(&mut self, value: impl Into<String>) {
        self.metadata.set_single("Summary", value.into());
    }

    pub fn set_author(&mut self, value: impl Into<String>) {
        self.metadata.set_single("Author", value.into());
    }

    pub fn set_author_email(&mut self, value: impl Into<String>) {
        self.metadata.set_single("Author-email", value.into());
    }

    pub fn set_license(&mut self, value: impl Into<String>) {
        self.metadata.set_single("License", value.into());
    }

    pub fn set_requires_python(&mut self, value: impl Into<String>) {
        self.metadata.set_single("Requires-Python", value.into());
    }

    pub fn add_classifier(&mut self, value: impl Into<String>) {
        self.metadata.append_multi("Classifier", value.into());
    }

    pub fn set_classifiers(&mut self, values: impl IntoIterator<Item = String>) {
        self.metadata.set_multi("Classifier", values);
    }

    pub fn add_requires_dist(&mut self, value: impl Into<String>) {
        self.metadata.append_multi("Requires-Dist", value.into());
    }

    pub fn set_requires_dist(&mut self, values: impl IntoIterator<Item = String>) {
        self.metadata.set_multi("Requires-Dist", values);
    }

    pub fn set_project_urls(&mut self, urls: impl IntoIterator<Item = (String, String)>) {
        self.metadata.set_project_urls(urls);
    }

    pub fn set_python_tag(&mut self, value: impl Into<String>) {
        self.wheel_info.set_python_tag(value);
    }

    pub fn set_abi_tag(&mut self, value: impl Into<String>) {
        self.wheel_info.set_abi_tag(value);
    }

    pub fn set_platform_tag(&mut self, value: impl Into<String>) {
        self.wheel_info.set_platform_tag(value);
    }

    /// Generic accessor honoring multi-valued metadata keys.
    pub fn get_metadata(&self, name: &str) -> Vec<&str> {
        self.metadata.get_all(name)
    }

    /// Generic setter: replaces every existing row for `name` with `values`.
    pub fn set_metadata(&mut self, name: &str, values: impl IntoIterator<Item = String>) {
        self.metadata.set_multi(name, values);
        if name.eq_ignore_ascii_case("Name") || name.eq_ignore_ascii_case("Version") {
            self.resync_dist_info_dir();
        }
    }

    /// Rewrite `DT_RPATH`/`DT_RUNPATH` in every ELF member matching `glob`.
    /// Returns the count of members actually rewritten.
    pub fn set_rpath(&mut self, glob: &str, rpath: &str) -> Result<usize, Error> {
        let matcher = globset::GlobBuilder::new(glob)
            .literal_separator(false)
            .build()
            .map_err(|e| Error::MalformedWheel(format!("invalid glob {glob:?}: {e}")))?
            .compile_matcher();

        let matching: Vec<String> = self
            .archive
            .entries
            .iter()
            .filter(|e| matcher.is_match(&e.name))
            .map(|e| e.name.clone())
            .collect();

        let mut count = 0;
        for name in matching {
            let idx = self.archive.entries.iter().position(|e| e.name == name).expect("just listed");
            let mut bytes = self.archive.read_uncompressed(&self.archive.entries[idx])?;
            if !elf::is_elf(&bytes) {
                continue;
            }
            if elf::patch_rpath(&mut bytes, rpath, &name)? {
                let method = self.archive.entries[idx].method;
                self.archive.entries[idx].set_owned(bytes, method);
                count += 1;
                tracing::debug!(entry = %name, "rewrote rpath");
            }
        }
        Ok(count)
    }

    /// Re-encodes METADATA/WHEEL, rebuilds RECORD, and streams the
    /// resulting archive to `path` (or, if omitted, back to the source
    /// path this editor was opened from), via a sibling temporary file
    /// renamed atomically into place on success.
    pub fn save(&mut self, path: Option<&Path>) -> Result<(), Error> {
        self.rebuild_metadata_entries();
        self.rebuild_record()?;

        let target = path
            .map(Path::to_path_buf)
            .or_else(|| self.source_path.clone())
            .ok_or_else(|| Error::MalformedWheel("no output path given and editor has no source path".into()))?;

        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut writer = ZipWriter::new(&mut tmp);
            for entry in &self.archive.entries {
                writer.write_entry(entry, &self.archive)?;
            }
            writer.finish()?.flush()?;
        }
        tmp.persist(&target).map_err(|e| Error::Io(e.error))?;

        tracing::info!(path = %target.display(), "saved wheel");
        Ok(())
    }

    fn rebuild_metadata_entries(&mut self) {
        let metadata_bytes = self.metadata.to_bytes();
        let wheel_bytes = self.wheel_info.to_bytes();
        self.replace_member(METADATA_NAME, metadata_bytes);
        self.replace_member(WHEEL_NAME, wheel_bytes);
    }

    fn replace_member(&mut self, name: &str, bytes: Vec<u8>) {
        let path = format!("{}/{name}", self.dist_info_dir);
        if let Some(entry) = self.archive.entries.iter_mut().find(|e| e.name == path) {
            let method = entry.method;
            entry.set_owned(bytes, method);
        }
    }

    fn rebuild_record(&mut self) -> Result<(), Error> {
        let record_path = format!("{}/{RECORD_NAME}", self.dist_info_dir);
        let jws_path = format!("{record_path}.jws");
        let p7s_path = format!("{record_path}.p7s");

        let mut rows = Vec::with_capacity(self.archive.entries.len());
        for entry in &self.archive.entries {
            if entry.name == record_path || entry.name == jws_path || entry.name == p7s_path || entry.is_directory() {
                continue;
            }
            let bytes = self.archive.read_uncompressed(entry)?;
            rows.push(RecordRow {
                path: entry.name.clone(),
                hash: Some(hash_entry(&bytes)),
                size: Some(bytes.len() as u64),
            });
        }
        rows.push(RecordRow {
            path: record_path.clone(),
            hash: None,
            size: None,
        });

        let bytes = Record { rows }.to_bytes()?;
        self.replace_member(RECORD_NAME, bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::{dostime::MsdosTimestamp, Entry, Method, Payload};

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

    fn build_minimal_wheel() -> Vec<u8> {
        let entries = vec![
            mk_entry("demo/__init__.py", b"print('hi')\n"),
            mk_entry(
                "demo-1.0.dist-info/METADATA",
                b"Metadata-Version: 2.1\nName: demo\nVersion: 1.0\n\n",
            ),
            mk_entry(
                "demo-1.0.dist-info/WHEEL",
                b"Wheel-Version: 1.0\nGenerator: editwheel\nRoot-Is-Purelib: true\nTag: py3-none-any\n\n",
            ),
            mk_entry("demo-1.0.dist-info/RECORD", b""),
        ];
        // entries are all `Payload::Owned`, so `write_entry` never reads
        // from the archive argument; an empty one is a safe placeholder.
        let dummy = ZipArchive::empty();
        let mut buf = Vec::new();
        let mut writer = ZipWriter::new(&mut buf);
        for e in &entries {
            writer.write_entry(e, &dummy).unwrap();
        }
        writer.finish().unwrap();
        buf
    }

    #[test]
    fn round_trip_summary_edit() {
        let wheel = build_minimal_wheel();
        let mut editor = WheelEditor::from_bytes(wheel).unwrap();
        editor.set_summary("X");

        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("out.whl");
        editor.save(Some(&out_path)).unwrap();

        let reopened = WheelEditor::open(&out_path).unwrap();
        assert_eq!(reopened.summary(), Some("X"));
    }

    #[test]
    fn filename_reflects_tags_and_normalized_name() {
        let wheel = build_minimal_wheel();
        let editor = WheelEditor::from_bytes(wheel).unwrap();
        assert_eq!(editor.filename(), "demo-1.0-py3-none-any.whl");
    }
}
