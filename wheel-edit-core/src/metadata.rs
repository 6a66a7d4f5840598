//! C4: the `dist-info/METADATA` codec.
//!
//! `METADATA` is an RFC-822-ish header block (`Name: value`, continuation
//! lines indented with whitespace) followed by a blank line and a
//! free-form body (the long description). Unlike a typical one-shot
//! RFC-822 reader, this codec preserves field order exactly as the
//! wheel author wrote it, so that an unmodified wheel round-trips
//! byte-for-byte.

use crate::Error;

/// Multi-valued fields recognized by the wheel core metadata spec. Every
/// other field is treated as single-valued: a `set` replaces its one row
/// in place (or appends at the end if absent).
const MULTI_VALUED: &[&str] = &["classifier", "requires-dist", "project-url", "provides-extra"];

fn is_multi_valued(name: &str) -> bool {
    MULTI_VALUED.contains(&name.to_ascii_lowercase().as_str())
}

/// Canonical casing for fields this crate knows about, so that a value set
/// programmatically (rather than parsed from a file) is emitted the way
/// the wheel spec expects.
fn canonical_name(name: &str) -> String {
    const KNOWN: &[&str] = &[
        "Metadata-Version",
        "Name",
        "Version",
        "Summary",
        "Description",
        "Description-Content-Type",
        "Author",
        "Author-email",
        "License",
        "Requires-Python",
        "Requires-Dist",
        "Classifier",
        "Project-URL",
        "Home-page",
        "Provides-Extra",
    ];
    for candidate in KNOWN {
        if candidate.eq_ignore_ascii_case(name) {
            return candidate.to_string();
        }
    }
    name.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newline {
    Lf,
    Crlf,
}

impl Newline {
    fn as_str(self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::Crlf => "\r\n",
        }
    }

    fn detect(raw: &str) -> Self {
        if raw.contains('\n') && !raw.contains("\r\n") {
            Newline::Lf
        } else if raw.contains("\r\n") {
            Newline::Crlf
        } else {
            Newline::Lf
        }
    }
}

/// An ordered RFC-822-ish header block plus a free-form body.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// `(name, value)` pairs in source order (or insertion order for
    /// programmatically-built metadata).
    fields: Vec<(String, String)>,
    pub body: Option<String>,
    newline: Newline,
}

impl Metadata {
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            body: None,
            newline: Newline::Lf,
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let raw = std::str::from_utf8(bytes)
            .map_err(|e| Error::MetadataParse(format!("invalid UTF-8: {e}")))?;
        let newline = Newline::detect(raw);
        let normalized = raw.replace("\r\n", "\n");

        let mut fields: Vec<(String, String)> = Vec::new();
        let mut lines = normalized.split('\n');
        let mut body_start: Option<usize> = None;
        let mut consumed = 0usize;

        while let Some(line) = lines.next() {
            consumed += line.len() + 1;
            if line.is_empty() {
                body_start = Some(consumed);
                break;
            }

            if line.starts_with(' ') || line.starts_with('\t') {
                let (_, last) = fields
                    .last_mut()
                    .ok_or_else(|| Error::MetadataParse("continuation line with no preceding field".into()))?;
                last.push('\n');
                last.push_str(line.trim_start());
                continue;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::MetadataParse(format!("malformed header line: {line:?}")))?;
            fields.push((name.trim().to_string(), value.trim_start().to_string()));
        }

        let body = body_start.and_then(|start| {
            if start >= normalized.len() {
                None
            } else {
                let rest = &normalized[start..];
                if rest.is_empty() {
                    None
                } else {
                    Some(rest.to_string())
                }
            }
        });

        Ok(Self {
            fields,
            body,
            newline,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        for (name, value) in &self.fields {
            let mut lines = value.split('\n');
            out.push_str(name);
            out.push_str(": ");
            out.push_str(lines.next().unwrap_or(""));
            for continuation in lines {
                out.push('\n');
                out.push(' ');
                out.push_str(continuation);
            }
            out.push('\n');
        }
        out.push('\n');
        if let Some(body) = &self.body {
            out.push_str(body);
        }

        if self.newline == Newline::Crlf {
            out.replace('\n', "\r\n").into_bytes()
        } else {
            out.into_bytes()
        }
    }

    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Set a single-valued field in place, or append it if absent.
    pub fn set_single(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.fields.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            entry.1 = value;
        } else {
            self.fields.push((canonical_name(name), value));
        }
    }

    /// Remove every row for `name`, then append a fresh row for each of
    /// `values`, at the position of the first removed row (or the end, if
    /// the field was previously absent).
    pub fn set_multi(&mut self, name: &str, values: impl IntoIterator<Item = String>) {
        let canonical = canonical_name(name);
        let insert_at = self
            .fields
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name));
        self.fields.retain(|(n, _)| !n.eq_ignore_ascii_case(name));

        let values: Vec<_> = values.into_iter().collect();
        let at = insert_at.unwrap_or(self.fields.len()).min(self.fields.len());
        for (offset, value) in values.into_iter().enumerate() {
            self.fields.insert(at + offset, (canonical.clone(), value));
        }
    }

    pub fn append_multi(&mut self, name: &str, value: impl Into<String>) {
        debug_assert!(is_multi_valued(name), "append_multi called on single-valued field {name}");
        self.fields.push((canonical_name(name), value.into()));
    }

    /// `Home-page` and `Project-URL` both describe project URLs; this
    /// crate exposes them as an ordered mapping of label to URL. A
    /// `Home-page` row is surfaced under the label `"Home-page"`.
    pub fn project_urls(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Some(home) = self.get_first("Home-page") {
            out.push(("Home-page".to_string(), home.to_string()));
        }
        for raw in self.get_all("Project-URL") {
            if let Some((label, url)) = raw.split_once(',') {
                out.push((label.trim().to_string(), url.trim().to_string()));
            }
        }
        out
    }

    pub fn set_project_urls(&mut self, urls: impl IntoIterator<Item = (String, String)>) {
        self.set_multi(
            "Project-URL",
            urls.into_iter().map(|(label, url)| format!("{label}, {url}")),
        );
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"Metadata-Version: 2.1\nName: demo\nVersion: 1.0.0\nClassifier: A\nClassifier: B\n\nLong description.\nSecond line.\n";

    #[test]
    fn parses_fields_and_body_in_order() {
        let md = Metadata::parse(SAMPLE).unwrap();
        assert_eq!(md.get_first("Name"), Some("demo"));
        assert_eq!(md.get_all("Classifier"), vec!["A", "B"]);
        assert_eq!(md.body.as_deref(), Some("Long description.\nSecond line.\n"));
    }

    #[test]
    fn round_trips_unmodified() {
        let md = Metadata::parse(SAMPLE).unwrap();
        assert_eq!(md.to_bytes(), SAMPLE);
    }

    #[test]
    fn set_single_updates_in_place() {
        let mut md = Metadata::parse(SAMPLE).unwrap();
        md.set_single("Version", "2.0.0");
        assert_eq!(md.get_first("Version"), Some("2.0.0"));
        // order preserved: Version is still the third line
        let out = String::from_utf8(md.to_bytes()).unwrap();
        assert!(out.lines().nth(2).unwrap().starts_with("Version: 2.0.0"));
    }

    #[test]
    fn append_multi_preserves_existing_and_adds_new() {
        let mut md = Metadata::parse(SAMPLE).unwrap();
        md.append_multi("Classifier", "C");
        assert_eq!(md.get_all("Classifier"), vec!["A", "B", "C"]);
    }

    #[test]
    fn continuation_lines_join_with_newline() {
        let raw = b"Name: demo\nDescription: first\n second\n\n";
        let md = Metadata::parse(raw).unwrap();
        assert_eq!(md.get_first("Description"), Some("first\nsecond"));
    }

    #[test]
    fn preserves_crlf_convention() {
        let raw = b"Name: demo\r\nVersion: 1.0\r\n\r\nbody\r\n";
        let md = Metadata::parse(raw).unwrap();
        assert_eq!(md.to_bytes(), raw);
    }
}
