//! C5: the `dist-info/WHEEL` codec.
//!
//! `WHEEL` uses the same header-line grammar as `METADATA` (§4.4) but
//! carries no body, so this codec is built on top of [`Metadata`] rather
//! than re-implementing line continuation and ordering from scratch.

use crate::metadata::Metadata;
use crate::Error;

/// One `<python>-<abi>-<platform>` compatibility tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub python: String,
    pub abi: String,
    pub platform: String,
}

impl Tag {
    fn parse(raw: &str) -> Result<Self, Error> {
        let mut parts = raw.splitn(3, '-');
        let python = parts.next();
        let abi = parts.next();
        let platform = parts.next();
        match (python, abi, platform) {
            (Some(python), Some(abi), Some(platform)) => Ok(Self {
                python: python.to_string(),
                abi: abi.to_string(),
                platform: platform.to_string(),
            }),
            _ => Err(Error::WheelParse(format!("malformed Tag line: {raw:?}"))),
        }
    }

    fn to_string_line(&self) -> String {
        format!("{}-{}-{}", self.python, self.abi, self.platform)
    }
}

#[derive(Debug, Clone)]
pub struct WheelInfo {
    inner: Metadata,
    pub tags: Vec<Tag>,
}

impl WheelInfo {
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let inner = Metadata::parse(bytes).map_err(|e| match e {
            Error::MetadataParse(msg) => Error::WheelParse(msg),
            other => other,
        })?;
        let tags = inner
            .get_all("Tag")
            .into_iter()
            .map(Tag::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { inner, tags })
    }

    pub fn to_bytes(&mut self) -> Vec<u8> {
        self.sync_tags();
        self.inner.to_bytes()
    }

    fn sync_tags(&mut self) {
        self.inner
            .set_multi("Tag", self.tags.iter().map(Tag::to_string_line));
    }

    pub fn wheel_version(&self) -> Option<&str> {
        self.inner.get_first("Wheel-Version")
    }

    pub fn generator(&self) -> Option<&str> {
        self.inner.get_first("Generator")
    }

    pub fn root_is_purelib(&self) -> bool {
        self.inner
            .get_first("Root-Is-Purelib")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn build(&self) -> Option<&str> {
        self.inner.get_first("Build")
    }

    pub fn python_tags(&self) -> Vec<&str> {
        dedup(self.tags.iter().map(|t| t.python.as_str()))
    }

    pub fn abi_tags(&self) -> Vec<&str> {
        dedup(self.tags.iter().map(|t| t.abi.as_str()))
    }

    pub fn platform_tags(&self) -> Vec<&str> {
        dedup(self.tags.iter().map(|t| t.platform.as_str()))
    }

    /// Rewrite the python component of every tag. If there is more than
    /// one distinct python tag, every one of them is replaced by the same
    /// new value, collapsing the cross-product to a single python tag.
    pub fn set_python_tag(&mut self, value: impl Into<String>) {
        let value = value.into();
        for tag in &mut self.tags {
            tag.python = value.clone();
        }
    }

    pub fn set_abi_tag(&mut self, value: impl Into<String>) {
        let value = value.into();
        for tag in &mut self.tags {
            tag.abi = value.clone();
        }
    }

    pub fn set_platform_tag(&mut self, value: impl Into<String>) {
        let value = value.into();
        for tag in &mut self.tags {
            tag.platform = value.clone();
        }
    }

    /// `<py>-<abi>-<platform>` triples joined by `.`, as embedded in the
    /// wheel filename (e.g. `py3-none-any` or, with multiple tags,
    /// `py2.py3-none-any`).
    pub fn filename_tag_component(&self) -> String {
        format!(
            "{}-{}-{}",
            self.python_tags().join("."),
            self.abi_tags().join("."),
            self.platform_tags().join(".")
        )
    }
}

fn dedup<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"Wheel-Version: 1.0\nGenerator: editwheel\nRoot-Is-Purelib: true\nTag: py3-none-any\n\n";

    #[test]
    fn parses_single_tag() {
        let wi = WheelInfo::parse(SAMPLE).unwrap();
        assert_eq!(wi.wheel_version(), Some("1.0"));
        assert!(wi.root_is_purelib());
        assert_eq!(wi.filename_tag_component(), "py3-none-any");
    }

    #[test]
    fn set_platform_tag_rewrites_component() {
        let mut wi = WheelInfo::parse(SAMPLE).unwrap();
        wi.set_platform_tag("manylinux_2_28_x86_64");
        assert_eq!(wi.filename_tag_component(), "py3-none-manylinux_2_28_x86_64");
        let out = String::from_utf8(wi.to_bytes()).unwrap();
        assert!(out.contains("Tag: py3-none-manylinux_2_28_x86_64\n"));
    }

    #[test]
    fn set_tag_component_applies_to_every_tag_in_cross_product() {
        let raw = b"Wheel-Version: 1.0\nTag: py2-none-any\nTag: py3-none-any\n\n";
        let mut wi = WheelInfo::parse(raw).unwrap();
        wi.set_platform_tag("linux_x86_64");
        assert_eq!(wi.platform_tags(), vec!["linux_x86_64"]);
        assert_eq!(wi.python_tags(), vec!["py2", "py3"]);
    }
}
