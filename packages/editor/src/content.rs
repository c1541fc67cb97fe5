//! # Document Content
//!
//! Serializable state behind the JSON-backed [`Document`](crate::Document):
//! streams, named regions, properties, edit grants and protection.
//!
//! A stream is a run of units. A unit is either one character or one field, so
//! a field always occupies exactly one offset. On disk a stream is written as
//! segments of plain text and fields.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::host::{
    EditorIdentity, FieldKind, HeaderFooterKind, HostError, ProtectionMode, StreamRef,
};

/// Placeholder returned by `text_at` where a field sits.
pub const FIELD_MARKER: char = '\u{FFFC}';

/// Result shown by a field bound to a property that does not exist.
pub const MISSING_PROPERTY_RESULT: &str = "Error! Unknown document property name.";

/// A dynamic field bound to a document property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub kind: FieldKind,
    pub property: String,
    /// Last computed display text.
    #[serde(default)]
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Char(char),
    Field(Field),
}

/// On-disk form of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    Field(Field),
}

/// One addressable text stream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Segment>", into = "Vec<Segment>")]
pub struct StreamText {
    units: Vec<Unit>,
}

impl StreamText {
    pub fn new(text: &str) -> Self {
        Self {
            units: text.chars().map(Unit::Char).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Raw text of `[start, end)`, with [`FIELD_MARKER`] in place of fields.
    pub fn text_at(&self, start: usize, end: usize) -> String {
        self.units[start..end]
            .iter()
            .map(|unit| match unit {
                Unit::Char(c) => *c,
                Unit::Field(_) => FIELD_MARKER,
            })
            .collect()
    }

    /// Text as a reader would see it, with field results expanded.
    pub fn display_text(&self) -> String {
        let mut out = String::with_capacity(self.units.len());
        for unit in &self.units {
            match unit {
                Unit::Char(c) => out.push(*c),
                Unit::Field(field) => out.push_str(&field.result),
            }
        }
        out
    }

    /// Next literal occurrence of `needle` at or after `from`. Fields never
    /// match, so replaced text cannot be found again.
    pub fn find(&self, needle: &str, from: usize) -> Option<usize> {
        let needle: Vec<char> = needle.chars().collect();
        if needle.is_empty() || needle.len() > self.units.len() {
            return None;
        }

        let last = self.units.len() - needle.len();
        (from..=last).find(|&at| {
            needle
                .iter()
                .zip(&self.units[at..])
                .all(|(expected, unit)| matches!(unit, Unit::Char(c) if c == expected))
        })
    }

    pub(crate) fn delete(&mut self, start: usize, end: usize) {
        self.units.drain(start..end);
    }

    pub(crate) fn insert_field(&mut self, at: usize, field: Field) {
        self.units.insert(at, Unit::Field(field));
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.units.iter().filter_map(|unit| match unit {
            Unit::Field(field) => Some(field),
            Unit::Char(_) => None,
        })
    }

    pub(crate) fn fields_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.units.iter_mut().filter_map(|unit| match unit {
            Unit::Field(field) => Some(field),
            Unit::Char(_) => None,
        })
    }
}

impl From<Vec<Segment>> for StreamText {
    fn from(segments: Vec<Segment>) -> Self {
        let mut units = Vec::new();
        for segment in segments {
            match segment {
                Segment::Text(text) => units.extend(text.chars().map(Unit::Char)),
                Segment::Field(field) => units.push(Unit::Field(field)),
            }
        }
        Self { units }
    }
}

impl From<StreamText> for Vec<Segment> {
    fn from(stream: StreamText) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        for unit in stream.units {
            match unit {
                Unit::Char(c) => text.push(c),
                Unit::Field(field) => {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Field(field));
                }
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        segments
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderFooter {
    pub kind: HeaderFooterKind,
    pub text: StreamText,
}

/// A section owns its header and footer streams; the body is shared.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub headers: Vec<HeaderFooter>,
    #[serde(default)]
    pub footers: Vec<HeaderFooter>,
}

impl Section {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header of `kind`, replacing any existing one.
    pub fn with_header(mut self, kind: HeaderFooterKind, text: &str) -> Self {
        self.headers.retain(|h| h.kind != kind);
        self.headers.push(HeaderFooter { kind, text: StreamText::new(text) });
        self
    }

    pub fn with_footer(mut self, kind: HeaderFooterKind, text: &str) -> Self {
        self.footers.retain(|f| f.kind != kind);
        self.footers.push(HeaderFooter { kind, text: StreamText::new(text) });
        self
    }
}

/// Stored extent of a named region. Shifted in place as its stream changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionAnchor {
    pub name: String,
    pub stream: StreamRef,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EditGrant {
    pub stream: StreamRef,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub editor: EditorIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protection {
    pub mode: ProtectionMode,
    /// Hex SHA-256 of the password, if one was set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_digest: Option<String>,
}

impl Protection {
    pub fn new(mode: ProtectionMode, password: Option<&str>) -> Self {
        Self {
            mode,
            password_digest: password.map(digest_password),
        }
    }

    pub fn accepts(&self, password: Option<&str>) -> bool {
        match (&self.password_digest, password) {
            (None, _) => true,
            (Some(expected), Some(given)) => *expected == digest_password(given),
            (Some(_), None) => false,
        }
    }
}

fn digest_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
}

/// Everything persisted for one document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentContent {
    #[serde(default)]
    pub body: StreamText,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub regions: Vec<RegionAnchor>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub grants: BTreeSet<EditGrant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<Protection>,
}

impl DocumentContent {
    pub fn new(body: &str) -> Self {
        Self {
            body: StreamText::new(body),
            ..Self::default()
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_region(mut self, name: &str, stream: StreamRef, start: usize, end: usize) -> Self {
        self.regions.push(RegionAnchor {
            name: name.to_string(),
            stream,
            start,
            end,
        });
        self
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.push(Property {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn stream(&self, stream: &StreamRef) -> Option<&StreamText> {
        match stream {
            StreamRef::Body => Some(&self.body),
            StreamRef::Header { section, kind } => self
                .sections
                .get(*section)?
                .headers
                .iter()
                .find(|h| h.kind == *kind)
                .map(|h| &h.text),
            StreamRef::Footer { section, kind } => self
                .sections
                .get(*section)?
                .footers
                .iter()
                .find(|f| f.kind == *kind)
                .map(|f| &f.text),
        }
    }

    pub fn stream_mut(&mut self, stream: &StreamRef) -> Option<&mut StreamText> {
        match stream {
            StreamRef::Body => Some(&mut self.body),
            StreamRef::Header { section, kind } => self
                .sections
                .get_mut(*section)?
                .headers
                .iter_mut()
                .find(|h| h.kind == *kind)
                .map(|h| &mut h.text),
            StreamRef::Footer { section, kind } => self
                .sections
                .get_mut(*section)?
                .footers
                .iter_mut()
                .find(|f| f.kind == *kind)
                .map(|f| &mut f.text),
        }
    }

    /// Reject sections holding two headers or two footers of one kind. Only
    /// one stream per slot is addressable.
    pub fn check_streams(&self) -> Result<(), HostError> {
        for (index, section) in self.sections.iter().enumerate() {
            let mut seen = BTreeSet::new();
            for header in &section.headers {
                if !seen.insert(header.kind) {
                    return Err(HostError::DuplicateStream(StreamRef::Header {
                        section: index,
                        kind: header.kind,
                    }));
                }
            }
            seen.clear();
            for footer in &section.footers {
                if !seen.insert(footer.kind) {
                    return Err(HostError::DuplicateStream(StreamRef::Footer {
                        section: index,
                        kind: footer.kind,
                    }));
                }
            }
        }
        Ok(())
    }

    /// Every stream that exists, body first.
    pub fn streams_mut(&mut self) -> impl Iterator<Item = &mut StreamText> {
        std::iter::once(&mut self.body).chain(self.sections.iter_mut().flat_map(|section| {
            section
                .headers
                .iter_mut()
                .chain(section.footers.iter_mut())
                .map(|hf| &mut hf.text)
        }))
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        find_property(&self.properties, name)
    }

    /// Display result for a field bound to `property`.
    pub fn field_result(&self, property: &str) -> String {
        field_result(&self.properties, property)
    }
}

fn find_property<'a>(properties: &'a [Property], name: &str) -> Option<&'a Property> {
    let folded = name.to_lowercase();
    properties.iter().find(|p| p.name.to_lowercase() == folded)
}

pub(crate) fn field_result(properties: &[Property], property: &str) -> String {
    find_property(properties, property)
        .map(|p| p.value.clone())
        .unwrap_or_else(|| MISSING_PROPERTY_RESULT.to_string())
}
