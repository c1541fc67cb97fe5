//! # Host Capability Surface
//!
//! The engine never touches a document format directly. Everything it needs
//! from the host document model goes through [`HostDocument`], and opening,
//! saving and closing go through [`DocumentHost`].
//!
//! All offsets are stream-local character positions; `end` is exclusive.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header/footer slots of a section, in the order streams are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderFooterKind {
    Primary,
    FirstPage,
    EvenPages,
}

impl HeaderFooterKind {
    pub const ALL: [HeaderFooterKind; 3] = [
        HeaderFooterKind::Primary,
        HeaderFooterKind::FirstPage,
        HeaderFooterKind::EvenPages,
    ];
}

/// One independently addressed text stream of a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRef {
    Body,
    Header { section: usize, kind: HeaderFooterKind },
    Footer { section: usize, kind: HeaderFooterKind },
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRef::Body => write!(f, "body"),
            StreamRef::Header { section, kind } => {
                write!(f, "section {} header ({:?})", section + 1, kind)
            }
            StreamRef::Footer { section, kind } => {
                write!(f, "section {} footer ({:?})", section + 1, kind)
            }
        }
    }
}

/// A bookmark-like labelled span, resolved to its extent at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRegion {
    pub name: String,
    pub stream: StreamRef,
    pub start: usize,
    pub end: usize,
}

/// Document-scoped named value a field can display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyBinding {
    pub name: String,
    pub value: String,
}

/// Who a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EditorIdentity {
    #[default]
    Everyone,
    User(String),
}

impl fmt::Display for EditorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorIdentity::Everyone => write!(f, "everyone"),
            EditorIdentity::User(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionMode {
    #[default]
    ReadOnly,
    Comments,
    TrackedChanges,
    Forms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    DocProperty,
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Stream unavailable: {0}")]
    StreamUnavailable(StreamRef),

    #[error("Range [{start}, {end}) is out of bounds for {stream} (length {len})")]
    OutOfBounds {
        stream: StreamRef,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Incorrect protection password")]
    WrongPassword,

    #[error("Document is already protected")]
    AlreadyProtected,

    #[error("Document property already exists: {0}")]
    PropertyExists(String),

    #[error("Document is not file-backed")]
    NotFileBacked,

    #[error("Duplicate stream: {0}")]
    DuplicateStream(StreamRef),

    #[error("Document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    Format(#[from] serde_json::Error),
}

/// Capabilities the engine consumes from an opened document.
///
/// Implementations must make [`HostDocument::grant_edit`] idempotent: granting
/// an identical span twice leaves a single grant.
pub trait HostDocument {
    /// Number of sections; each may own header and footer streams.
    fn section_count(&self) -> usize;

    fn stream_len(&self, stream: &StreamRef) -> Result<usize, HostError>;

    fn text_at(&self, stream: &StreamRef, start: usize, end: usize) -> Result<String, HostError>;

    /// Offset of the next literal, case-sensitive occurrence of `text` at or
    /// after `from`.
    fn find(&self, stream: &StreamRef, text: &str, from: usize) -> Result<Option<usize>, HostError>;

    fn delete_range(&mut self, stream: &StreamRef, start: usize, end: usize) -> Result<(), HostError>;

    /// Insert a field at `at`; returns the offset just after the field.
    fn insert_field(
        &mut self,
        stream: &StreamRef,
        at: usize,
        kind: FieldKind,
        property: &str,
    ) -> Result<usize, HostError>;

    /// Current extents of every named region.
    fn named_regions(&self) -> Vec<NamedRegion>;

    /// Case-insensitive property lookup.
    fn find_property(&self, name: &str) -> Option<PropertyBinding>;

    fn create_property(&mut self, name: &str, value: &str) -> Result<PropertyBinding, HostError>;

    /// Refresh every field's displayed result; returns the number of fields.
    fn update_fields(&mut self) -> usize;

    /// Returns `true` when the grant was not already present.
    fn grant_edit(
        &mut self,
        stream: &StreamRef,
        start: usize,
        end: usize,
        editor: &EditorIdentity,
    ) -> Result<bool, HostError>;

    /// Remove every edit grant at once; returns how many were removed.
    fn revoke_all_edits(&mut self) -> usize;

    fn protection(&self) -> Option<ProtectionMode>;

    fn set_protection(&mut self, mode: ProtectionMode, password: Option<&str>) -> Result<(), HostError>;

    fn clear_protection(&mut self, password: Option<&str>) -> Result<(), HostError>;
}

/// Opens, saves and closes documents.
pub trait DocumentHost {
    type Document: HostDocument;

    fn open(&mut self, path: &Path) -> Result<Self::Document, HostError>;

    fn save(&mut self, document: &mut Self::Document, path: &Path) -> Result<(), HostError>;

    /// Release the document without saving.
    fn close(&mut self, document: Self::Document) -> Result<(), HostError>;
}
