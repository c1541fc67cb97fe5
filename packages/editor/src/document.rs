//! # Document Handle
//!
//! Concrete [`HostDocument`] backed by JSON [`DocumentContent`].
//!
//! A Document can be:
//! - **Memory-backed**: Temporary, for testing or in-memory passes
//! - **File-backed**: Loaded from and saved to a JSON file
//!
//! ## Lifecycle
//!
//! ```text
//! Load → Edit → Grant/Protect → Save
//!   ↓      ↓          ↓           ↓
//! File  Fields     Grants       File
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::content::{field_result, DocumentContent, EditGrant, Field, Property, Protection};
use crate::host::{
    DocumentHost, EditorIdentity, FieldKind, HostDocument, HostError, NamedRegion,
    PropertyBinding, ProtectionMode, StreamRef,
};
use crate::mutations::Edit;
use crate::post_effects::PostEffectEngine;

/// Editable document
#[derive(Debug)]
pub struct Document {
    /// Path to source file (if any)
    pub path: PathBuf,

    /// Current version number (increments on each applied edit)
    pub version: u64,

    /// Backing storage strategy
    storage: DocumentStorage,

    effects: PostEffectEngine,
}

/// Storage backend for document
#[derive(Debug)]
pub enum DocumentStorage {
    /// In-memory only (for testing, temp docs)
    Memory { content: DocumentContent },

    /// File-backed
    File { content: DocumentContent, dirty: bool },
}

impl Document {
    /// Create document from content (memory-backed)
    pub fn from_content(path: PathBuf, content: DocumentContent) -> Self {
        Self {
            path,
            version: 0,
            storage: DocumentStorage::Memory { content },
            effects: PostEffectEngine::new(),
        }
    }

    /// Create document from JSON text (memory-backed)
    pub fn from_json(path: PathBuf, json: &str) -> Result<Self, HostError> {
        let content: DocumentContent = serde_json::from_str(json)?;
        content.check_streams()?;
        Ok(Self::from_content(path, content))
    }

    /// Load document from file (file-backed)
    pub fn load(path: PathBuf) -> Result<Self, HostError> {
        if !path.exists() {
            return Err(HostError::NotFound(path));
        }
        let source = std::fs::read_to_string(&path)?;
        let content: DocumentContent = serde_json::from_str(&source)?;
        content.check_streams()?;

        Ok(Self {
            path,
            version: 0,
            storage: DocumentStorage::File {
                content,
                dirty: false,
            },
            effects: PostEffectEngine::new(),
        })
    }

    pub fn content(&self) -> &DocumentContent {
        match &self.storage {
            DocumentStorage::Memory { content } => content,
            DocumentStorage::File { content, .. } => content,
        }
    }

    /// Get mutable content (marks file-backed documents dirty)
    fn content_mut(&mut self) -> &mut DocumentContent {
        match &mut self.storage {
            DocumentStorage::Memory { content } => content,
            DocumentStorage::File { content, dirty } => {
                *dirty = true;
                content
            }
        }
    }

    /// Apply an edit and its post-effects
    pub fn apply(&mut self, edit: Edit) -> Result<u64, HostError> {
        edit.validate(self.content())?;

        let content = match &mut self.storage {
            DocumentStorage::Memory { content } => content,
            DocumentStorage::File { content, dirty } => {
                *dirty = true;
                content
            }
        };
        self.effects.apply_with_effects(&edit, content)?;

        self.version += 1;
        Ok(self.version)
    }

    /// Check if document has unsaved changes
    pub fn is_dirty(&self) -> bool {
        match &self.storage {
            DocumentStorage::File { dirty, .. } => *dirty,
            DocumentStorage::Memory { .. } => false,
        }
    }

    /// Save document to disk (if file-backed)
    pub fn save(&mut self) -> Result<(), HostError> {
        match &self.storage {
            DocumentStorage::File { content, .. } => {
                std::fs::write(&self.path, serde_json::to_string_pretty(content)?)?;
            }
            DocumentStorage::Memory { .. } => return Err(HostError::NotFileBacked),
        }
        if let DocumentStorage::File { dirty, .. } = &mut self.storage {
            *dirty = false;
        }
        Ok(())
    }

    /// Write to `path`; the document becomes file-backed at that path.
    pub fn save_as(&mut self, path: &Path) -> Result<(), HostError> {
        std::fs::write(path, self.to_json()?)?;

        let content = std::mem::take(self.content_mut());
        self.storage = DocumentStorage::File {
            content,
            dirty: false,
        };
        self.path = path.to_path_buf();
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, HostError> {
        Ok(serde_json::to_string_pretty(self.content())?)
    }

    /// Stream text with field results expanded
    pub fn display_text(&self, stream: &StreamRef) -> Result<String, HostError> {
        self.content()
            .stream(stream)
            .map(|text| text.display_text())
            .ok_or_else(|| HostError::StreamUnavailable(stream.clone()))
    }

    pub fn grants(&self) -> impl Iterator<Item = &EditGrant> {
        self.content().grants.iter()
    }

    /// Whether `offset` may be edited under current protection and grants
    pub fn is_editable(&self, stream: &StreamRef, offset: usize) -> bool {
        if self.content().protection.is_none() {
            return true;
        }
        self.grants()
            .any(|g| &g.stream == stream && g.start <= offset && offset < g.end)
    }

    fn checked_len(&self, stream: &StreamRef) -> Result<usize, HostError> {
        self.content()
            .stream(stream)
            .map(|text| text.len())
            .ok_or_else(|| HostError::StreamUnavailable(stream.clone()))
    }

    fn check_range(&self, stream: &StreamRef, start: usize, end: usize) -> Result<(), HostError> {
        let len = self.checked_len(stream)?;
        if start > end || end > len {
            return Err(HostError::OutOfBounds {
                stream: stream.clone(),
                start,
                end,
                len,
            });
        }
        Ok(())
    }
}

impl HostDocument for Document {
    fn section_count(&self) -> usize {
        self.content().sections.len()
    }

    fn stream_len(&self, stream: &StreamRef) -> Result<usize, HostError> {
        self.checked_len(stream)
    }

    fn text_at(&self, stream: &StreamRef, start: usize, end: usize) -> Result<String, HostError> {
        self.check_range(stream, start, end)?;
        let text = self
            .content()
            .stream(stream)
            .ok_or_else(|| HostError::StreamUnavailable(stream.clone()))?;
        Ok(text.text_at(start, end))
    }

    fn find(&self, stream: &StreamRef, text: &str, from: usize) -> Result<Option<usize>, HostError> {
        let haystack = self
            .content()
            .stream(stream)
            .ok_or_else(|| HostError::StreamUnavailable(stream.clone()))?;
        Ok(haystack.find(text, from))
    }

    fn delete_range(&mut self, stream: &StreamRef, start: usize, end: usize) -> Result<(), HostError> {
        self.apply(Edit::DeleteRange {
            stream: stream.clone(),
            start,
            end,
        })?;
        Ok(())
    }

    fn insert_field(
        &mut self,
        stream: &StreamRef,
        at: usize,
        kind: FieldKind,
        property: &str,
    ) -> Result<usize, HostError> {
        let field = Field {
            kind,
            property: property.to_string(),
            result: self.content().field_result(property),
        };
        self.apply(Edit::InsertField {
            stream: stream.clone(),
            at,
            field,
        })?;
        Ok(at + 1)
    }

    fn named_regions(&self) -> Vec<NamedRegion> {
        self.content()
            .regions
            .iter()
            .map(|r| NamedRegion {
                name: r.name.clone(),
                stream: r.stream.clone(),
                start: r.start,
                end: r.end,
            })
            .collect()
    }

    fn find_property(&self, name: &str) -> Option<PropertyBinding> {
        self.content().property(name).map(|p| PropertyBinding {
            name: p.name.clone(),
            value: p.value.clone(),
        })
    }

    fn create_property(&mut self, name: &str, value: &str) -> Result<PropertyBinding, HostError> {
        if let Some(existing) = self.content().property(name) {
            return Err(HostError::PropertyExists(existing.name.clone()));
        }
        self.content_mut().properties.push(Property {
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(PropertyBinding {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    fn update_fields(&mut self) -> usize {
        let content = self.content_mut();
        let properties = content.properties.clone();

        let mut updated = 0;
        for stream in content.streams_mut() {
            for field in stream.fields_mut() {
                field.result = field_result(&properties, &field.property);
                updated += 1;
            }
        }
        updated
    }

    fn grant_edit(
        &mut self,
        stream: &StreamRef,
        start: usize,
        end: usize,
        editor: &EditorIdentity,
    ) -> Result<bool, HostError> {
        self.check_range(stream, start, end)?;
        let grant = EditGrant {
            stream: stream.clone(),
            start,
            end,
            editor: editor.clone(),
        };
        if self.content().grants.contains(&grant) {
            return Ok(false);
        }
        Ok(self.content_mut().grants.insert(grant))
    }

    fn revoke_all_edits(&mut self) -> usize {
        if self.content().grants.is_empty() {
            return 0;
        }
        let revoked = std::mem::take(&mut self.content_mut().grants);
        revoked.len()
    }

    fn protection(&self) -> Option<ProtectionMode> {
        self.content().protection.as_ref().map(|p| p.mode)
    }

    fn set_protection(&mut self, mode: ProtectionMode, password: Option<&str>) -> Result<(), HostError> {
        if self.content().protection.is_some() {
            return Err(HostError::AlreadyProtected);
        }
        self.content_mut().protection = Some(Protection::new(mode, password));
        Ok(())
    }

    fn clear_protection(&mut self, password: Option<&str>) -> Result<(), HostError> {
        match &self.content().protection {
            None => Ok(()),
            Some(protection) if !protection.accepts(password) => Err(HostError::WrongPassword),
            Some(_) => {
                self.content_mut().protection = None;
                Ok(())
            }
        }
    }
}

/// Opens JSON documents from disk
#[derive(Debug, Default)]
pub struct FileHost;

impl DocumentHost for FileHost {
    type Document = Document;

    fn open(&mut self, path: &Path) -> Result<Document, HostError> {
        debug!("Opening document {}", path.display());
        Document::load(path.to_path_buf())
    }

    fn save(&mut self, document: &mut Document, path: &Path) -> Result<(), HostError> {
        document.save_as(path)
    }

    fn close(&mut self, document: Document) -> Result<(), HostError> {
        if document.is_dirty() {
            debug!("Discarding unsaved changes to {}", document.path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Section;
    use crate::host::HeaderFooterKind;

    fn memory(content: DocumentContent) -> Document {
        Document::from_content(PathBuf::from("test.json"), content)
    }

    #[test]
    fn test_create_memory_document() {
        let doc = memory(DocumentContent::new("Hello"));
        assert_eq!(doc.version, 0);
        assert!(!doc.is_dirty());
        assert_eq!(doc.stream_len(&StreamRef::Body).unwrap(), 5);
        assert_eq!(doc.section_count(), 0);
    }

    #[test]
    fn test_document_version_increments() {
        let mut doc = memory(DocumentContent::new("Hello World"));
        doc.delete_range(&StreamRef::Body, 0, 6).unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.display_text(&StreamRef::Body).unwrap(), "World");

        // Failed edits do not bump the version.
        assert!(doc.delete_range(&StreamRef::Body, 3, 40).is_err());
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn test_insert_field_uses_property_value() {
        let mut doc = memory(DocumentContent::new("Hi ").with_property("Company", "Acme"));
        let after = doc
            .insert_field(&StreamRef::Body, 3, FieldKind::DocProperty, "company")
            .unwrap();
        assert_eq!(after, 4);
        assert_eq!(doc.display_text(&StreamRef::Body).unwrap(), "Hi Acme");
    }

    #[test]
    fn test_missing_stream_is_unavailable() {
        let doc = memory(DocumentContent::new("body"));
        let header = StreamRef::Header { section: 0, kind: HeaderFooterKind::Primary };
        assert!(matches!(
            doc.stream_len(&header),
            Err(HostError::StreamUnavailable(_))
        ));
    }

    #[test]
    fn test_create_property_rejects_case_insensitive_duplicate() {
        let mut doc = memory(DocumentContent::new("").with_property("Company", "Acme"));
        let err = doc.create_property("COMPANY", "Other").unwrap_err();
        assert!(matches!(err, HostError::PropertyExists(name) if name == "Company"));
        assert_eq!(doc.content().properties.len(), 1);
    }

    #[test]
    fn test_update_fields_refreshes_results() {
        let mut doc = memory(
            DocumentContent::new("x")
                .with_section(Section::new().with_footer(HeaderFooterKind::Primary, "")),
        );
        let footer = StreamRef::Footer { section: 0, kind: HeaderFooterKind::Primary };
        doc.insert_field(&StreamRef::Body, 0, FieldKind::DocProperty, "Title").unwrap();
        doc.insert_field(&footer, 0, FieldKind::DocProperty, "Title").unwrap();
        assert_eq!(
            doc.display_text(&footer).unwrap(),
            crate::content::MISSING_PROPERTY_RESULT
        );

        doc.create_property("Title", "Report").unwrap();
        assert_eq!(doc.update_fields(), 2);
        assert_eq!(doc.display_text(&StreamRef::Body).unwrap(), "Reportx");
        assert_eq!(doc.display_text(&footer).unwrap(), "Report");
    }

    #[test]
    fn test_grant_edit_is_idempotent() {
        let mut doc = memory(DocumentContent::new("0123456789"));
        let everyone = EditorIdentity::Everyone;

        assert!(doc.grant_edit(&StreamRef::Body, 2, 5, &everyone).unwrap());
        assert!(!doc.grant_edit(&StreamRef::Body, 2, 5, &everyone).unwrap());
        assert_eq!(doc.grants().count(), 1);

        assert!(doc.grant_edit(&StreamRef::Body, 0, 11, &everyone).is_err());
        assert_eq!(doc.revoke_all_edits(), 1);
        assert_eq!(doc.revoke_all_edits(), 0);
    }

    #[test]
    fn test_protection_and_editability() {
        let mut doc = memory(DocumentContent::new("0123456789"));
        assert!(doc.is_editable(&StreamRef::Body, 0));

        doc.grant_edit(&StreamRef::Body, 2, 5, &EditorIdentity::Everyone).unwrap();
        doc.set_protection(ProtectionMode::ReadOnly, Some("pw")).unwrap();

        assert_eq!(doc.protection(), Some(ProtectionMode::ReadOnly));
        assert!(!doc.is_editable(&StreamRef::Body, 0));
        assert!(doc.is_editable(&StreamRef::Body, 2));
        assert!(!doc.is_editable(&StreamRef::Body, 5));

        assert!(matches!(
            doc.set_protection(ProtectionMode::ReadOnly, None),
            Err(HostError::AlreadyProtected)
        ));
        assert!(matches!(doc.clear_protection(Some("nope")), Err(HostError::WrongPassword)));
        doc.clear_protection(Some("pw")).unwrap();
        assert_eq!(doc.protection(), None);
    }

    #[test]
    fn test_save_requires_file_backing() {
        let mut doc = memory(DocumentContent::new("x"));
        assert!(matches!(doc.save(), Err(HostError::NotFileBacked)));
    }

    #[test]
    fn test_save_as_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        let mut doc = memory(
            DocumentContent::new("Hello CompanyName")
                .with_region("r", StreamRef::Body, 0, 5)
                .with_property("Company", "Acme"),
        );
        doc.delete_range(&StreamRef::Body, 6, 17).unwrap();
        doc.insert_field(&StreamRef::Body, 6, FieldKind::DocProperty, "Company").unwrap();
        doc.set_protection(ProtectionMode::ReadOnly, Some("pw")).unwrap();
        doc.save_as(&path).unwrap();

        assert_eq!(doc.path, path);
        assert!(!doc.is_dirty());

        let loaded = Document::load(path).unwrap();
        assert_eq!(loaded.content(), doc.content());
        assert_eq!(loaded.display_text(&StreamRef::Body).unwrap(), "Hello Acme");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Document::load(PathBuf::from("/nonexistent/doc.json")).unwrap_err();
        assert!(matches!(err, HostError::NotFound(_)));
    }

    #[test]
    fn test_duplicate_header_kind_is_rejected() {
        let json = r#"{
            "body": [{ "text": "body" }],
            "sections": [{
                "headers": [
                    { "kind": "primary", "text": [{ "text": "first" }] },
                    { "kind": "primary", "text": [{ "text": "second" }] }
                ]
            }]
        }"#;
        let err = Document::from_json(PathBuf::from("dup.json"), json).unwrap_err();
        assert!(matches!(
            err,
            HostError::DuplicateStream(StreamRef::Header { section: 0, kind: HeaderFooterKind::Primary })
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.json");
        std::fs::write(&path, json).unwrap();
        assert!(matches!(Document::load(path), Err(HostError::DuplicateStream(_))));
    }

    #[test]
    fn test_section_builder_replaces_same_kind() {
        let section = Section::new()
            .with_footer(HeaderFooterKind::Primary, "old")
            .with_footer(HeaderFooterKind::Primary, "new");
        let doc = memory(DocumentContent::new("body").with_section(section));
        let footer = StreamRef::Footer { section: 0, kind: HeaderFooterKind::Primary };

        assert!(doc.content().check_streams().is_ok());
        assert_eq!(doc.display_text(&footer).unwrap(), "new");
    }

    #[test]
    fn test_file_host_close_discards_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, r#"{"body":[{"text":"keep me"}]}"#).unwrap();

        let mut host = FileHost;
        let mut doc = host.open(&path).unwrap();
        doc.delete_range(&StreamRef::Body, 0, 5).unwrap();
        assert!(doc.is_dirty());
        host.close(doc).unwrap();

        let reopened = host.open(&path).unwrap();
        assert_eq!(reopened.display_text(&StreamRef::Body).unwrap(), "keep me");
    }
}
