//! # Pass Pipeline
//!
//! Coordinates a full pass over one document:
//!
//! ```text
//! Substitute → Refresh fields → Protect
//! ```
//!
//! The protection pass itself runs:
//!
//! 1. Unprotect (if protected) with the supplied password
//! 2. Revoke every existing grant
//! 3. Capture a [`LockSpec`] and resolve it
//! 4. Grant released regions, then gaps
//! 5. Grant tag-pair interiors in every stream
//! 6. Grant forced unlocks
//! 7. Protect (optional)

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::EditorError;
use crate::host::{EditorIdentity, HostDocument, ProtectionMode, StreamRef};
use crate::resolver::{resolve, EditableInterval, LockSpec};
use crate::substitution::{stream_order, substitute, SubstitutionReport, SubstitutionRequest};
use crate::unlocker::{find_unlock_spans, TagPair};

/// Which streams get their unnamed content resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamScope {
    Body,
    Headers,
    Footers,
    All,
}

impl StreamScope {
    fn includes(self, stream: &StreamRef) -> bool {
        matches!(
            (self, stream),
            (StreamScope::All, _)
                | (StreamScope::Body, StreamRef::Body)
                | (StreamScope::Headers, StreamRef::Header { .. })
                | (StreamScope::Footers, StreamRef::Footer { .. })
        )
    }
}

/// Existing streams of `doc` covered by any of `scopes`, in visit order.
pub fn protected_streams<D: HostDocument + ?Sized>(doc: &D, scopes: &[StreamScope]) -> Vec<StreamRef> {
    stream_order(doc)
        .into_iter()
        .filter(|stream| scopes.iter().any(|scope| scope.includes(stream)))
        .filter(|stream| doc.stream_len(stream).is_ok())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionOptions {
    /// Region names that stay locked
    pub keep_locked: BTreeSet<String>,

    /// Region names granted even if kept locked
    pub unlock: Vec<String>,

    pub tags: Vec<TagPair>,
    pub streams: Vec<StreamScope>,
    pub editor: EditorIdentity,
    pub mode: ProtectionMode,
    pub password: Option<String>,

    /// Enforce protection after granting
    pub protect: bool,
}

impl Default for ProtectionOptions {
    fn default() -> Self {
        Self {
            keep_locked: BTreeSet::new(),
            unlock: Vec::new(),
            tags: Vec::new(),
            streams: vec![StreamScope::Body],
            editor: EditorIdentity::Everyone,
            mode: ProtectionMode::ReadOnly,
            password: None,
            protect: true,
        }
    }
}

/// Outcome of [`unlock_regions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockReport {
    pub unlocked: Vec<String>,
    pub missing: Vec<String>,

    /// Names whose stream could not be reached
    pub skipped: Vec<String>,

    pub grants_added: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionReport {
    /// The document was protected when the pass started
    pub was_protected: bool,

    /// Grants removed before resolving
    pub revoked: usize,

    pub released: Vec<String>,
    pub kept: Vec<String>,

    /// Keep-locked names the document does not have
    pub missing: Vec<String>,

    pub gap_grants: usize,
    pub tag_grants: usize,
    pub unlocked: UnlockReport,

    /// Grants that did not already exist, across all steps
    pub grants_added: usize,

    /// Spans skipped because their stream could not be reached
    pub skipped: Vec<EditableInterval>,

    pub protected: bool,
}

/// Grant `span`, returning whether the grant is new. Unreachable streams are
/// recorded and skipped.
fn grant<D: HostDocument + ?Sized>(
    doc: &mut D,
    span: &EditableInterval,
    editor: &EditorIdentity,
    report: &mut ProtectionReport,
) -> Result<(), EditorError> {
    match doc
        .grant_edit(&span.stream, span.start, span.end, editor)
        .map_err(EditorError::from)
    {
        Ok(added) => {
            if added {
                report.grants_added += 1;
            }
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            warn!("Skipping grant [{}, {}) in {}: {}", span.start, span.end, span.stream, e);
            report.skipped.push(span.clone());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Grant edit on each named region regardless of what locks it. Missing names
/// and unreachable streams are reported, not fatal.
pub fn unlock_regions<D: HostDocument + ?Sized>(
    doc: &mut D,
    names: &[String],
    editor: &EditorIdentity,
) -> Result<UnlockReport, EditorError> {
    let regions = doc.named_regions();
    let mut report = UnlockReport::default();

    for name in names {
        let Some(region) = regions.iter().find(|r| &r.name == name) else {
            warn!("{}", EditorError::RegionNotFound(name.clone()));
            report.missing.push(name.clone());
            continue;
        };

        if region.start < region.end {
            match doc
                .grant_edit(&region.stream, region.start, region.end, editor)
                .map_err(EditorError::from)
            {
                Ok(added) => {
                    if added {
                        report.grants_added += 1;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping unlock of '{}': {}", name, e);
                    report.skipped.push(name.clone());
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        info!("Region '{}' unlocked for {}", name, editor);
        report.unlocked.push(name.clone());
    }

    Ok(report)
}

/// Run the protection pass on `doc`.
pub fn apply_protection<D: HostDocument + ?Sized>(
    doc: &mut D,
    options: &ProtectionOptions,
) -> Result<ProtectionReport, EditorError> {
    for tags in &options.tags {
        tags.validate()?;
    }

    let mut report = ProtectionReport::default();
    let password = options.password.as_deref();

    if doc.protection().is_some() {
        doc.clear_protection(password)?;
        report.was_protected = true;
        info!("Document unprotected");
    }

    report.revoked = doc.revoke_all_edits();
    debug!("Revoked {} existing grant(s)", report.revoked);

    let streams = protected_streams(doc, &options.streams);
    let spec = LockSpec::capture(doc, &streams, &options.keep_locked)?;
    let resolution = resolve(&spec)?;

    for name in &resolution.kept {
        info!("Region '{}' stays locked", name);
    }
    report.kept = resolution.kept.clone();
    report.missing = resolution.missing.clone();

    for (name, span) in &resolution.released {
        grant(doc, span, &options.editor, &mut report)?;
        info!("Region '{}' editable for {}", name, options.editor);
        report.released.push(name.clone());
    }

    for span in &resolution.gaps {
        grant(doc, span, &options.editor, &mut report)?;
        info!("Gap [{}, {}) in {} editable", span.start, span.end, span.stream);
        report.gap_grants += 1;
    }

    // Tagged interiors open up in every stream, scoped or not.
    for stream in stream_order(doc) {
        for tags in &options.tags {
            let spans = match find_unlock_spans(doc, &stream, tags) {
                Ok(spans) => spans,
                Err(EditorError::StreamAccess(_)) => break,
                Err(e) => return Err(e),
            };
            for span in spans {
                grant(doc, &span, &options.editor, &mut report)?;
                info!("Tag span [{}, {}) in {} editable", span.start, span.end, span.stream);
                report.tag_grants += 1;
            }
        }
    }

    report.unlocked = unlock_regions(doc, &options.unlock, &options.editor)?;
    report.grants_added += report.unlocked.grants_added;

    if options.protect {
        doc.set_protection(options.mode, password)?;
        report.protected = true;
        info!("Document protected ({:?})", options.mode);
    }

    Ok(report)
}

/// Configured pass over one document
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    substitutions: Vec<SubstitutionRequest>,
    protection: Option<ProtectionOptions>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_substitutions(mut self, requests: Vec<SubstitutionRequest>) -> Self {
        self.substitutions = requests;
        self
    }

    pub fn with_protection(mut self, options: ProtectionOptions) -> Self {
        self.protection = Some(options);
        self
    }

    /// Run every configured step in order. The first fatal error stops the
    /// pass; the caller decides whether to save.
    pub fn run<D: HostDocument + ?Sized>(&self, doc: &mut D) -> Result<PipelineResult, EditorError> {
        let mut result = PipelineResult::default();

        if !self.substitutions.is_empty() {
            result.substitution = Some(substitute(doc, &self.substitutions)?);
            result.fields_updated = doc.update_fields();
            debug!("Refreshed {} field(s)", result.fields_updated);
        }

        if let Some(options) = &self.protection {
            result.protection = Some(apply_protection(doc, options)?);
        }

        Ok(result)
    }
}

/// Result of pipeline execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub substitution: Option<SubstitutionReport>,
    pub fields_updated: usize,
    pub protection: Option<ProtectionReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{DocumentContent, Section};
    use crate::document::Document;
    use crate::host::{HeaderFooterKind, HostError};
    use std::path::PathBuf;

    fn forty() -> String {
        "0123456789".repeat(4)
    }

    fn tables() -> Document {
        Document::from_content(
            PathBuf::from("tables.json"),
            DocumentContent::new(&forty())
                .with_region("table1", StreamRef::Body, 0, 10)
                .with_region("table2", StreamRef::Body, 20, 30),
        )
    }

    fn keep(names: &[&str]) -> ProtectionOptions {
        ProtectionOptions {
            keep_locked: names.iter().map(|s| s.to_string()).collect(),
            ..ProtectionOptions::default()
        }
    }

    #[test]
    fn test_keep_one_table_locks_only_that_table() {
        let mut doc = tables();
        let report = apply_protection(&mut doc, &keep(&["table1"])).unwrap();

        assert_eq!(report.kept, vec!["table1"]);
        assert_eq!(report.released, vec!["table2"]);
        assert_eq!(report.gap_grants, 1);
        assert!(report.protected);

        assert!((0..10).all(|i| !doc.is_editable(&StreamRef::Body, i)));
        assert!((10..40).all(|i| doc.is_editable(&StreamRef::Body, i)));
    }

    #[test]
    fn test_rerun_does_not_accumulate_grants() {
        let mut doc = tables();
        let options = ProtectionOptions {
            password: Some("pw".to_string()),
            ..keep(&["table1"])
        };
        let first = apply_protection(&mut doc, &options).unwrap();
        let second = apply_protection(&mut doc, &options).unwrap();

        assert!(second.was_protected);
        assert_eq!(second.revoked, first.grants_added);
        assert_eq!(doc.grants().count(), first.grants_added);
    }

    #[test]
    fn test_wrong_password_is_fatal() {
        let mut doc = tables();
        doc.set_protection(ProtectionMode::ReadOnly, Some("right")).unwrap();

        let options = ProtectionOptions {
            password: Some("wrong".to_string()),
            ..ProtectionOptions::default()
        };
        let err = apply_protection(&mut doc, &options).unwrap_err();
        assert!(matches!(err, EditorError::Host(HostError::WrongPassword)));
    }

    #[test]
    fn test_tag_spans_unlock_inside_kept_region() {
        let mut doc = Document::from_content(
            PathBuf::from("tags.json"),
            DocumentContent::new("A [sgfs]B C[sgfe] D").with_region("all", StreamRef::Body, 0, 19),
        );
        let options = ProtectionOptions {
            tags: vec![TagPair::new("[sgfs]", "[sgfe]").unwrap()],
            ..keep(&["all"])
        };
        let report = apply_protection(&mut doc, &options).unwrap();

        assert_eq!(report.gap_grants, 0);
        assert_eq!(report.tag_grants, 1);
        assert!(!doc.is_editable(&StreamRef::Body, 7));
        assert!((8..11).all(|i| doc.is_editable(&StreamRef::Body, i)));
        assert!(!doc.is_editable(&StreamRef::Body, 11));
    }

    #[test]
    fn test_invalid_tag_pair_fails_before_any_change() {
        let mut doc = tables();
        doc.grant_edit(&StreamRef::Body, 0, 1, &EditorIdentity::Everyone).unwrap();

        let options = ProtectionOptions {
            tags: vec![TagPair { open: "x".into(), close: "x".into() }],
            ..ProtectionOptions::default()
        };
        assert!(matches!(
            apply_protection(&mut doc, &options),
            Err(EditorError::InvalidTagPair(_))
        ));
        assert_eq!(doc.grants().count(), 1);
    }

    #[test]
    fn test_forced_unlock_overrides_keep() {
        let mut doc = tables();
        let options = ProtectionOptions {
            unlock: vec!["table1".to_string(), "ghost".to_string()],
            ..keep(&["table1"])
        };
        let report = apply_protection(&mut doc, &options).unwrap();

        assert_eq!(report.unlocked.unlocked, vec!["table1"]);
        assert_eq!(report.unlocked.missing, vec!["ghost"]);
        assert!(doc.is_editable(&StreamRef::Body, 0));
    }

    #[test]
    fn test_forced_unlock_on_unreachable_stream_is_skipped() {
        let ghost = StreamRef::Header { section: 5, kind: HeaderFooterKind::Primary };
        let mut doc = Document::from_content(
            PathBuf::from("ghost.json"),
            DocumentContent::new(&forty()).with_region("ghost_header", ghost, 0, 3),
        );
        let options = ProtectionOptions {
            unlock: vec!["ghost_header".to_string()],
            ..keep(&["ghost_header"])
        };
        let report = apply_protection(&mut doc, &options).unwrap();

        assert_eq!(report.unlocked.skipped, vec!["ghost_header"]);
        assert!(report.unlocked.unlocked.is_empty());
        assert!(report.protected);
        assert_eq!(doc.protection(), Some(ProtectionMode::ReadOnly));
        assert!(doc.is_editable(&StreamRef::Body, 0));
    }

    #[test]
    fn test_tag_spans_unlock_outside_protected_streams() {
        let mut doc = Document::from_content(
            PathBuf::from("header_tags.json"),
            DocumentContent::new("body").with_section(
                Section::new().with_header(HeaderFooterKind::Primary, "H [sgfs]fill[sgfe]"),
            ),
        );
        let header = StreamRef::Header { section: 0, kind: HeaderFooterKind::Primary };
        let options = ProtectionOptions {
            tags: vec![TagPair::new("[sgfs]", "[sgfe]").unwrap()],
            ..ProtectionOptions::default()
        };
        let report = apply_protection(&mut doc, &options).unwrap();

        assert_eq!(report.tag_grants, 1);
        assert!((8..12).all(|i| doc.is_editable(&header, i)));
        assert!(!doc.is_editable(&header, 0));
        assert!(!doc.is_editable(&header, 12));
        assert!(doc.is_editable(&StreamRef::Body, 0));
    }

    #[test]
    fn test_missing_keep_name_is_reported() {
        let mut doc = tables();
        let report = apply_protection(&mut doc, &keep(&["nope"])).unwrap();
        assert_eq!(report.missing, vec!["nope"]);
        assert!(report.kept.is_empty());
    }

    #[test]
    fn test_no_protect_leaves_grants_in_place() {
        let mut doc = tables();
        let options = ProtectionOptions {
            protect: false,
            ..keep(&["table1"])
        };
        let report = apply_protection(&mut doc, &options).unwrap();

        assert!(!report.protected);
        assert_eq!(doc.protection(), None);
        assert!(doc.grants().count() > 0);
    }

    #[test]
    fn test_header_scope_resolves_header_gaps() {
        let mut doc = Document::from_content(
            PathBuf::from("scoped.json"),
            DocumentContent::new("body").with_section(
                Section::new()
                    .with_header(HeaderFooterKind::Primary, "head")
                    .with_footer(HeaderFooterKind::Primary, "foot"),
            ),
        );
        let header = StreamRef::Header { section: 0, kind: HeaderFooterKind::Primary };
        let footer = StreamRef::Footer { section: 0, kind: HeaderFooterKind::Primary };

        assert_eq!(
            protected_streams(&doc, &[StreamScope::Headers]),
            vec![header.clone()]
        );
        assert_eq!(protected_streams(&doc, &[StreamScope::All]).len(), 3);

        let options = ProtectionOptions {
            streams: vec![StreamScope::Headers],
            ..ProtectionOptions::default()
        };
        apply_protection(&mut doc, &options).unwrap();

        assert!(doc.is_editable(&header, 0));
        assert!(!doc.is_editable(&footer, 0));
        assert!(!doc.is_editable(&StreamRef::Body, 0));
    }

    #[test]
    fn test_pipeline_substitutes_then_protects() {
        let mut doc = Document::from_content(
            PathBuf::from("full.json"),
            DocumentContent::new("Dear [CLIENT], see table.").with_region("table", StreamRef::Body, 19, 24),
        );
        let pipeline = Pipeline::new()
            .with_substitutions(vec![SubstitutionRequest::new("[CLIENT]", "Client")])
            .with_protection(keep(&["table"]));
        let result = pipeline.run(&mut doc).unwrap();

        assert_eq!(result.substitution.as_ref().map(|s| s.total()), Some(1));
        assert_eq!(result.fields_updated, 1);

        // "[CLIENT]" collapsed to one unit, so "table" moved from 19 to 12.
        assert_eq!(doc.named_regions()[0].start, 12);
        assert!(!doc.is_editable(&StreamRef::Body, 12));
        assert!(doc.is_editable(&StreamRef::Body, 5));
        assert_eq!(doc.display_text(&StreamRef::Body).unwrap(), "Dear Client, see table.");
    }

    #[test]
    fn test_empty_pipeline_is_a_no_op() {
        let mut doc = tables();
        let result = Pipeline::new().run(&mut doc).unwrap();
        assert_eq!(result, PipelineResult::default());
        assert_eq!(doc.version, 0);
    }
}
