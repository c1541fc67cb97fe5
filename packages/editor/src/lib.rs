//! # Regionlock Editor
//!
//! Region locking and property-field substitution for structured documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host: HostDocument / DocumentHost traits    │
//! │  - Streams, named regions, properties       │
//! │  - Edit grants and protection               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ engine                                      │
//! │  - interval: merge / complement             │
//! │  - resolver: LockSpec → editable spans      │
//! │  - unlocker: tag-pair interiors             │
//! │  - substitution: text → property fields     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ pipeline: substitute → refresh → protect    │
//! │ session: open → pass → save-as → close      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! [`Document`] and [`FileHost`] are a JSON-file-backed host, so the engine is
//! usable without an external document model.
//!
//! ## Core Principles
//!
//! 1. **Offsets are re-derived**: a [`LockSpec`] is a snapshot and is
//!    captured again after any mutation
//! 2. **Validate, then apply**: a rejected edit leaves the document untouched
//! 3. **Fields never match**: re-running a substitution replaces nothing
//! 4. **Grants reset per pass**: existing grants are revoked before resolving
//!
//! ## Usage
//!
//! ```rust,ignore
//! use regionlock_editor::{
//!     with_session, FileHost, Pipeline, ProtectionOptions, SubstitutionRequest,
//! };
//!
//! let mut host = FileHost;
//! with_session(&mut host, "contract.json".as_ref(), |session| {
//!     let pipeline = Pipeline::new()
//!         .with_substitutions(vec![SubstitutionRequest::new("[CLIENT]", "Client")])
//!         .with_protection(ProtectionOptions::default());
//!     pipeline.run(session.document_mut())?;
//!     session.save_as("contract.protected.json".as_ref())?;
//!     Ok::<_, regionlock_editor::EditorError>(())
//! })?;
//! ```

mod content;
mod document;
mod errors;
mod host;
mod interval;
mod mutations;
mod pipeline;
mod post_effects;
mod resolver;
mod session;
mod substitution;
mod unlocker;

pub use content::{
    DocumentContent, EditGrant, Field, HeaderFooter, Property, Protection, RegionAnchor, Section,
    Segment, StreamText, Unit, FIELD_MARKER, MISSING_PROPERTY_RESULT,
};
pub use document::{Document, DocumentStorage, FileHost};
pub use errors::EditorError;
pub use host::{
    DocumentHost, EditorIdentity, FieldKind, HeaderFooterKind, HostDocument, HostError,
    NamedRegion, PropertyBinding, ProtectionMode, StreamRef,
};
pub use interval::{complement, merge, Interval, IntervalError};
pub use mutations::{Edit, EditError};
pub use pipeline::{
    apply_protection, protected_streams, unlock_regions, Pipeline, PipelineResult,
    ProtectionOptions, ProtectionReport, StreamScope, UnlockReport,
};
pub use post_effects::{PostEffect, PostEffectEngine};
pub use resolver::{coalesce, resolve, EditableInterval, LockSpec, Resolution};
pub use session::{with_session, DocumentSession};
pub use substitution::{
    replace_in_stream, resolve_property, stream_order, substitute, RequestOutcome, StreamCount,
    SubstitutionReport, SubstitutionRequest,
};
pub use unlocker::{find_unlock_spans, TagPair};
