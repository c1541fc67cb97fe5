//! # Property-Field Substitution
//!
//! Replaces literal text with a field bound to a document property, in every
//! stream of the document.
//!
//! ## Stream order
//!
//! ```text
//! body → section 1 headers → section 1 footers → section 2 headers → ...
//! ```
//!
//! Headers and footers are visited in [`HeaderFooterKind::ALL`] order. A slot
//! the section does not have is skipped.
//!
//! ## Drift
//!
//! Each replacement shortens the stream, so every offset after it moves. The
//! scan cursor is always taken from the end of the inserted field, never from
//! the end of the original match.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::EditorError;
use crate::host::{FieldKind, HeaderFooterKind, HostDocument, PropertyBinding, StreamRef};

/// Replace every `search_text` with a field showing `property_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRequest {
    pub search_text: String,
    pub property_name: String,
}

impl SubstitutionRequest {
    pub fn new(search_text: impl Into<String>, property_name: impl Into<String>) -> Self {
        Self {
            search_text: search_text.into(),
            property_name: property_name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), EditorError> {
        if self.search_text.is_empty() {
            return Err(EditorError::InvalidRequest(format!(
                "empty search text for property '{}'",
                self.property_name
            )));
        }
        if self.property_name.is_empty() {
            return Err(EditorError::InvalidRequest(format!(
                "empty property name for search text '{}'",
                self.search_text
            )));
        }
        Ok(())
    }
}

/// Replacements made in one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCount {
    pub stream: StreamRef,
    pub replacements: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub request: SubstitutionRequest,

    /// Property the fields are bound to (existing spelling if reused)
    pub property: PropertyBinding,

    /// Whether this request created the property
    pub created: bool,

    /// Per-stream counts, in visit order, for every stream that exists
    pub streams: Vec<StreamCount>,
}

impl RequestOutcome {
    pub fn total(&self) -> usize {
        self.streams.iter().map(|s| s.replacements).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionReport {
    pub outcomes: Vec<RequestOutcome>,
}

impl SubstitutionReport {
    pub fn total(&self) -> usize {
        self.outcomes.iter().map(RequestOutcome::total).sum()
    }

    pub fn properties_created(&self) -> usize {
        self.outcomes.iter().filter(|o| o.created).count()
    }
}

/// Every stream slot in visit order. Slots may not exist in the document.
pub fn stream_order<D: HostDocument + ?Sized>(doc: &D) -> Vec<StreamRef> {
    let mut streams = vec![StreamRef::Body];
    for section in 0..doc.section_count() {
        for kind in HeaderFooterKind::ALL {
            streams.push(StreamRef::Header { section, kind });
        }
        for kind in HeaderFooterKind::ALL {
            streams.push(StreamRef::Footer { section, kind });
        }
    }
    streams
}

/// Find the property case-insensitively, or create it with its own name as
/// the value.
pub fn resolve_property<D: HostDocument + ?Sized>(
    doc: &mut D,
    name: &str,
) -> Result<(PropertyBinding, bool), EditorError> {
    if let Some(existing) = doc.find_property(name) {
        info!("Document property '{}' already exists", existing.name);
        return Ok((existing, false));
    }

    let created = doc.create_property(name, name)?;
    info!("Document property '{}' created with value '{}'", created.name, created.value);
    Ok((created, true))
}

/// Replace every occurrence of `search` in one stream with a field bound to
/// `property`. Returns the number of replacements.
pub fn replace_in_stream<D: HostDocument + ?Sized>(
    doc: &mut D,
    stream: &StreamRef,
    search: &str,
    property: &str,
) -> Result<usize, EditorError> {
    let search_len = search.chars().count();
    let mut cursor = 0;
    let mut replacements = 0;

    while let Some(at) = doc.find(stream, search, cursor)? {
        debug!("Found '{}' at {} in {}", search, at, stream);
        doc.delete_range(stream, at, at + search_len)?;
        cursor = doc.insert_field(stream, at, FieldKind::DocProperty, property)?;
        replacements += 1;
    }

    Ok(replacements)
}

/// Apply every request, in order, to every stream of the document.
///
/// All requests are validated before the document is touched.
pub fn substitute<D: HostDocument + ?Sized>(
    doc: &mut D,
    requests: &[SubstitutionRequest],
) -> Result<SubstitutionReport, EditorError> {
    for request in requests {
        request.validate()?;
    }

    let mut report = SubstitutionReport::default();
    for request in requests {
        let (property, created) = resolve_property(doc, &request.property_name)?;

        let mut streams = Vec::new();
        for stream in stream_order(doc) {
            match replace_in_stream(doc, &stream, &request.search_text, &property.name) {
                Ok(replacements) => {
                    debug!("{} replacement(s) in {}", replacements, stream);
                    streams.push(StreamCount { stream, replacements });
                }
                Err(EditorError::StreamAccess(_)) => {}
                Err(e) => return Err(e),
            }
        }

        let outcome = RequestOutcome {
            request: request.clone(),
            property,
            created,
            streams,
        };
        if outcome.total() > 0 {
            info!(
                "Replaced {} instance(s) of '{}' with document property field '{}'",
                outcome.total(),
                request.search_text,
                outcome.property.name
            );
        } else {
            info!("No instances of '{}' found in the document", request.search_text);
        }
        report.outcomes.push(outcome);
    }

    Ok(report)
}
