//! # Tag-Span Unlocker
//!
//! Finds text wrapped in a start/end tag pair, e.g. `[sgfs]...[sgfe]`. The
//! interior of every pair is editable whatever the region lock says; the
//! tags themselves are not.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::EditorError;
use crate::host::{HostDocument, StreamRef};
use crate::resolver::EditableInterval;

/// Start/end sentinel strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPair {
    pub open: String,
    pub close: String,
}

impl TagPair {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self, EditorError> {
        let pair = Self {
            open: open.into(),
            close: close.into(),
        };
        pair.validate()?;
        Ok(pair)
    }

    /// Tags must be non-empty and distinct.
    pub fn validate(&self) -> Result<(), EditorError> {
        if self.open.is_empty() || self.close.is_empty() {
            return Err(EditorError::InvalidTagPair("tags must not be empty".to_string()));
        }
        if self.open == self.close {
            return Err(EditorError::InvalidTagPair(format!(
                "open and close tags are both '{}'",
                self.open
            )));
        }
        Ok(())
    }
}

/// Interior spans of every tag pair in `stream`, in document order.
///
/// Scanning stops at the first open tag with no close tag after it; pairs
/// further on are not reported.
pub fn find_unlock_spans<D: HostDocument + ?Sized>(
    doc: &D,
    stream: &StreamRef,
    tags: &TagPair,
) -> Result<Vec<EditableInterval>, EditorError> {
    tags.validate()?;

    let open_len = tags.open.chars().count();
    let close_len = tags.close.chars().count();

    let mut spans = Vec::new();
    let mut cursor = 0;
    while let Some(open_at) = doc.find(stream, &tags.open, cursor)? {
        let inner_start = open_at + open_len;
        let Some(close_at) = doc.find(stream, &tags.close, inner_start)? else {
            warn!(
                "Unterminated '{}' at {} in {}; no further tag pairs are scanned",
                tags.open, open_at, stream
            );
            break;
        };

        if close_at > inner_start {
            debug!("Found tag span [{}, {}) in {}", inner_start, close_at, stream);
            spans.push(EditableInterval::new(stream.clone(), inner_start, close_at));
        }
        cursor = close_at + close_len;
    }

    Ok(spans)
}
