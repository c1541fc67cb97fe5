//! # Stream Edits
//!
//! Primitive content mutations on a [`DocumentContent`].
//!
//! ## Design Principles
//!
//! 1. **Validated**: every edit checks its stream and offsets before touching content
//! 2. **Minimal**: only the two edits the substitution engine needs
//! 3. **Offset-exact**: a field occupies exactly one offset
//!
//! Anchors (named regions, edit grants) are kept in step by the
//! [`PostEffectEngine`](crate::PostEffectEngine), not here.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::{DocumentContent, Field};
use crate::host::{HostError, StreamRef};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Edit {
    /// Remove `[start, end)` from a stream
    DeleteRange {
        stream: StreamRef,
        start: usize,
        end: usize,
    },

    /// Insert a one-offset field at `at`
    InsertField {
        stream: StreamRef,
        at: usize,
        field: Field,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Stream not found: {0}")]
    StreamNotFound(StreamRef),

    #[error("Offsets [{start}, {end}) out of bounds for {stream} (length {len})")]
    OutOfBounds {
        stream: StreamRef,
        start: usize,
        end: usize,
        len: usize,
    },
}

impl From<EditError> for HostError {
    fn from(e: EditError) -> Self {
        match e {
            EditError::StreamNotFound(stream) => HostError::StreamUnavailable(stream),
            EditError::OutOfBounds { stream, start, end, len } => {
                HostError::OutOfBounds { stream, start, end, len }
            }
        }
    }
}

impl Edit {
    pub fn stream(&self) -> &StreamRef {
        match self {
            Edit::DeleteRange { stream, .. } | Edit::InsertField { stream, .. } => stream,
        }
    }

    /// Apply edit to content with validation
    pub fn apply(&self, content: &mut DocumentContent) -> Result<(), EditError> {
        self.validate(content)?;

        let text = content
            .stream_mut(self.stream())
            .ok_or_else(|| EditError::StreamNotFound(self.stream().clone()))?;

        match self {
            Edit::DeleteRange { start, end, .. } => text.delete(*start, *end),
            Edit::InsertField { at, field, .. } => text.insert_field(*at, field.clone()),
        }

        Ok(())
    }

    /// Validate without applying
    pub fn validate(&self, content: &DocumentContent) -> Result<(), EditError> {
        let stream = self.stream();
        let len = content
            .stream(stream)
            .ok_or_else(|| EditError::StreamNotFound(stream.clone()))?
            .len();

        let (start, end) = match self {
            Edit::DeleteRange { start, end, .. } => (*start, *end),
            Edit::InsertField { at, .. } => (*at, *at),
        };

        if start > end || end > len {
            return Err(EditError::OutOfBounds {
                stream: stream.clone(),
                start,
                end,
                len,
            });
        }

        Ok(())
    }
}
