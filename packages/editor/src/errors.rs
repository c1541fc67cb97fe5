//! Error types for the editor

use thiserror::Error;

use crate::host::{HostError, StreamRef};
use crate::interval::IntervalError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Invalid interval: {0}")]
    Interval(#[from] IntervalError),

    #[error("Invalid substitution request: {0}")]
    InvalidRequest(String),

    #[error("Invalid tag pair: {0}")]
    InvalidTagPair(String),

    #[error("Named region not found: {0}")]
    RegionNotFound(String),

    #[error("Stream unavailable: {0}")]
    StreamAccess(StreamRef),

    #[error("Host error: {0}")]
    Host(HostError),
}

impl EditorError {
    /// Conditions a pass logs and skips instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EditorError::RegionNotFound(_) | EditorError::StreamAccess(_)
        )
    }
}

impl From<HostError> for EditorError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::StreamUnavailable(stream) => EditorError::StreamAccess(stream),
            other => EditorError::Host(other),
        }
    }
}
