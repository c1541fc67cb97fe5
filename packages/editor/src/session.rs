//! # Document Session
//!
//! Owns one opened document for the length of a pass.
//!
//! The document is closed on every exit path: explicitly through
//! [`DocumentSession::close`], or by `Drop` when a pass bails out early with
//! `?`. Saving is always an explicit step, so a failed pass leaves the source
//! file untouched.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::host::{DocumentHost, HostError};

/// One client's hold on an opened document
pub struct DocumentSession<'h, H: DocumentHost> {
    host: &'h mut H,

    /// `None` only after the document has been handed back to the host
    document: Option<H::Document>,

    /// Path the document was opened from
    pub source: PathBuf,
}

impl<'h, H: DocumentHost> DocumentSession<'h, H> {
    pub fn open(host: &'h mut H, path: &Path) -> Result<Self, HostError> {
        let document = host.open(path)?;
        debug!("Session opened for {}", path.display());
        Ok(Self {
            host,
            document: Some(document),
            source: path.to_path_buf(),
        })
    }

    pub fn document(&self) -> &H::Document {
        match &self.document {
            Some(document) => document,
            None => unreachable!("document is only taken when the session ends"),
        }
    }

    pub fn document_mut(&mut self) -> &mut H::Document {
        match &mut self.document {
            Some(document) => document,
            None => unreachable!("document is only taken when the session ends"),
        }
    }

    /// Save to `path` through the host. The session stays open.
    pub fn save_as(&mut self, path: &Path) -> Result<(), HostError> {
        let Some(document) = self.document.as_mut() else {
            unreachable!("document is only taken when the session ends");
        };
        self.host.save(document, path)?;
        info!("Saved {}", path.display());
        Ok(())
    }

    /// Hand the document back to the host.
    pub fn close(mut self) -> Result<(), HostError> {
        match self.document.take() {
            Some(document) => self.host.close(document),
            None => Ok(()),
        }
    }
}

impl<H: DocumentHost> Drop for DocumentSession<'_, H> {
    fn drop(&mut self) {
        if let Some(document) = self.document.take() {
            debug!("Closing {} on drop", self.source.display());
            if let Err(e) = self.host.close(document) {
                warn!("Failed to close {}: {}", self.source.display(), e);
            }
        }
    }
}

/// Open `path`, run `f` on the session, then close it whatever `f` returned.
pub fn with_session<H, T, E, F>(host: &mut H, path: &Path, f: F) -> Result<T, E>
where
    H: DocumentHost,
    E: From<HostError>,
    F: FnOnce(&mut DocumentSession<'_, H>) -> Result<T, E>,
{
    let mut session = DocumentSession::open(host, path)?;
    let outcome = f(&mut session);
    match outcome {
        Ok(value) => {
            session.close()?;
            Ok(value)
        }
        Err(e) => {
            // Drop closes the document; the pass error wins over a close error.
            drop(session);
            Err(e)
        }
    }
}
