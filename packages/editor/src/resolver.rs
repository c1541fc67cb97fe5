//! # Editable-Region Resolver
//!
//! Turns a [`LockSpec`] into the spans that should be granted edit access.
//!
//! Every named region not explicitly kept locked becomes editable over its
//! own extent. On each protected stream, everything outside the kept regions
//! is editable too, so the only content left locked is the kept regions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::EditorError;
use crate::host::{HostDocument, NamedRegion, StreamRef};
use crate::interval::{self, Interval};

/// A span granted edit permission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EditableInterval {
    pub stream: StreamRef,
    pub start: usize,
    pub end: usize,
}

impl EditableInterval {
    pub fn new(stream: StreamRef, start: usize, end: usize) -> Self {
        Self { stream, start, end }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// Snapshot of everything region resolution needs.
///
/// Only valid until the next mutation of any stream it mentions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockSpec {
    /// Streams whose unnamed content is resolved, with their current lengths
    pub streams_to_protect: BTreeMap<StreamRef, usize>,

    pub all_regions: Vec<NamedRegion>,

    /// Region names that stay locked
    pub keep_locked: BTreeSet<String>,
}

impl LockSpec {
    /// Capture regions and stream lengths from a live document. Streams the
    /// document does not have are skipped.
    pub fn capture<D: HostDocument + ?Sized>(
        doc: &D,
        streams: &[StreamRef],
        keep_locked: &BTreeSet<String>,
    ) -> Result<Self, EditorError> {
        let mut streams_to_protect = BTreeMap::new();
        for stream in streams {
            match doc.stream_len(stream).map_err(EditorError::from) {
                Ok(len) => {
                    streams_to_protect.insert(stream.clone(), len);
                }
                Err(EditorError::StreamAccess(stream)) => {
                    debug!("Skipping unavailable stream {}", stream);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self {
            streams_to_protect,
            all_regions: doc.named_regions(),
            keep_locked: keep_locked.clone(),
        })
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Regions not kept locked, each granted over its whole extent
    pub released: Vec<(String, EditableInterval)>,

    /// Unnamed content outside every kept region on a protected stream
    pub gaps: Vec<EditableInterval>,

    /// Names of regions that stay locked
    pub kept: Vec<String>,

    /// Names asked to stay locked that the document does not have
    pub missing: Vec<String>,
}

impl Resolution {
    /// Every editable span in grant order: released regions, then gaps.
    pub fn editable(&self) -> impl Iterator<Item = &EditableInterval> {
        self.released
            .iter()
            .map(|(_, interval)| interval)
            .chain(self.gaps.iter())
    }

    /// Editable spans merged per stream.
    pub fn coalesced(&self) -> Result<Vec<EditableInterval>, EditorError> {
        let all: Vec<EditableInterval> = self.editable().cloned().collect();
        coalesce(&all)
    }
}

/// Merge overlapping or touching spans on the same stream.
pub fn coalesce(intervals: &[EditableInterval]) -> Result<Vec<EditableInterval>, EditorError> {
    let mut by_stream: BTreeMap<&StreamRef, Vec<Interval>> = BTreeMap::new();
    for editable in intervals {
        by_stream
            .entry(&editable.stream)
            .or_default()
            .push(editable.interval());
    }

    let mut merged = Vec::new();
    for (stream, spans) in by_stream {
        for span in interval::merge(&spans)? {
            merged.push(EditableInterval::new(stream.clone(), span.start, span.end));
        }
    }
    Ok(merged)
}

/// Compute every span that should be granted edit access.
pub fn resolve(spec: &LockSpec) -> Result<Resolution, EditorError> {
    let mut resolution = Resolution::default();
    let mut kept_extents: BTreeMap<&StreamRef, Vec<Interval>> = BTreeMap::new();

    for region in &spec.all_regions {
        if spec.keep_locked.contains(&region.name) {
            resolution.kept.push(region.name.clone());
            kept_extents
                .entry(&region.stream)
                .or_default()
                .push(Interval::new(region.start, region.end));
        } else if region.start < region.end {
            resolution.released.push((
                region.name.clone(),
                EditableInterval::new(region.stream.clone(), region.start, region.end),
            ));
        } else {
            debug!("Region '{}' is empty; nothing to release", region.name);
        }
    }

    for name in &spec.keep_locked {
        if !spec.all_regions.iter().any(|r| &r.name == name) {
            warn!("{}", EditorError::RegionNotFound(name.clone()));
            resolution.missing.push(name.clone());
        }
    }

    for (stream, len) in &spec.streams_to_protect {
        let kept = kept_extents.get(stream).map(Vec::as_slice).unwrap_or(&[]);
        for gap in interval::complement(Interval::new(0, *len), kept)? {
            resolution
                .gaps
                .push(EditableInterval::new(stream.clone(), gap.start, gap.end));
        }
    }

    Ok(resolution)
}
