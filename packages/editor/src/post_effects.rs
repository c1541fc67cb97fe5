//! # Post-Effect System
//!
//! Edits shift everything anchored downstream of them.
//!
//! When an [`Edit`] changes a stream's length, every stored offset in that
//! stream past the edit point is stale. Post-effects bring those anchors back
//! in line:
//! - Deleting a range → anchors past it move left, anchors inside collapse to its start
//! - Inserting a field → anchors past the insertion point move right by one
//!
//! Post-effects only ever touch anchors on the edited stream.

use std::collections::BTreeSet;

use crate::content::DocumentContent;
use crate::mutations::{Edit, EditError};

/// Post-effect run after an edit has been applied
pub trait PostEffect: std::fmt::Debug {
    fn apply(&self, edit: &Edit, content: &mut DocumentContent);
}

/// New `(start, end)` of an anchor after `edit`.
fn shift_span(edit: &Edit, start: usize, end: usize) -> (usize, usize) {
    match edit {
        Edit::DeleteRange { start: from, end: to, .. } => {
            let removed = to - from;
            let shift = |p: usize| {
                if p >= *to {
                    p - removed
                } else if p > *from {
                    *from
                } else {
                    p
                }
            };
            (shift(start), shift(end))
        }
        Edit::InsertField { at, .. } => {
            let was_empty = start == end;
            let start = if start > *at { start + 1 } else { start };
            // An end at the insertion point stays outside, unless the span
            // is empty there and the field fills it.
            let end = if end > *at || (was_empty && end == *at) {
                end + 1
            } else {
                end
            };
            (start, end)
        }
    }
}

/// Keep named region extents in step with their stream
#[derive(Debug)]
pub struct ShiftNamedRegions;

impl PostEffect for ShiftNamedRegions {
    fn apply(&self, edit: &Edit, content: &mut DocumentContent) {
        for region in content
            .regions
            .iter_mut()
            .filter(|r| &r.stream == edit.stream())
        {
            let (start, end) = shift_span(edit, region.start, region.end);
            region.start = start;
            region.end = end;
        }
    }
}

/// Keep edit grants in step with their stream; grants that collapse to
/// nothing are dropped.
#[derive(Debug)]
pub struct ShiftEditGrants;

impl PostEffect for ShiftEditGrants {
    fn apply(&self, edit: &Edit, content: &mut DocumentContent) {
        let grants = std::mem::take(&mut content.grants);
        content.grants = grants
            .into_iter()
            .filter_map(|mut grant| {
                if &grant.stream == edit.stream() {
                    let (start, end) = shift_span(edit, grant.start, grant.end);
                    grant.start = start;
                    grant.end = end;
                }
                (grant.start < grant.end).then_some(grant)
            })
            .collect::<BTreeSet<_>>();
    }
}

/// Post-effect engine that applies all registered effects
#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self {
            effects: vec![Box::new(ShiftNamedRegions), Box::new(ShiftEditGrants)],
        }
    }

    /// Apply an edit, then every post-effect
    pub fn apply_with_effects(&self, edit: &Edit, content: &mut DocumentContent) -> Result<(), EditError> {
        edit.apply(content)?;

        for effect in &self.effects {
            effect.apply(edit, content);
        }

        Ok(())
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}
