//! Allow/block policy over short table names.
//!
//! A table passes the filter iff the allow set is empty or contains it, and
//! the block set does not contain it. The two sets are disjoint by
//! construction.

use crate::error::{Result, ScanError};
use serde::Serialize;
use std::collections::BTreeSet;

/// Mutually exclusive allow-list / block-list over short table names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyFilter {
    allow: BTreeSet<String>,
    block: BTreeSet<String>,
}

impl PolicyFilter {
    /// Filter that lets every table through.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Build a filter from the two lists.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::PolicyConfig`] naming the overlapping entries when
    /// a table appears in both lists.
    pub fn new<A, B>(allow: A, block: B) -> Result<Self>
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        let allow: BTreeSet<String> = allow.into_iter().map(Into::into).collect();
        let block: BTreeSet<String> = block.into_iter().map(Into::into).collect();

        let overlap: BTreeSet<String> = allow.intersection(&block).cloned().collect();
        if !overlap.is_empty() {
            return Err(ScanError::overlapping_lists(&overlap));
        }

        Ok(Self { allow, block })
    }

    /// Whether `short_name` should be surfaced.
    pub fn is_allowed(&self, short_name: &str) -> bool {
        let allowed = self.allow.is_empty() || self.allow.contains(short_name);
        allowed && !self.block.contains(short_name)
    }
}

/// Last `/`-separated segment of a resource path.
pub fn short_name(resource: &str) -> &str {
    resource.rsplit('/').next().unwrap_or(resource)
}

/// Last `.`-separated segment of a `project.dataset.table` name.
pub fn short_name_of_fqn(fqn: &str) -> &str {
    fqn.rsplit('.').next().unwrap_or(fqn)
}
