//! Selecting the scans that document the requested dataset.

use super::options::DatasetTarget;
use crate::error::Result;
use crate::policy::PolicyFilter;
use crate::scan::{ScanEnvelope, ScanType};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Whether `resource` is the dataset itself or one of its tables.
///
/// Matching is on exact path text, so `shop` never matches `shop_eu` or
/// `workshop`.
pub fn resource_belongs_to(resource: &str, target: &DatasetTarget) -> bool {
    resource.ends_with(&target.dataset_suffix()) || resource.contains(&target.table_marker())
}

fn raw_resource(entry: &Value) -> Option<&str> {
    entry.get("data")?.get("resource")?.as_str()
}

fn is_raw_documentation(entry: &Value) -> bool {
    ScanType::of_entry(entry).is_some_and(ScanType::is_documentation)
}

/// Pick the documentation scans of `target` out of a raw listing.
///
/// Table scans must also pass `policy` and name a table present in the live
/// `inventory`; dataset scans are always kept. When several scans cover the
/// same resource the one with the latest `updateTime` wins. Output follows
/// listing order.
///
/// # Errors
///
/// Returns [`crate::error::ScanError::Validation`] if a candidate entry
/// cannot be parsed; the whole run is aborted rather than skipping it.
pub fn classify_scans(
    listing: Vec<Value>,
    target: &DatasetTarget,
    policy: &PolicyFilter,
    inventory: &BTreeSet<String>,
) -> Result<Vec<ScanEnvelope>> {
    let mut selected: Vec<ScanEnvelope> = Vec::new();
    let mut by_resource: BTreeMap<String, usize> = BTreeMap::new();

    for entry in listing {
        let Some(resource) = raw_resource(&entry) else {
            continue;
        };
        if !is_raw_documentation(&entry) || !resource_belongs_to(resource, target) {
            continue;
        }

        let scan = ScanEnvelope::from_value(entry)?;

        if scan.is_for_table() {
            let table = scan.short_name();
            if !policy.is_allowed(table) {
                tracing::debug!(%table, scan = %scan.name, "table excluded by policy");
                continue;
            }
            if !inventory.contains(table) {
                tracing::warn!(
                    %table,
                    scan = %scan.name,
                    "skipping scan for table no longer in dataset"
                );
                continue;
            }
        }

        match by_resource.get(scan.resource()).copied() {
            Some(index) => {
                let Some(existing) = selected.get_mut(index) else {
                    continue;
                };
                let newer = scan.update_time > existing.update_time;
                let kept = if newer { &scan.name } else { &existing.name };
                tracing::debug!(
                    resource = %scan.resource(),
                    %kept,
                    "duplicate documentation scans for resource"
                );
                if newer {
                    *existing = scan;
                }
            }
            None => {
                by_resource.insert(scan.resource().to_owned(), selected.len());
                selected.push(scan);
            }
        }
    }

    Ok(selected)
}
