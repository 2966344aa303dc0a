//! Live table inventory of the target dataset.

use super::options::DatasetTarget;
use crate::error::Result;
use crate::service::Warehouse;
use std::collections::BTreeSet;

/// Short names of the tables that exist in the dataset right now.
///
/// The documentation service keeps scans for tables that were since dropped
/// or renamed; this set is what table scans are checked against.
///
/// # Errors
///
/// Propagates the catalog lookup failure.
pub async fn live_inventory<W: Warehouse>(
    warehouse: &W,
    target: &DatasetTarget,
) -> Result<BTreeSet<String>> {
    let tables: BTreeSet<String> = warehouse
        .list_tables(&target.project_id, &target.dataset)
        .await?
        .into_iter()
        .collect();
    tracing::debug!(count = tables.len(), "live tables in dataset");
    Ok(tables)
}
