//! Assembling the final dataset view.

use super::options::DatasetTarget;
use super::relationships::resolve_relationships;
use crate::ddl::{Optimization, extract_optimization_columns};
use crate::error::{Result, ScanError};
use crate::policy::PolicyFilter;
use crate::scan::{DatasetScan, DocumentationScan, TableScan};
use crate::service::TableCounts;
use crate::view::{DatasetView, TableView};
use std::collections::BTreeMap;

/// Optional catalog lookups merged into each table view.
///
/// `None` means the lookup was not requested; the matching output fields are
/// then left empty for every table.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub ddls: Option<BTreeMap<String, String>>,
    pub counts: Option<BTreeMap<String, TableCounts>>,
}

/// Build the output view of one table scan.
pub fn table_view(scan: &TableScan, enrichment: &Enrichment) -> TableView {
    let name = scan.result.fully_qualified_table_name.clone();

    let ddl = enrichment.ddls.as_ref().and_then(|ddls| {
        let ddl = ddls.get(&name).cloned();
        if ddl.is_none() {
            tracing::warn!(table = %name, "no DDL returned for table");
        }
        ddl
    });
    let partition_columns = ddl
        .as_deref()
        .map(|ddl| extract_optimization_columns(ddl, Optimization::Partition));
    let cluster_columns = ddl
        .as_deref()
        .map(|ddl| extract_optimization_columns(ddl, Optimization::Cluster));

    let counts = enrichment
        .counts
        .as_ref()
        .and_then(|counts| counts.get(&name).copied());

    TableView {
        overview: scan.result.overview.clone(),
        fields: scan.result.fields.clone(),
        queries: scan.result.queries.clone(),
        ddl,
        row_count: counts.map(|c| c.row_count),
        size_bytes: counts.map(|c| c.size_bytes),
        partition_columns,
        cluster_columns,
        name,
    }
}

/// Combine hydrated scans into a [`DatasetView`].
///
/// Table views keep the order of `scans`. Relationships come from the
/// dataset scan and are filtered by `policy` only.
///
/// # Errors
///
/// Returns [`ScanError::NotFound`] when `scans` holds no dataset scan, and
/// propagates relationship validation failures.
pub fn aggregate(
    target: &DatasetTarget,
    location: &str,
    scans: &[DocumentationScan],
    policy: &PolicyFilter,
    enrichment: &Enrichment,
) -> Result<DatasetView> {
    let mut dataset: Option<&DatasetScan> = None;
    let mut tables = Vec::new();

    for scan in scans {
        match scan {
            DocumentationScan::Dataset(found) => {
                if let Some(first) = dataset {
                    tracing::warn!(
                        kept = %first.envelope.name,
                        ignored = %found.envelope.name,
                        "more than one dataset scan"
                    );
                } else {
                    dataset = Some(found);
                }
            }
            DocumentationScan::Table(table) => tables.push(table_view(table, enrichment)),
        }
    }

    let dataset = dataset.ok_or_else(|| {
        ScanError::NotFound(format!(
            "no documentation scan for dataset {}.{}",
            target.project_id, target.dataset
        ))
    })?;

    Ok(DatasetView {
        project_id: target.project_id.clone(),
        dataset_name: target.dataset.clone(),
        dataset_location: location.to_owned(),
        dataset_description: dataset.result.overview.clone(),
        dataset_relationships: resolve_relationships(
            &dataset.result.relationships,
            target,
            policy,
        )?,
        dataset_queries: dataset.result.queries.clone(),
        dataset_tables: tables,
    })
}
