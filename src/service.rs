//! External collaborators consumed by the pipeline.
//!
//! The pipeline only talks to the outside world through two traits:
//!
//! - [`ScanService`]: the Dataplex data-scan API (listing and full views)
//! - [`Warehouse`]: BigQuery catalog lookups (location, live tables, DDL, counts)
//!
//! [`DataplexClient`] and [`BigQueryClient`] are the HTTP implementations.
//! Tests substitute in-memory fakes.

pub mod bigquery;
pub mod dataplex;
pub mod http;
mod paging;

pub use bigquery::BigQueryClient;
pub use dataplex::DataplexClient;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;

/// Row and byte counts of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub row_count: u64,
    pub size_bytes: u64,
}

/// Dataplex data-scan retrieval.
pub trait ScanService: Send + Sync {
    /// All scans in `project_id`/`location`, as a `{"dataScans": [...]}` document.
    fn list_scans(
        &self,
        project_id: &str,
        location: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// One scan by resource name (`projects/{p}/locations/{l}/dataScans/{id}`).
    fn get_scan(
        &self,
        resource_name: &str,
        full_view: bool,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Read-only BigQuery catalog lookups.
pub trait Warehouse: Send + Sync {
    /// Location (e.g. `US`, `europe-west2`) the dataset lives in.
    fn dataset_location(
        &self,
        project_id: &str,
        dataset: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Short names of the tables currently in the dataset.
    fn list_tables(
        &self,
        project_id: &str,
        dataset: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// DDL text keyed by `project.dataset.table`.
    fn table_ddls(
        &self,
        project_id: &str,
        dataset: &str,
    ) -> impl Future<Output = Result<BTreeMap<String, String>>> + Send;

    /// Row/byte counts keyed by `project.dataset.table`.
    fn table_counts(
        &self,
        project_id: &str,
        dataset: &str,
    ) -> impl Future<Output = Result<BTreeMap<String, TableCounts>>> + Send;
}
