//! Typed models for Dataplex data scans.
//!
//! A scan listing entry is decoded into a [`ScanEnvelope`]; the full view of a
//! data-documentation scan is decoded into a [`DocumentationScan`], which is
//! either a table result or a dataset result depending on the scanned
//! resource.
//!
//! Resource paths look like:
//!
//! ```text
//! //bigquery.googleapis.com/projects/{project}/datasets/{dataset}
//! //bigquery.googleapis.com/projects/{project}/datasets/{dataset}/tables/{table}
//! ```

pub mod documentation;
pub mod envelope;

pub use documentation::{
    DatasetDocumentationResult, DatasetScan, DocumentationScan, Query, SchemaField, SchemaPaths,
    SchemaRelationship, TableDocumentationResult, TableScan, full_table_name,
};
pub use envelope::{
    ExecutionStatus, ResourceKind, ScanData, ScanEnvelope, ScanType, parse_listing,
    take_listing_entries,
};
