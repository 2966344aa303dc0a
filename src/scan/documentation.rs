//! Full-view data-documentation results.

use super::envelope::{ResourceKind, ScanEnvelope};
use crate::error::{Result, ResultExt as _, ScanError};
use serde::{Deserialize, Serialize};

// Segment positions in //bigquery.googleapis.com/projects/{p}/datasets/{d}/tables/{t}
const FQN_PROJECT_INDEX: usize = 4;
const FQN_DATASET_INDEX: usize = 6;
const FQN_TABLE_INDEX: usize = 8;

/// A documented SQL query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub sql: String,
    #[serde(default)]
    pub description: String,
}

/// A documented column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One side of a relationship: a table and its ordered column paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaPaths {
    pub table_fqn: String,
    pub paths: Vec<String>,
}

/// A join relationship reported by a dataset scan.
///
/// `left.paths[i]` joins to `right.paths[i]`; the pairs are combined with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRelationship {
    #[serde(rename = "leftSchemaPaths")]
    pub left: SchemaPaths,
    #[serde(rename = "rightSchemaPaths")]
    pub right: SchemaPaths,
    #[serde(default)]
    pub sources: Vec<String>,
    pub confidence_score: f64,
    /// e.g. `SCHEMA_JOIN`
    #[serde(rename = "type")]
    pub kind: String,
}

/// Documentation produced for a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDocumentationResult {
    /// `project.dataset.table`
    pub fully_qualified_table_name: String,
    pub overview: String,
    pub fields: Vec<SchemaField>,
    pub queries: Vec<Query>,
}

/// Documentation produced for a dataset as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetDocumentationResult {
    pub overview: String,
    pub queries: Vec<Query>,
    pub relationships: Vec<SchemaRelationship>,
}

/// Hydrated table scan.
#[derive(Debug, Clone, PartialEq)]
pub struct TableScan {
    pub envelope: ScanEnvelope,
    pub result: TableDocumentationResult,
}

/// Hydrated dataset scan.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetScan {
    pub envelope: ScanEnvelope,
    pub result: DatasetDocumentationResult,
}

/// A hydrated data-documentation scan, by scanned resource.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentationScan {
    Table(TableScan),
    Dataset(DatasetScan),
}

impl DocumentationScan {
    /// Parse the full view of `listed`, choosing the shape from its resource kind.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Validation`] when the payload does not match the
    /// expected shape, or describes a different scan than `listed`.
    pub fn from_full_view(listed: &ScanEnvelope, json: &str) -> Result<Self> {
        let scan = match listed.resource_kind {
            ResourceKind::Table => {
                let wire: TableScanWire = serde_json::from_str(json)
                    .with_context(|| format!("full view of table scan {}", listed.name))?;
                Self::Table(wire.into_scan()?)
            }
            ResourceKind::Dataset => {
                let wire: DatasetScanWire = serde_json::from_str(json)
                    .with_context(|| format!("full view of dataset scan {}", listed.name))?;
                Self::Dataset(wire.into_scan())
            }
        };

        let hydrated = scan.envelope();
        if hydrated.name != listed.name || hydrated.resource() != listed.resource() {
            return Err(ScanError::Validation(format!(
                "full view for {} describes {} ({})",
                listed.name,
                hydrated.name,
                hydrated.resource()
            )));
        }

        Ok(scan)
    }

    pub fn envelope(&self) -> &ScanEnvelope {
        match self {
            Self::Table(scan) => &scan.envelope,
            Self::Dataset(scan) => &scan.envelope,
        }
    }
}

/// `project.dataset.table` for a BigQuery table resource path.
///
/// # Errors
///
/// Returns [`ScanError::Validation`] when the path is too short.
pub fn full_table_name(resource: &str) -> Result<String> {
    let parts: Vec<&str> = resource.split('/').collect();
    match (
        parts.get(FQN_PROJECT_INDEX),
        parts.get(FQN_DATASET_INDEX),
        parts.get(FQN_TABLE_INDEX),
    ) {
        (Some(project), Some(dataset), Some(table)) => Ok(format!("{project}.{dataset}.{table}")),
        _ => Err(ScanError::Validation(format!(
            "cannot derive a table name from resource '{resource}'"
        ))),
    }
}

#[derive(Deserialize)]
struct SchemaWire {
    fields: Vec<SchemaField>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableResultWire {
    overview: String,
    schema: SchemaWire,
    #[serde(default)]
    queries: Vec<Query>,
}

// Older scans put the table result directly under dataDocumentationResult,
// newer ones nest it under tableResult.
#[derive(Deserialize)]
#[serde(untagged)]
enum TableDocumentationWire {
    #[serde(rename_all = "camelCase")]
    Nested { table_result: TableResultWire },
    Flat(TableResultWire),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableScanWire {
    #[serde(flatten)]
    envelope: ScanEnvelope,
    data_documentation_result: TableDocumentationWire,
}

impl TableScanWire {
    fn into_scan(self) -> Result<TableScan> {
        let result = match self.data_documentation_result {
            TableDocumentationWire::Nested { table_result } => table_result,
            TableDocumentationWire::Flat(result) => result,
        };
        Ok(TableScan {
            result: TableDocumentationResult {
                fully_qualified_table_name: full_table_name(self.envelope.resource())?,
                overview: result.overview,
                fields: result.schema.fields,
                queries: result.queries,
            },
            envelope: self.envelope,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetResultWire {
    overview: String,
    #[serde(default)]
    schema_relationships: Vec<SchemaRelationship>,
    #[serde(default)]
    queries: Vec<Query>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetDocumentationWire {
    #[serde(default)]
    queries: Vec<Query>,
    dataset_result: DatasetResultWire,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetScanWire {
    #[serde(flatten)]
    envelope: ScanEnvelope,
    data_documentation_result: DatasetDocumentationWire,
}

impl DatasetScanWire {
    fn into_scan(self) -> DatasetScan {
        let doc = self.data_documentation_result;
        // Top-level queries win; some scan versions only fill the nested list.
        let queries = if doc.queries.is_empty() {
            doc.dataset_result.queries
        } else {
            doc.queries
        };
        DatasetScan {
            envelope: self.envelope,
            result: DatasetDocumentationResult {
                overview: doc.dataset_result.overview,
                queries,
                relationships: doc.dataset_result.schema_relationships,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    const TABLE_RESOURCE: &str = "//bigquery.googleapis.com/projects/p/datasets/shop/tables/orders";
    const DATASET_RESOURCE: &str = "//bigquery.googleapis.com/projects/p/datasets/shop";

    fn base(name: &str, resource: &str) -> Value {
        json!({
            "name": name,
            "uid": "0b6f7a39-5a2c-4c1e-8d55-3c1f0e9d2b11",
            "state": "ACTIVE",
            "createTime": "2025-01-10T12:00:00Z",
            "updateTime": "2025-02-10T12:00:00Z",
            "type": "DATA_DOCUMENTATION",
            "data": { "resource": resource }
        })
    }

    fn with_result(mut scan: Value, result: Value) -> String {
        scan.as_object_mut()
            .unwrap()
            .insert("dataDocumentationResult".to_owned(), result);
        scan.to_string()
    }

    fn listed(name: &str, resource: &str) -> ScanEnvelope {
        ScanEnvelope::from_value(base(name, resource)).unwrap()
    }

    #[test]
    fn test_table_full_view_without_queries() {
        let json = with_result(
            base("scans/orders", TABLE_RESOURCE),
            json!({
                "overview": "One row per order.",
                "schema": { "fields": [
                    { "name": "order_id", "description": "Primary key" },
                    { "name": "user_id", "description": "Buyer" }
                ]}
            }),
        );

        let scan = DocumentationScan::from_full_view(&listed("scans/orders", TABLE_RESOURCE), &json)
            .unwrap();
        let DocumentationScan::Table(table) = scan else {
            panic!("expected a table scan");
        };
        assert_eq!(table.result.fully_qualified_table_name, "p.shop.orders");
        assert_eq!(table.result.fields.len(), 2);
        assert_eq!(table.result.fields[0].name, "order_id");
        assert!(table.result.queries.is_empty());
    }

    #[test]
    fn test_table_full_view_nested_result() {
        let json = with_result(
            base("scans/orders", TABLE_RESOURCE),
            json!({ "tableResult": {
                "overview": "Orders",
                "schema": { "fields": [] },
                "queries": [{ "sql": "SELECT 1", "description": "smoke" }]
            }}),
        );

        let scan = DocumentationScan::from_full_view(&listed("scans/orders", TABLE_RESOURCE), &json)
            .unwrap();
        let DocumentationScan::Table(table) = scan else {
            panic!("expected a table scan");
        };
        assert_eq!(table.result.queries.len(), 1);
    }

    #[test]
    fn test_dataset_full_view() {
        let json = with_result(
            base("scans/shop", DATASET_RESOURCE),
            json!({
                "queries": [{ "sql": "SELECT COUNT(*) FROM orders", "description": "volume" }],
                "datasetResult": {
                    "overview": "E-commerce data.",
                    "tableResults": [],
                    "schemaRelationships": [{
                        "leftSchemaPaths": { "tableFqn": "x/tables/orders", "paths": ["user_id"] },
                        "rightSchemaPaths": { "tableFqn": "x/tables/users", "paths": ["id"] },
                        "sources": ["QUERY_HISTORY"],
                        "type": "SCHEMA_JOIN",
                        "confidenceScore": 0.9
                    }]
                }
            }),
        );

        let scan = DocumentationScan::from_full_view(&listed("scans/shop", DATASET_RESOURCE), &json)
            .unwrap();
        let DocumentationScan::Dataset(dataset) = scan else {
            panic!("expected a dataset scan");
        };
        assert_eq!(dataset.result.overview, "E-commerce data.");
        assert_eq!(dataset.result.queries.len(), 1);
        assert_eq!(dataset.result.relationships.len(), 1);
        assert_eq!(dataset.result.relationships[0].kind, "SCHEMA_JOIN");
    }

    #[test]
    fn test_dataset_without_relationships_defaults_empty() {
        let json = with_result(
            base("scans/shop", DATASET_RESOURCE),
            json!({ "datasetResult": { "overview": "Empty" } }),
        );
        let scan = DocumentationScan::from_full_view(&listed("scans/shop", DATASET_RESOURCE), &json)
            .unwrap();
        let DocumentationScan::Dataset(dataset) = scan else {
            panic!("expected a dataset scan");
        };
        assert!(dataset.result.relationships.is_empty());
        assert!(dataset.result.queries.is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_validation_error() {
        let json = with_result(base("scans/orders", TABLE_RESOURCE), json!({ "overview": 7 }));
        let err = DocumentationScan::from_full_view(&listed("scans/orders", TABLE_RESOURCE), &json)
            .unwrap_err();
        assert!(matches!(err, ScanError::Validation(_)));
        assert!(err.to_string().contains("scans/orders"));
    }

    #[test]
    fn test_mismatched_scan_is_rejected() {
        let json = with_result(
            base("scans/other", DATASET_RESOURCE),
            json!({ "datasetResult": { "overview": "x" } }),
        );
        let err = DocumentationScan::from_full_view(&listed("scans/shop", DATASET_RESOURCE), &json)
            .unwrap_err();
        assert!(matches!(err, ScanError::Validation(_)));
    }

    #[test]
    fn test_full_table_name() {
        assert_eq!(full_table_name(TABLE_RESOURCE).unwrap(), "p.shop.orders");
        assert!(full_table_name(DATASET_RESOURCE).is_err());
    }
}
