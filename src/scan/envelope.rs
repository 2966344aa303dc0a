//! Scan listing entries.

use crate::error::{Result, ResultExt as _, ScanError};
use crate::policy::short_name;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of analysis a scan performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanType {
    DataDocumentation,
    DataProfile,
    DataQuality,
}

impl ScanType {
    /// Decode the `type` field of a raw listing entry. Unknown types are `None`.
    pub fn of_entry(entry: &Value) -> Option<Self> {
        Self::deserialize(entry.get("type")?).ok()
    }

    pub fn is_documentation(self) -> bool {
        self == Self::DataDocumentation
    }
}

/// What the scanned resource is, derived from the second-to-last path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Table,
    Dataset,
}

impl ResourceKind {
    /// Classify `.../tables/{t}` as a table and `.../datasets/{d}` as a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Validation`] for any other shape.
    pub fn from_resource(resource: &str) -> Result<Self> {
        let collection = resource.rsplit('/').nth(1).unwrap_or_default();
        match collection.strip_suffix('s') {
            Some("table") => Ok(Self::Table),
            Some("dataset") => Ok(Self::Dataset),
            _ => Err(ScanError::Validation(format!(
                "scan resource '{resource}' is neither a table nor a dataset"
            ))),
        }
    }
}

/// `data` block of a scan: the scanned resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanData {
    pub resource: String,
}

/// Timestamps of the latest job run for a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatus {
    #[serde(default)]
    pub latest_job_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latest_job_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latest_job_create_time: Option<DateTime<Utc>>,
}

/// Typed summary of one scan listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawEnvelope")]
pub struct ScanEnvelope {
    /// Full resource name: `projects/{p}/locations/{l}/dataScans/{id}`.
    pub name: String,
    pub uid: Uuid,
    pub state: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub scan_type: ScanType,
    pub data: ScanData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<ExecutionStatus>,
    pub resource_kind: ResourceKind,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    name: String,
    uid: Uuid,
    state: String,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
    #[serde(rename = "type")]
    scan_type: ScanType,
    data: ScanData,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    execution_status: Option<ExecutionStatus>,
}

impl TryFrom<RawEnvelope> for ScanEnvelope {
    type Error = ScanError;

    fn try_from(raw: RawEnvelope) -> Result<Self> {
        let resource_kind = ResourceKind::from_resource(&raw.data.resource)?;
        Ok(Self {
            name: raw.name,
            uid: raw.uid,
            state: raw.state,
            create_time: raw.create_time,
            update_time: raw.update_time,
            scan_type: raw.scan_type,
            data: raw.data,
            description: raw.description,
            display_name: raw.display_name,
            execution_status: raw.execution_status,
            resource_kind,
        })
    }
}

impl ScanEnvelope {
    /// Decode one listing entry.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Validation`] when a required field is missing or
    /// malformed, including an unknown `type`.
    pub fn from_value(value: Value) -> Result<Self> {
        let label = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed scan>")
            .to_owned();
        serde_json::from_value(value).with_context(|| format!("scan listing entry {label}"))
    }

    pub fn resource(&self) -> &str {
        &self.data.resource
    }

    /// Last segment of the resource path.
    pub fn short_name(&self) -> &str {
        short_name(&self.data.resource)
    }

    pub fn is_for_table(&self) -> bool {
        self.resource_kind == ResourceKind::Table
    }

    pub fn is_for_dataset(&self) -> bool {
        self.resource_kind == ResourceKind::Dataset
    }
}

/// Extract the `dataScans` array of a listing response.
///
/// A response without the key has no scans.
///
/// # Errors
///
/// Returns [`ScanError::Validation`] when the text is not JSON, or `dataScans`
/// is not an array.
pub fn parse_listing(json: &str) -> Result<Vec<Value>> {
    let mut root: Value = serde_json::from_str(json).context("scan listing response")?;
    take_listing_entries(&mut root)
}

/// Move the `dataScans` array out of an already decoded listing response.
///
/// # Errors
///
/// Returns [`ScanError::Validation`] when `dataScans` is not an array.
pub fn take_listing_entries(root: &mut Value) -> Result<Vec<Value>> {
    match root.get_mut("dataScans").map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(ScanError::Validation(format!(
            "scan listing 'dataScans' should be an array, found {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(resource: &str, scan_type: &str) -> Value {
        json!({
            "name": "projects/p/locations/us/dataScans/doc-1",
            "uid": "5f0c6a8e-2b0e-4a0e-9a59-1f2d3c4b5a69",
            "state": "ACTIVE",
            "createTime": "2025-01-10T12:00:00Z",
            "updateTime": "2025-02-10T12:00:00.123456Z",
            "type": scan_type,
            "data": { "resource": resource },
            "executionSpec": { "trigger": { "onDemand": {} } },
            "executionStatus": {
                "latestJobEndTime": "2025-02-10T12:05:00Z",
                "latestJobCreateTime": "2025-02-10T12:00:00Z"
            }
        })
    }

    #[test]
    fn test_table_envelope() {
        let env = ScanEnvelope::from_value(entry(
            "//bigquery.googleapis.com/projects/p/datasets/shop/tables/orders",
            "DATA_DOCUMENTATION",
        ))
        .unwrap();

        assert!(env.is_for_table());
        assert!(!env.is_for_dataset());
        assert!(env.scan_type.is_documentation());
        assert_eq!(env.short_name(), "orders");
        assert!(env.execution_status.is_some());
    }

    #[test]
    fn test_dataset_envelope() {
        let env = ScanEnvelope::from_value(entry(
            "//bigquery.googleapis.com/projects/p/datasets/shop",
            "DATA_DOCUMENTATION",
        ))
        .unwrap();

        assert!(env.is_for_dataset());
        assert!(!env.is_for_table());
        assert_eq!(env.resource_kind, ResourceKind::Dataset);
    }

    #[test]
    fn test_unknown_type_fails() {
        let err = ScanEnvelope::from_value(entry(
            "//bigquery.googleapis.com/projects/p/datasets/shop",
            "KNOWLEDGE_ENGINE",
        ))
        .unwrap_err();
        assert!(matches!(err, ScanError::Validation(_)));
        assert!(err.to_string().contains("doc-1"));
    }

    #[test]
    fn test_missing_field_fails() {
        let mut value = entry("//bigquery.googleapis.com/projects/p/datasets/shop", "DATA_PROFILE");
        value.as_object_mut().unwrap().remove("uid");
        assert!(matches!(
            ScanEnvelope::from_value(value),
            Err(ScanError::Validation(_))
        ));
    }

    #[test]
    fn test_unclassifiable_resource_fails() {
        let err = ScanEnvelope::from_value(entry(
            "//bigquery.googleapis.com/projects/p/datasets/shop/routines/f",
            "DATA_DOCUMENTATION",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("neither a table nor a dataset"));
    }

    #[test]
    fn test_scan_type_of_raw_entry() {
        let doc = entry("//bigquery.googleapis.com/projects/p/datasets/shop", "DATA_DOCUMENTATION");
        assert_eq!(ScanType::of_entry(&doc), Some(ScanType::DataDocumentation));

        let profile = entry("//bigquery.googleapis.com/projects/p/datasets/shop", "DATA_PROFILE");
        assert!(!ScanType::of_entry(&profile).unwrap().is_documentation());

        let unknown = entry("//bigquery.googleapis.com/projects/p/datasets/shop", "DATA_DISCOVERY");
        assert_eq!(ScanType::of_entry(&unknown), None);
        assert_eq!(ScanType::of_entry(&json!({ "name": "x" })), None);
    }

    #[test]
    fn test_parse_listing() {
        let items = parse_listing(r#"{"dataScans": [{"a": 1}, {"b": 2}]}"#).unwrap();
        assert_eq!(items.len(), 2);
        assert!(parse_listing("{}").unwrap().is_empty());
        assert!(parse_listing(r#"{"dataScans": 3}"#).is_err());
        assert!(parse_listing("<html>").is_err());
    }
}
