//! Consumer-facing output of a pipeline run.
//!
//! Field names are part of the JSON contract and must stay stable:
//!
//! ```json
//! {
//!   "project_id": "...",
//!   "dataset_name": "...",
//!   "dataset_location": "...",
//!   "dataset_description": "...",
//!   "dataset_relationships": [{ "table1", "table2", "relationship", "sources", "confidence_score", "type" }],
//!   "dataset_queries": [{ "sql", "description" }],
//!   "dataset_tables": [{ "name", "overview", "fields", "queries", "ddl", "row_count",
//!                        "size_bytes", "partition_columns", "cluster_columns" }]
//! }
//! ```

use crate::error::Result;
use crate::scan::{Query, SchemaField};
use serde::{Deserialize, Serialize};

/// A relationship rewritten as a SQL join predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRelationship {
    /// `project.dataset.table` of the left side.
    pub table1: String,
    /// `project.dataset.table` of the right side.
    pub table2: String,
    /// `left.col = right.col AND ...`
    pub relationship: String,
    pub sources: Vec<String>,
    pub confidence_score: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One documented table, optionally enriched with catalog details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableView {
    /// `project.dataset.table`
    pub name: String,
    pub overview: String,
    pub fields: Vec<SchemaField>,
    pub queries: Vec<Query>,
    pub ddl: Option<String>,
    pub row_count: Option<u64>,
    pub size_bytes: Option<u64>,
    pub partition_columns: Option<Vec<String>>,
    pub cluster_columns: Option<Vec<String>>,
}

impl TableView {
    /// The table's fields as a JSON array.
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn fields_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.fields)?)
    }

    /// The table's queries as a JSON array.
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn queries_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.queries)?)
    }

    /// Fenced block with one `` `name` -- Definition: ... `` line per field.
    pub fn text_field_descriptions(&self) -> String {
        let mut out = String::from("```\n");
        for field in &self.fields {
            out.push_str(&format!(
                "`{}` -- Definition: {}\n",
                field.name, field.description
            ));
        }
        out.push_str("```");
        out
    }
}

/// Everything known about one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetView {
    pub project_id: String,
    pub dataset_name: String,
    pub dataset_location: String,
    pub dataset_description: String,
    pub dataset_relationships: Vec<ResolvedRelationship>,
    pub dataset_queries: Vec<Query>,
    pub dataset_tables: Vec<TableView>,
}

impl DatasetView {
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn relationships_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.dataset_relationships)?)
    }

    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn queries_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.dataset_queries)?)
    }

    /// Fenced block listing each table with its DDL (`None` when not fetched).
    pub fn text_table_ddls(&self) -> String {
        let mut out = String::from("```\n");
        for table in &self.dataset_tables {
            out.push_str(&format!("Table: {}\n", table.name));
            out.push_str(&format!("DDL: {}\n", table.ddl.as_deref().unwrap_or("None")));
        }
        out.push_str("```");
        out
    }

    pub fn table(&self, short_name: &str) -> Option<&TableView> {
        self.dataset_tables
            .iter()
            .find(|t| crate::policy::short_name_of_fqn(&t.name) == short_name)
    }
}

/// Render a dataset view as a Markdown document.
pub fn render_markdown(view: &DatasetView) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}.{}\n\n", view.project_id, view.dataset_name));
    md.push_str(&format!("**Location:** {}\n\n", view.dataset_location));
    md.push_str(&format!("{}\n\n", view.dataset_description));

    if !view.dataset_relationships.is_empty() {
        md.push_str("## Relationships\n\n");
        md.push_str("| Left | Right | Join | Type | Confidence |\n");
        md.push_str("|------|-------|------|------|------------|\n");
        for rel in &view.dataset_relationships {
            md.push_str(&format!(
                "| {} | {} | `{}` | {} | {:.2} |\n",
                rel.table1, rel.table2, rel.relationship, rel.kind, rel.confidence_score
            ));
        }
        md.push('\n');
    }

    render_queries(&mut md, "## Queries", &view.dataset_queries);

    for table in &view.dataset_tables {
        render_table(&mut md, table);
    }

    md
}

fn render_table(md: &mut String, table: &TableView) {
    md.push_str(&format!("## {}\n\n", table.name));
    md.push_str(&format!("{}\n\n", table.overview));

    if let (Some(rows), Some(bytes)) = (table.row_count, table.size_bytes) {
        md.push_str(&format!("**Rows:** {rows} | **Size:** {bytes} bytes\n\n"));
    }
    if let Some(cols) = table.partition_columns.as_ref().filter(|c| !c.is_empty()) {
        md.push_str(&format!("**Partitioned by:** {}\n\n", cols.join(", ")));
    }
    if let Some(cols) = table.cluster_columns.as_ref().filter(|c| !c.is_empty()) {
        md.push_str(&format!("**Clustered by:** {}\n\n", cols.join(", ")));
    }

    if !table.fields.is_empty() {
        md.push_str("| Column | Description |\n");
        md.push_str("|--------|-------------|\n");
        for field in &table.fields {
            md.push_str(&format!(
                "| {} | {} |\n",
                field.name,
                escape_cell(&field.description)
            ));
        }
        md.push('\n');
    }

    render_queries(md, "### Queries", &table.queries);
}

fn render_queries(md: &mut String, heading: &str, queries: &[Query]) {
    if queries.is_empty() {
        return;
    }
    md.push_str(&format!("{heading}\n\n"));
    for query in queries {
        md.push_str(&format!("- {}\n\n```sql\n{}\n```\n\n", query.description, query.sql));
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
