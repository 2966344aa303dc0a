//! BigQuery REST client for the catalog lookups the pipeline needs.
//!
//! Only four read-only calls are made: `datasets.get` (location),
//! `tables.list` (live inventory) and two `jobs.query` statements against
//! `INFORMATION_SCHEMA.TABLES` (DDL) and `__TABLES__` (row/byte counts).

use super::http::HttpTransport;
use super::paging::{Page, collect_pages};
use super::{TableCounts, Warehouse};
use crate::auth::TokenSource;
use crate::error::{Result, ResultExt as _, ScanError};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

const QUERY_TIMEOUT_MS: u32 = 30_000;
const MAX_RESULT_PAGES: usize = 200;

/// HTTP client for the BigQuery v2 REST API.
pub struct BigQueryClient<T> {
    http: HttpTransport<T>,
    base_url: String,
}

#[derive(Deserialize)]
struct DatasetResource {
    location: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableReference {
    table_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableListItem {
    table_reference: TableReference,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableList {
    #[serde(default)]
    tables: Vec<TableListItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Cell {
    v: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Row {
    f: Vec<Cell>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
    #[serde(default)]
    rows: Vec<Row>,
    page_token: Option<String>,
}

impl<T: TokenSource> BigQueryClient<T> {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn new(tokens: T, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpTransport::new(tokens, timeout)?,
            base_url: base_url
                .unwrap_or(DEFAULT_BIGQUERY_BASE_URL)
                .trim_end_matches('/')
                .to_owned(),
        })
    }

    fn dataset_url(&self, project_id: &str, dataset: &str) -> String {
        format!("{}/projects/{project_id}/datasets/{dataset}", self.base_url)
    }

    /// Run a standard-SQL statement and return every row as optional cell strings.
    async fn query_rows(&self, project_id: &str, sql: &str) -> Result<Vec<Vec<Option<String>>>> {
        let url = format!("{}/projects/{project_id}/queries", self.base_url);
        let body = json!({
            "query": sql,
            "useLegacySql": false,
            "timeoutMs": QUERY_TIMEOUT_MS,
        });
        let text = self.http.post_json(&url, &body).await?;
        let first: QueryResponse = serde_json::from_str(&text).context("query response")?;

        let (http, url) = (&self.http, url.as_str());
        let rows = collect_query_rows(first, move |request: ResultsRequest| async move {
            let results_url = format!("{url}/{}", request.job.job_id);
            let timeout = QUERY_TIMEOUT_MS.to_string();
            let mut query: Vec<(&str, &str)> = vec![("timeoutMs", timeout.as_str())];
            if let Some(location) = request.job.location.as_deref() {
                query.push(("location", location));
            }
            if let Some(token) = request.page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let text = http.get_text(&results_url, &query).await?;
            serde_json::from_str::<QueryResponse>(&text).context("query results page")
        })
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.f.into_iter().map(|cell| cell.v).collect())
            .collect())
    }
}

/// Follow-up `jobs.getQueryResults` call: poll an unfinished job or fetch the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResultsRequest {
    job: JobReference,
    page_token: Option<String>,
}

/// Keep calling `fetch_results` until the job is complete and no page token is left.
///
/// Pages that omit `jobReference` inherit the previous one.
async fn collect_query_rows<F, Fut>(
    mut response: QueryResponse,
    mut fetch_results: F,
) -> Result<Vec<Row>>
where
    F: FnMut(ResultsRequest) -> Fut,
    Fut: Future<Output = Result<QueryResponse>>,
{
    let mut rows = std::mem::take(&mut response.rows);
    let mut calls = 0;

    loop {
        let page_token = response.page_token.take().filter(|t| !t.is_empty());
        if response.job_complete && page_token.is_none() {
            return Ok(rows);
        }

        let job = response.job_reference.take().ok_or_else(|| {
            ScanError::Validation("incomplete query response without a job reference".to_owned())
        })?;
        calls += 1;
        if calls > MAX_RESULT_PAGES {
            return Err(ScanError::Transport(format!(
                "query job {} did not finish after {MAX_RESULT_PAGES} polls",
                job.job_id
            )));
        }

        let mut next = fetch_results(ResultsRequest {
            job: job.clone(),
            page_token,
        })
        .await?;
        rows.append(&mut next.rows);
        if next.job_reference.is_none() {
            next.job_reference = Some(job);
        }
        response = next;
    }
}

impl<T: TokenSource> Warehouse for BigQueryClient<T> {
    async fn dataset_location(&self, project_id: &str, dataset: &str) -> Result<String> {
        let text = self
            .http
            .get_text(&self.dataset_url(project_id, dataset), &[])
            .await?;
        let resource: DatasetResource = serde_json::from_str(&text).context("dataset resource")?;
        resource.location.ok_or_else(|| {
            ScanError::Validation(format!("dataset {project_id}.{dataset} has no location"))
        })
    }

    async fn list_tables(&self, project_id: &str, dataset: &str) -> Result<Vec<String>> {
        let url = format!("{}/tables", self.dataset_url(project_id, dataset));
        let (http, url) = (&self.http, url.as_str());

        collect_pages("table list", move |page_token| async move {
            let mut query: Vec<(&str, &str)> = vec![("maxResults", "1000")];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            table_page(&http.get_text(url, &query).await?)
        })
        .await
    }

    async fn table_ddls(&self, project_id: &str, dataset: &str) -> Result<BTreeMap<String, String>> {
        let sql = format!(
            "SELECT CONCAT(table_catalog, '.', table_schema, '.', table_name) AS fq_table_name, ddl \
             FROM {}",
            quoted_path(project_id, dataset, "INFORMATION_SCHEMA.TABLES")?
        );

        let mut ddls = BTreeMap::new();
        for row in self.query_rows(project_id, &sql).await? {
            if let [Some(name), Some(ddl), ..] = row.as_slice() {
                ddls.insert(name.clone(), ddl.clone());
            }
        }
        Ok(ddls)
    }

    async fn table_counts(
        &self,
        project_id: &str,
        dataset: &str,
    ) -> Result<BTreeMap<String, TableCounts>> {
        let sql = format!(
            "SELECT CONCAT(project_id, '.', dataset_id, '.', table_id) AS fq_table_name, \
             row_count, size_bytes FROM {}",
            quoted_path(project_id, dataset, "__TABLES__")?
        );

        let mut counts = BTreeMap::new();
        for row in self.query_rows(project_id, &sql).await? {
            if let [Some(name), Some(rows), Some(bytes), ..] = row.as_slice() {
                counts.insert(
                    name.clone(),
                    TableCounts {
                        row_count: parse_count(rows, name)?,
                        size_bytes: parse_count(bytes, name)?,
                    },
                );
            }
        }
        Ok(counts)
    }
}

/// Decode one `tables.list` page into short table names.
fn table_page(body: &str) -> Result<Page<String>> {
    let page: TableList = serde_json::from_str(body).context("table list")?;
    Ok(Page {
        items: page.tables.into_iter().map(|t| t.table_reference.table_id).collect(),
        next_page_token: page.next_page_token,
    })
}

fn parse_count(value: &str, table: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|e| ScanError::Validation(format!("bad count '{value}' for {table}: {e}")))
}

/// Backtick-quoted `project.dataset.suffix` for interpolation into SQL.
fn quoted_path(project_id: &str, dataset: &str, suffix: &str) -> Result<String> {
    for part in [project_id, dataset] {
        if part.is_empty() || part.contains(['`', '\\', '\n', ' ']) {
            return Err(ScanError::Config(format!(
                "'{part}' is not a valid BigQuery identifier"
            )));
        }
    }
    Ok(format!("`{project_id}.{dataset}.{suffix}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_path() {
        assert_eq!(
            quoted_path("my-proj", "thelook", "__TABLES__").unwrap(),
            "`my-proj.thelook.__TABLES__`"
        );
        assert!(quoted_path("p", "a`; DROP", "__TABLES__").is_err());
        assert!(quoted_path("", "d", "__TABLES__").is_err());
    }

    #[test]
    fn test_query_response_rows() {
        let response: QueryResponse = serde_json::from_str(
            r#"{
                "jobComplete": true,
                "jobReference": { "projectId": "p", "jobId": "job_1", "location": "US" },
                "schema": { "fields": [{ "name": "fq_table_name" }, { "name": "ddl" }] },
                "rows": [
                    { "f": [{ "v": "p.d.users" }, { "v": "CREATE TABLE users (id INT64)" }] },
                    { "f": [{ "v": "p.d.views" }, { "v": null }] }
                ]
            }"#,
        )
        .unwrap();

        assert!(response.job_complete);
        assert_eq!(response.rows.len(), 2);
        assert!(response.rows[1].f[1].v.is_none());
    }

    fn response(value: serde_json::Value) -> QueryResponse {
        serde_json::from_value(value).unwrap()
    }

    fn job(id: &str) -> JobReference {
        JobReference {
            job_id: id.to_owned(),
            location: Some("EU".to_owned()),
        }
    }

    fn cells(rows: &[Row]) -> Vec<Option<String>> {
        rows.iter().flat_map(|r| r.f.iter().map(|c| c.v.clone())).collect()
    }

    #[tokio::test]
    async fn test_incomplete_job_is_polled_until_complete() {
        let first = response(json!({
            "jobComplete": false,
            "jobReference": { "jobId": "job_1", "location": "EU" }
        }));
        let mut replies = vec![
            response(json!({ "jobComplete": false })),
            response(json!({ "jobComplete": true, "rows": [{ "f": [{ "v": "a" }] }] })),
        ]
        .into_iter();
        let mut requests = Vec::new();

        let rows = collect_query_rows(first, |request| {
            requests.push(request);
            std::future::ready(Ok(replies.next().unwrap()))
        })
        .await
        .unwrap();

        assert_eq!(cells(&rows), vec![Some("a".to_owned())]);
        // The second poll reuses the job reference the first reply omitted.
        let expected = ResultsRequest {
            job: job("job_1"),
            page_token: None,
        };
        assert_eq!(requests, vec![expected.clone(), expected]);
    }

    #[tokio::test]
    async fn test_result_pages_are_concatenated() {
        let first = response(json!({
            "jobComplete": true,
            "jobReference": { "jobId": "job_2", "location": "EU" },
            "rows": [{ "f": [{ "v": "p.d.users" }] }],
            "pageToken": "page-2"
        }));
        let mut replies = vec![
            response(json!({
                "jobComplete": true,
                "rows": [{ "f": [{ "v": "p.d.orders" }] }],
                "pageToken": "page-3"
            })),
            response(json!({
                "jobComplete": true,
                "rows": [{ "f": [{ "v": null }] }],
                "pageToken": ""
            })),
        ]
        .into_iter();
        let mut tokens = Vec::new();

        let rows = collect_query_rows(first, |request| {
            assert_eq!(request.job, job("job_2"));
            tokens.push(request.page_token);
            std::future::ready(Ok(replies.next().unwrap()))
        })
        .await
        .unwrap();

        assert_eq!(
            cells(&rows),
            vec![Some("p.d.users".to_owned()), Some("p.d.orders".to_owned()), None]
        );
        assert_eq!(tokens, vec![Some("page-2".to_owned()), Some("page-3".to_owned())]);
    }

    #[tokio::test]
    async fn test_incomplete_job_without_reference_fails() {
        let first = response(json!({ "jobComplete": false }));
        let err = collect_query_rows(first, |_| {
            std::future::ready(Ok(response(json!({ "jobComplete": true }))))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ScanError::Validation(_)));
        assert!(err.to_string().contains("job reference"));
    }

    #[tokio::test]
    async fn test_job_that_never_finishes_is_capped() {
        let first = response(json!({
            "jobComplete": false,
            "jobReference": { "jobId": "job_3" }
        }));
        let mut calls = 0;

        let err = collect_query_rows(first, |_| {
            calls += 1;
            std::future::ready(Ok(response(json!({ "jobComplete": false }))))
        })
        .await
        .unwrap_err();

        assert_eq!(calls, MAX_RESULT_PAGES);
        assert!(matches!(err, ScanError::Transport(_)));
        assert!(err.to_string().contains("job_3"));
    }

    #[tokio::test]
    async fn test_table_list_pages() {
        let bodies = [
            r#"{"tables": [{"tableReference": {"tableId": "users"}}], "nextPageToken": "t2"}"#,
            r#"{"tables": [{"tableReference": {"tableId": "orders"}}]}"#,
        ];
        let mut served = 0;

        let names = collect_pages("table list", |_| {
            let body = bodies[served];
            served += 1;
            std::future::ready(table_page(body))
        })
        .await
        .unwrap();

        assert_eq!(names, vec!["users", "orders"]);
        assert!(table_page("{}").unwrap().items.is_empty());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("42", "t").unwrap(), 42);
        assert!(matches!(parse_count("x", "t"), Err(ScanError::Validation(_))));
    }
}
