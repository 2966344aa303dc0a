//! Scan resolution pipeline for a single BigQuery dataset.
//!
//! A run turns the raw scan listing of a dataset's location into a
//! [`DatasetView`]:
//!
//! 1. look up the dataset location (scans are location-scoped)
//! 2. list every scan in that location
//! 3. fetch the live table inventory
//! 4. classify: keep documentation scans of the dataset and its live,
//!    policy-allowed tables ([`classify_scans`])
//! 5. hydrate the full view of each kept scan ([`hydrate_scans`]), alongside
//!    the optional DDL and row-count lookups
//! 6. aggregate: resolve relationships and build the view ([`aggregate`])
//!
//! Runs are stateless. Everything a run needs comes in through
//! [`PipelineOptions`]; nothing is cached between calls, so two runs against
//! an unchanged backend produce identical output.
//!
//! # Example
//!
//! ```no_run
//! use scanlens::auth::StaticToken;
//! use scanlens::pipeline::{DatasetTarget, PipelineOptions, run_dataset};
//! use scanlens::service::{BigQueryClient, DataplexClient};
//! use scanlens::service::http::DEFAULT_TIMEOUT;
//!
//! # async fn demo() -> scanlens::error::Result<()> {
//! let tokens = std::sync::Arc::new(StaticToken::new("ya29.token"));
//! let scans = DataplexClient::new(tokens.clone(), None, DEFAULT_TIMEOUT)?;
//! let warehouse = BigQueryClient::new(tokens, None, DEFAULT_TIMEOUT)?;
//!
//! let options = PipelineOptions::builder()
//!     .block_list(["orders_archive"])
//!     .include_ddls(true)
//!     .build()?;
//! let target = DatasetTarget::new("my-project", "thelook")?;
//!
//! let view = run_dataset(&scans, &warehouse, &target, &options).await?;
//! println!("{}", view.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod classify;
pub mod hydrate;
pub mod options;
pub mod reconcile;
pub mod relationships;

pub use aggregate::{Enrichment, aggregate, table_view};
pub use classify::{classify_scans, resource_belongs_to};
pub use hydrate::hydrate_scans;
pub use options::{
    DEFAULT_HYDRATION_CONCURRENCY, DatasetTarget, PipelineOptions, PipelineOptionsBuilder,
};
pub use reconcile::live_inventory;
pub use relationships::resolve_relationships;

use crate::error::{Result, ResultExt as _, ScanError};
use crate::scan::{DocumentationScan, ScanEnvelope, parse_listing};
use crate::service::{ScanService, Warehouse};
use crate::view::{DatasetView, TableView};
use std::collections::BTreeSet;

/// Location, inventory and classified scans of a target.
struct Selection {
    location: String,
    inventory: BTreeSet<String>,
    scans: Vec<ScanEnvelope>,
}

async fn select<S, W>(
    scans: &S,
    warehouse: &W,
    target: &DatasetTarget,
    options: &PipelineOptions,
) -> Result<Selection>
where
    S: ScanService,
    W: Warehouse,
{
    let location = warehouse
        .dataset_location(&target.project_id, &target.dataset)
        .await?;
    tracing::info!(%location, "resolved dataset location");

    let listing = scans.list_scans(&target.project_id, &location).await?;
    let listing = parse_listing(&listing).context("scan listing")?;
    let inventory = live_inventory(warehouse, target).await?;

    let selected = classify_scans(listing, target, &options.policy, &inventory)?;
    tracing::info!(
        selected = selected.len(),
        live_tables = inventory.len(),
        "classified documentation scans"
    );

    Ok(Selection {
        location,
        inventory,
        scans: selected,
    })
}

fn undocumented(target: &DatasetTarget) -> ScanError {
    ScanError::NotFound(format!(
        "no documentation scan for dataset {}.{}",
        target.project_id, target.dataset
    ))
}

/// Optional DDL and row-count lookups, run concurrently.
async fn enrich<W: Warehouse>(
    warehouse: &W,
    target: &DatasetTarget,
    options: &PipelineOptions,
) -> Result<Enrichment> {
    let ddls = async {
        if options.include_ddls {
            warehouse
                .table_ddls(&target.project_id, &target.dataset)
                .await
                .map(Some)
        } else {
            Ok(None)
        }
    };
    let counts = async {
        if options.include_table_counts {
            warehouse
                .table_counts(&target.project_id, &target.dataset)
                .await
                .map(Some)
        } else {
            Ok(None)
        }
    };
    let (ddls, counts) = tokio::try_join!(ddls, counts)?;
    Ok(Enrichment { ddls, counts })
}

/// Resolve the full [`DatasetView`] of `target`.
///
/// # Errors
///
/// - [`ScanError::NotFound`] if the dataset has no documentation scan
/// - [`ScanError::Validation`] if any listed or hydrated payload is malformed
/// - collaborator errors (authentication, transport, request) as returned
#[tracing::instrument(
    name = "run_dataset",
    skip_all,
    fields(project = %target.project_id, dataset = %target.dataset)
)]
pub async fn run_dataset<S, W>(
    scans: &S,
    warehouse: &W,
    target: &DatasetTarget,
    options: &PipelineOptions,
) -> Result<DatasetView>
where
    S: ScanService,
    W: Warehouse,
{
    let selection = select(scans, warehouse, target, options).await?;
    if !selection.scans.iter().any(ScanEnvelope::is_for_dataset) {
        return Err(undocumented(target));
    }

    let (hydrated, enrichment) = tokio::try_join!(
        hydrate_scans(scans, &selection.scans, options.hydration_concurrency),
        enrich(warehouse, target, options),
    )?;
    tracing::info!(hydrated = hydrated.len(), "hydrated full views");

    aggregate(
        target,
        &selection.location,
        &hydrated,
        &options.policy,
        &enrichment,
    )
}

/// Resolve a single table of `target`.
///
/// # Errors
///
/// Returns [`ScanError::NotFound`] if the table is not in the live
/// inventory, is excluded by the policy, or has no documentation scan.
/// Other failures propagate as in [`run_dataset`].
#[tracing::instrument(
    name = "run_table",
    skip_all,
    fields(project = %target.project_id, dataset = %target.dataset, %table)
)]
pub async fn run_table<S, W>(
    scans: &S,
    warehouse: &W,
    target: &DatasetTarget,
    table: &str,
    options: &PipelineOptions,
) -> Result<TableView>
where
    S: ScanService,
    W: Warehouse,
{
    let selection = select(scans, warehouse, target, options).await?;
    let sql_name = target.sql_table_name(table);

    if !selection.inventory.contains(table) {
        return Err(ScanError::NotFound(format!(
            "table {sql_name} does not exist in the dataset"
        )));
    }
    if !options.policy.is_allowed(table) {
        return Err(ScanError::NotFound(format!(
            "table {sql_name} is excluded by the allow/block lists"
        )));
    }

    let Some(listed) = selection
        .scans
        .into_iter()
        .find(|s| s.is_for_table() && s.short_name() == table)
    else {
        return Err(ScanError::NotFound(format!(
            "no documentation scan for table {sql_name}"
        )));
    };

    let (hydrated, enrichment) = tokio::try_join!(
        hydrate_scans(scans, std::slice::from_ref(&listed), 1),
        enrich(warehouse, target, options),
    )?;

    match hydrated.into_iter().next() {
        Some(DocumentationScan::Table(scan)) => Ok(table_view(&scan, &enrichment)),
        _ => Err(ScanError::Validation(format!(
            "scan {} did not hydrate to a table result",
            listed.name
        ))),
    }
}

/// The documentation scans a run of `target` would hydrate, without
/// fetching their full views.
///
/// # Errors
///
/// Propagates collaborator and listing validation errors.
#[tracing::instrument(
    name = "run_scan_listing",
    skip_all,
    fields(project = %target.project_id, dataset = %target.dataset)
)]
pub async fn run_scan_listing<S, W>(
    scans: &S,
    warehouse: &W,
    target: &DatasetTarget,
    options: &PipelineOptions,
) -> Result<Vec<ScanEnvelope>>
where
    S: ScanService,
    W: Warehouse,
{
    Ok(select(scans, warehouse, target, options).await?.scans)
}
