//! Fetching and parsing the full view of each selected scan.

use crate::error::Result;
use crate::scan::{DocumentationScan, ScanEnvelope};
use crate::service::ScanService;
use futures::{StreamExt as _, TryStreamExt as _, stream};

/// Hydrate `scans` with at most `concurrency` requests in flight.
///
/// Results keep the order of `scans`. The first failed fetch or parse fails
/// the whole call; partial results are never returned.
///
/// # Errors
///
/// Propagates transport, access and validation errors from any scan.
pub async fn hydrate_scans<S: ScanService>(
    service: &S,
    scans: &[ScanEnvelope],
    concurrency: usize,
) -> Result<Vec<DocumentationScan>> {
    stream::iter(scans)
        .map(|listed| hydrate_one(service, listed))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

async fn hydrate_one<S: ScanService>(
    service: &S,
    listed: &ScanEnvelope,
) -> Result<DocumentationScan> {
    tracing::debug!(scan = %listed.name, resource = %listed.resource(), "fetching full view");
    let json = service.get_scan(&listed.name, true).await?;
    DocumentationScan::from_full_view(listed, &json)
}
