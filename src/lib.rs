//! # Scanlens - BigQuery Data Documentation Resolver
//!
//! Scanlens turns the data-documentation scans that Dataplex keeps for a
//! BigQuery dataset into one normalized view: the dataset description,
//! suggested queries, inferred join relationships, and per-table column
//! documentation, optionally enriched with DDL-derived partition/cluster
//! columns and row/byte counts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scanlens::auth::GoogleCredentials;
//! use scanlens::pipeline::{DatasetTarget, PipelineOptions, run_dataset};
//! use scanlens::service::http::DEFAULT_TIMEOUT;
//! use scanlens::service::{BigQueryClient, DataplexClient};
//! use std::sync::Arc;
//!
//! # async fn example() -> scanlens::error::Result<()> {
//! let tokens = Arc::new(GoogleCredentials::from_environment().await?);
//! let scans = DataplexClient::new(tokens.clone(), None, DEFAULT_TIMEOUT)?;
//! let warehouse = BigQueryClient::new(tokens, None, DEFAULT_TIMEOUT)?;
//!
//! let target = DatasetTarget::new("my-project", "thelook")?;
//! let view = run_dataset(&scans, &warehouse, &target, &PipelineOptions::default()).await?;
//!
//! for table in &view.dataset_tables {
//!     println!("{}: {} columns", table.name, table.fields.len());
//! }
//! for rel in &view.dataset_relationships {
//!     println!("{}", rel.relationship);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`pipeline`]: classification, reconciliation, hydration and aggregation
//! - [`scan`]: typed scan envelopes and documentation results
//! - [`policy`]: allow/block filtering over short table names
//! - [`ddl`]: partition/cluster column extraction from DDL text
//! - [`view`]: the output model and its JSON/Markdown renderings
//! - [`service`]: Dataplex and BigQuery collaborators
//! - [`auth`]: bearer-token sources
//! - [`config`]: persisted settings
//! - [`error`]: error taxonomy
//! - [`logging`]: `tracing` subscriber setup
//!
//! ## Key Concepts
//!
//! ### Stateless Runs
//!
//! A run takes an immutable [`pipeline::PipelineOptions`] and returns a fresh
//! [`view::DatasetView`]. Changing the allow/block lists or enrichment flags
//! means building new options; there is no hidden cache to invalidate.
//!
//! ### Fail Whole
//!
//! Any malformed scan payload or failed fetch aborts the run. Callers never
//! receive a partially hydrated view.

#![warn(clippy::all, rust_2018_idioms)]

pub mod auth;
pub mod config;
pub mod ddl;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod policy;
pub mod scan;
pub mod service;
pub mod view;
