use anyhow::{Context as _, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use scanlens::auth::{GoogleCredentials, StaticToken, TokenSource};
use scanlens::config::{Settings, load_settings};
use scanlens::pipeline::{
    DatasetTarget, PipelineOptions, run_dataset, run_scan_listing, run_table,
};
use scanlens::service::http::DEFAULT_TIMEOUT;
use scanlens::service::{BigQueryClient, DataplexClient};
use scanlens::view::render_markdown;
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "scanlens",
    version,
    about = "Resolve Dataplex documentation scans into a BigQuery dataset view"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to a daily rolling file in the platform data directory
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the documented view of a whole dataset
    Describe {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        connection: ConnectionArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print the documented view of a single table
    Table {
        #[command(flatten)]
        target: TargetArgs,

        /// Short table name
        #[arg(short, long)]
        table: String,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
    /// List the documentation scans a describe run would use
    Scans {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Google Cloud project that owns the dataset
    #[arg(short, long, env = "SCANLENS_PROJECT")]
    pub project: String,

    /// BigQuery dataset name
    #[arg(short, long)]
    pub dataset: String,
}

#[derive(Args)]
pub struct FilterArgs {
    /// Only surface these tables (repeatable). Replaces the settings file list.
    #[arg(long = "allow", value_name = "TABLE")]
    pub allow: Vec<String>,

    /// Never surface these tables (repeatable). Replaces the settings file list.
    #[arg(long = "block", value_name = "TABLE")]
    pub block: Vec<String>,

    /// Fetch table DDL and derive partition/cluster columns
    #[arg(long)]
    pub ddls: bool,

    /// Fetch row and byte counts
    #[arg(long)]
    pub counts: bool,

    /// Full-view requests in flight at once
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
}

#[derive(Args)]
pub struct ConnectionArgs {
    /// Settings file. Defaults to <config dir>/scanlens/config.json
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Service-account key file. Defaults to Application Default Credentials
    #[arg(long, value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// Bearer token to use instead of Google credentials
    #[arg(long, env = "SCANLENS_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
}

/// Token source picked from the command line.
enum CliTokens {
    Static(StaticToken),
    Google(GoogleCredentials),
}

impl TokenSource for CliTokens {
    async fn token(&self) -> scanlens::error::Result<SecretString> {
        match self {
            Self::Static(source) => source.token().await,
            Self::Google(source) => source.token().await,
        }
    }
}

struct Clients {
    scans: DataplexClient<Arc<CliTokens>>,
    warehouse: BigQueryClient<Arc<CliTokens>>,
}

async fn credentials(connection: &ConnectionArgs) -> Result<CliTokens> {
    if let Some(token) = connection.access_token.as_deref() {
        return Ok(CliTokens::Static(StaticToken::new(token)));
    }
    let google = match connection.credentials.as_deref() {
        Some(path) => GoogleCredentials::from_service_account_file(path)?,
        None => GoogleCredentials::from_environment().await?,
    };
    Ok(CliTokens::Google(google))
}

async fn connect(settings: &Settings, connection: &ConnectionArgs) -> Result<Clients> {
    let tokens = Arc::new(credentials(connection).await?);

    Ok(Clients {
        scans: DataplexClient::new(
            Arc::clone(&tokens),
            settings.dataplex_base_url.as_deref(),
            DEFAULT_TIMEOUT,
        )?,
        warehouse: BigQueryClient::new(
            tokens,
            settings.bigquery_base_url.as_deref(),
            DEFAULT_TIMEOUT,
        )?,
    })
}

/// Settings file values with command-line flags layered on top.
fn merge(mut settings: Settings, filters: &FilterArgs) -> Settings {
    if !filters.allow.is_empty() {
        settings.allow_list.clone_from(&filters.allow);
    }
    if !filters.block.is_empty() {
        settings.block_list.clone_from(&filters.block);
    }
    settings.include_ddls |= filters.ddls;
    settings.include_table_counts |= filters.counts;
    if let Some(limit) = filters.concurrency {
        settings.hydration_concurrency = limit;
    }
    settings
}

async fn prepare(
    target: &TargetArgs,
    filters: &FilterArgs,
    connection: &ConnectionArgs,
) -> Result<(DatasetTarget, PipelineOptions, Clients)> {
    let settings = merge(load_settings(connection.config.as_deref())?, filters);
    let options = settings.to_options().context("invalid options")?;
    let target = DatasetTarget::new(target.project.as_str(), target.dataset.as_str())?;
    let clients = connect(&settings, connection).await?;
    Ok((target, options, clients))
}

pub async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Describe {
            target,
            filters,
            connection,
            format,
        } => {
            let (target, options, clients) = prepare(&target, &filters, &connection).await?;
            let view = run_dataset(&clients.scans, &clients.warehouse, &target, &options)
                .await
                .with_context(|| {
                    format!("failed to describe {}.{}", target.project_id, target.dataset)
                })?;
            match format {
                OutputFormat::Json => println!("{}", view.to_json_pretty()?),
                OutputFormat::Markdown => print!("{}", render_markdown(&view)),
            }
        }
        Commands::Table {
            target,
            table,
            filters,
            connection,
        } => {
            let (target, options, clients) = prepare(&target, &filters, &connection).await?;
            let view = run_table(
                &clients.scans,
                &clients.warehouse,
                &target,
                &table,
                &options,
            )
            .await
            .with_context(|| format!("failed to describe {}", target.sql_table_name(&table)))?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Scans {
            target,
            filters,
            connection,
        } => {
            let (target, options, clients) = prepare(&target, &filters, &connection).await?;
            let scans = run_scan_listing(&clients.scans, &clients.warehouse, &target, &options)
                .await
                .context("failed to list documentation scans")?;
            println!("{}", serde_json::to_string_pretty(&scans)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_describe() {
        let cli = Cli::try_parse_from([
            "scanlens", "-vv", "describe", "--project", "p", "--dataset", "shop", "--block",
            "orders", "--block", "events", "--ddls", "--format", "markdown",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Describe {
            target,
            filters,
            format,
            ..
        } = cli.command
        else {
            panic!("expected describe");
        };
        assert_eq!(target.dataset, "shop");
        assert_eq!(filters.block, vec!["orders", "events"]);
        assert!(filters.ddls);
        assert!(!filters.counts);
        assert!(matches!(format, OutputFormat::Markdown));
    }

    #[tokio::test]
    async fn test_access_token_takes_precedence() {
        let cli = Cli::try_parse_from([
            "scanlens", "scans", "-p", "p", "-d", "shop", "--access-token", "tok",
            "--credentials", "/nonexistent/key.json",
        ])
        .unwrap();
        let Commands::Scans { connection, .. } = cli.command else {
            panic!("expected scans");
        };

        let tokens = credentials(&connection).await.unwrap();
        assert!(matches!(tokens, CliTokens::Static(_)));
    }

    #[tokio::test]
    async fn test_bad_key_file_fails_before_any_request() {
        let connection = ConnectionArgs {
            config: None,
            credentials: Some(PathBuf::from("/nonexistent/scanlens/key.json")),
            access_token: None,
        };
        let err = credentials(&connection).await.err().unwrap();
        assert!(err.to_string().contains("key.json"));
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings {
            allow_list: vec!["users".to_owned()],
            block_list: vec!["tmp".to_owned()],
            include_table_counts: true,
            ..Settings::default()
        };
        let filters = FilterArgs {
            allow: Vec::new(),
            block: vec!["orders".to_owned()],
            ddls: true,
            counts: false,
            concurrency: Some(2),
        };

        let merged = merge(settings, &filters);
        assert_eq!(merged.allow_list, vec!["users"]);
        assert_eq!(merged.block_list, vec!["orders"]);
        assert!(merged.include_ddls);
        assert!(merged.include_table_counts);
        assert_eq!(merged.hydration_concurrency, 2);
    }
}
