//! # CODEREPOSCTL
//!
//! Command-line interface for managing SageMaker code repositories.
//!
//! ## Usage
//!
//! ```bash
//! # Create a code repository
//! codereposctl create my-repo --repository-url https://github.com/org/repo.git
//!
//! # Show a code repository
//! codereposctl describe my-repo
//!
//! # Verify a code repository is gone
//! codereposctl check-destroy my-repo
//!
//! # Delete every code repository in the given regions
//! codereposctl sweep --regions us-west-2,us-east-1
//!
//! # Run the lifecycle scenarios against the in-memory API
//! codereposctl --offline acceptance
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use code_repository_reconciler::config::{parse_region_list, ReconcilerConfig};
use code_repository_reconciler::harness::{scenarios, RandomNameGenerator};
use code_repository_reconciler::model::{CodeRepository, CodeRepositorySpec};
use code_repository_reconciler::observability::{self, metrics};
use code_repository_reconciler::provider::{
    CodeRepositoryApi, InMemoryClientFactory, RegionalClientFactory, SageMakerClientFactory,
    SageMakerCodeRepositoryApi,
};
use code_repository_reconciler::reconciler::CodeRepositoryReconciler;
use code_repository_reconciler::sweep::{SweepItemResult, Sweeper};
use std::sync::Arc;
use tracing::info;

/// Account ID used for ARNs when running against the in-memory API
const OFFLINE_ACCOUNT_ID: &str = "123456789012";

/// SageMaker Code Repository CLI
#[derive(Parser)]
#[command(name = "codereposctl")]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")"),
    about = "Manage AWS SageMaker code repositories",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// AWS region (defaults to AWS_REGION / AWS_DEFAULT_REGION)
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// SageMaker endpoint override
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Use an in-memory API instead of AWS
    #[arg(long, global = true)]
    offline: bool,

    /// Print Prometheus metrics to stderr when the command finishes
    #[arg(long, global = true)]
    print_metrics: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a code repository
    Create {
        /// Name of the code repository
        #[arg(value_name = "NAME")]
        name: String,

        /// URL of the Git repository
        #[arg(long)]
        repository_url: String,

        /// Default branch
        #[arg(long)]
        branch: Option<String>,

        /// Secrets Manager ARN holding the Git credentials
        #[arg(long)]
        secret_arn: Option<String>,
    },
    /// Show a code repository
    Describe {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Adopt an existing code repository by name and print its state attributes
    Import {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Delete a code repository (succeeds if it is already gone)
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Fail if a code repository still exists
    CheckDestroy {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// List code repositories in the region
    List,
    /// Delete every code repository in one or more regions
    Sweep {
        /// Comma-separated regions (defaults to SWEEP_REGIONS, then the current region)
        #[arg(long)]
        regions: Option<String>,
    },
    /// Run the basic and disappears lifecycle scenarios
    Acceptance {
        /// Name prefix for generated code repositories
        #[arg(long)]
        prefix: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ReconcilerConfig::from_env();
    if let Some(region) = &cli.region {
        config.region.clone_from(region);
    }
    if cli.endpoint_url.is_some() {
        config.endpoint_url.clone_from(&cli.endpoint_url);
    }

    observability::init_logging(&config)?;
    if config.enable_metrics {
        metrics::register_metrics()?;
    }

    let factory: Arc<dyn RegionalClientFactory> = if cli.offline {
        info!("Using in-memory code repository API");
        Arc::new(InMemoryClientFactory::new(OFFLINE_ACCOUNT_ID))
    } else {
        Arc::new(SageMakerClientFactory::new(&config))
    };

    let result = run(&cli, &config, factory).await;

    if cli.print_metrics {
        eprintln!("{}", metrics::gather_text()?);
    }
    result
}

async fn run(
    cli: &Cli,
    config: &ReconcilerConfig,
    factory: Arc<dyn RegionalClientFactory>,
) -> Result<()> {
    match &cli.command {
        Commands::Sweep { regions } => {
            let regions = regions
                .as_deref()
                .map(parse_region_list)
                .unwrap_or_else(|| config.sweep_regions.clone());
            sweep_command(Sweeper::new(factory), &regions, cli.output).await
        }
        Commands::Create {
            name,
            repository_url,
            branch,
            secret_arn,
        } => {
            let mut spec = CodeRepositorySpec::new(name, repository_url);
            spec.git_config.branch.clone_from(branch);
            spec.git_config.secret_arn.clone_from(secret_arn);
            let reconciler = reconciler_for(cli, config, factory.as_ref()).await?;
            let record = reconciler.create(&spec).await?;
            print_record(&record, cli.output)
        }
        Commands::Describe { name } => {
            let reconciler = reconciler_for(cli, config, factory.as_ref()).await?;
            let record = reconciler.describe(name).await?;
            print_record(&record, cli.output)
        }
        Commands::Import { name } => {
            let reconciler = reconciler_for(cli, config, factory.as_ref()).await?;
            import_command(&reconciler, name, cli.output).await
        }
        Commands::Delete { name } => {
            let reconciler = reconciler_for(cli, config, factory.as_ref()).await?;
            reconciler.delete(name).await?;
            println!("SageMaker Code Repository {name} deleted");
            Ok(())
        }
        Commands::CheckDestroy { name } => {
            let reconciler = reconciler_for(cli, config, factory.as_ref()).await?;
            if reconciler.exists_and_matches(name, name).await? {
                bail!("SageMaker Code Repository {name:?} still exists");
            }
            println!("SageMaker Code Repository {name} does not exist");
            Ok(())
        }
        Commands::List => {
            let reconciler = reconciler_for(cli, config, factory.as_ref()).await?;
            list_command(&reconciler, cli.output).await
        }
        Commands::Acceptance { prefix } => {
            let reconciler = reconciler_for(cli, config, factory.as_ref()).await?;
            let prefix = prefix.as_deref().unwrap_or(&config.name_prefix);
            acceptance_command(&reconciler, prefix).await
        }
    }
}

/// Reconciler for the configured region
async fn reconciler_for(
    cli: &Cli,
    config: &ReconcilerConfig,
    factory: &dyn RegionalClientFactory,
) -> Result<CodeRepositoryReconciler> {
    let api: Arc<dyn CodeRepositoryApi> = if cli.offline {
        factory.client_for_region(&config.region).await?
    } else {
        Arc::new(
            SageMakerCodeRepositoryApi::new(config)
                .await
                .context("Failed to create SageMaker client. Ensure AWS credentials are configured.")?,
        )
    };
    Ok(CodeRepositoryReconciler::new(api))
}

fn print_record(record: &CodeRepository, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Table => {
            println!("Name:           {}", record.name);
            println!("ARN:            {}", record.arn);
            println!("Repository URL: {}", record.repository_url());
            if let Some(branch) = &record.git_config.branch {
                println!("Branch:         {branch}");
            }
            if let Some(secret_arn) = &record.git_config.secret_arn {
                println!("Secret ARN:     {secret_arn}");
            }
            if let Some(created) = record.creation_time {
                println!("Created:        {}", created.to_rfc3339());
            }
            if let Some(modified) = record.last_modified_time {
                println!("Last Modified:  {}", modified.to_rfc3339());
            }
        }
    }
    Ok(())
}

async fn import_command(
    reconciler: &CodeRepositoryReconciler,
    name: &str,
    output: OutputFormat,
) -> Result<()> {
    let record = reconciler.import(name).await?;
    let attributes = code_repository_reconciler::harness::flatten(&record);
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&attributes)?),
        OutputFormat::Table => {
            for (key, value) in attributes {
                println!("{key:<30} {value}");
            }
        }
    }
    Ok(())
}

async fn list_command(reconciler: &CodeRepositoryReconciler, output: OutputFormat) -> Result<()> {
    let mut summaries = Vec::new();
    let mut next_token = None;
    loop {
        let page = reconciler
            .api()
            .list_page(next_token)
            .await
            .context("Failed to list SageMaker Code Repositories")?;
        summaries.extend(page.items);
        next_token = page.next_token;
        if next_token.is_none() {
            break;
        }
    }

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No SageMaker Code Repositories found in {}.", reconciler.region());
        return Ok(());
    }
    println!("\n{:<40} ARN", "NAME");
    println!("{}", "-".repeat(100));
    for summary in summaries {
        println!(
            "{:<40} {}",
            summary.name,
            summary.arn.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn sweep_command(sweeper: Sweeper, regions: &[String], output: OutputFormat) -> Result<()> {
    let results = sweeper.sweep_regions(regions).await;
    let mut failed_regions = Vec::new();

    for (region, result) in &results {
        match result {
            Ok(report) if output == OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
            Ok(report) => {
                if let Some(reason) = &report.skipped {
                    println!("{region}: skipped ({reason})");
                    continue;
                }
                println!(
                    "{region}: {} attempted, {} deleted, {} failed",
                    report.attempted(),
                    report.deleted(),
                    report.failures().len()
                );
                for outcome in &report.outcomes {
                    if let SweepItemResult::Failed(message) = &outcome.result {
                        println!("  {:<40} {message}", outcome.name);
                    }
                }
            }
            Err(e) => {
                println!("{region}: error: {e}");
                failed_regions.push(region.clone());
            }
        }
    }

    if !failed_regions.is_empty() {
        bail!("sweep failed in {}", failed_regions.join(", "));
    }
    Ok(())
}

async fn acceptance_command(reconciler: &CodeRepositoryReconciler, prefix: &str) -> Result<()> {
    let names = RandomNameGenerator::new(prefix);

    let record = scenarios::basic(reconciler, &names)
        .await
        .context("basic scenario failed")?;
    println!("basic: ok ({})", record.arn);

    scenarios::disappears(reconciler, &names)
        .await
        .context("disappears scenario failed")?;
    println!("disappears: ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sweep_parses_regions_and_global_flags() {
        let cli = Cli::try_parse_from([
            "codereposctl",
            "sweep",
            "--regions",
            "us-west-2,us-east-1",
            "--offline",
            "-o",
            "json",
        ])
        .unwrap();
        assert!(cli.offline);
        assert_eq!(cli.output, OutputFormat::Json);
        let Commands::Sweep { regions } = cli.command else {
            panic!("expected the sweep command");
        };
        assert_eq!(
            parse_region_list(regions.as_deref().unwrap()),
            vec!["us-west-2", "us-east-1"]
        );
    }

    #[tokio::test]
    async fn test_offline_sweep_runs_without_building_a_reconciler() {
        let cli = Cli::try_parse_from(["codereposctl", "--offline", "sweep", "--regions", "us-west-2"])
            .unwrap();
        let factory = InMemoryClientFactory::new(OFFLINE_ACCOUNT_ID);
        let store = factory.region("us-west-2");
        store
            .create(&CodeRepositorySpec::new("leftover", "https://example.com/repo.git"))
            .await
            .unwrap();

        run(&cli, &ReconcilerConfig::default(), Arc::new(factory))
            .await
            .unwrap();
        assert!(store.is_empty().await);
    }
}
