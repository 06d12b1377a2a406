use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use atomic_drift::catalog::{CatalogId, GithubCatalog, RemoteCatalog};
use atomic_drift::config::{Config, ConfigOverrides};
use atomic_drift::index::{DateIndex, DateIndexBuilder};
use atomic_drift::localindex::load_local_index;
use atomic_drift::output::csv::report_to_csv;
use atomic_drift::output::json::render_json;
use atomic_drift::output::table::{render_index_table, render_report_table};
use atomic_drift::reconcile::{reconcile, StalenessReport};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "atomic-drift",
    about = "Flags locally indexed atomic test criteria that may be out of date upstream"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Root of the local atomics checkout.
    #[arg(short, long)]
    atomics_dir: Option<String>,
    /// GitHub API token for authenticated requests.
    #[arg(short, long)]
    token: Option<String>,
    /// Comma-separated criteria platform paths, in overwrite order.
    #[arg(short, long)]
    paths: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Full reconciliation: build the date index and classify every local
    /// technique.
    Report,
    /// Build and print the technique-to-commit-date index only.
    Index {
        #[arg(long, default_value = "criteria")]
        catalog: String,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        atomics_dir: cli.atomics_dir.clone(),
        token: cli.token.clone(),
        criteria_paths: cli.paths.as_deref().map(parse_path_list),
    });

    match &cli.command {
        Commands::Report => {
            let catalog = build_catalog(CatalogId::Criteria, &config);
            let index = build_index(&catalog, &config.criteria.paths).await?;
            info!("date index holds {} techniques", index.len());
            let local = load_local_index(&config.resolved_atomics_dir())?;
            let report = reconcile(&index, &local);
            info!(
                "{} dated, {} not found remotely",
                report.dated_count(),
                report.not_found_count()
            );
            print_report(&report, cli.output)?;
        }
        Commands::Index { catalog } => {
            let id = CatalogId::from_str(catalog)?;
            let paths = if id == CatalogId::Criteria || cli.paths.is_some() {
                config.criteria.paths.clone()
            } else {
                id.default_paths()
            };
            let catalog = build_catalog(id, &config);
            let index = build_index(&catalog, &paths).await?;
            print_index(&index, cli.output)?;
        }
        Commands::Config { init, show } => {
            if *init {
                Config::write_template(&config_path)?;
                println!("Wrote config template to {}", config_path.display());
            }
            if *show || !*init {
                println!("{}", render_json(&config)?);
            }
        }
    }

    Ok(())
}

fn build_catalog(id: CatalogId, config: &Config) -> GithubCatalog {
    GithubCatalog::new(id)
        .with_api_base(config.github.api_base.clone())
        .with_token(config.token())
        .with_audit_dir(config.resolved_audit_dir())
}

async fn build_index(catalog: &GithubCatalog, paths: &[String]) -> Result<DateIndex> {
    let mut builder = DateIndexBuilder::new();
    for path in paths {
        // a missing listing is fatal; everything under it degrades per entry
        let entries = catalog.list_files(path).await?;
        info!("{} listed {} entries under {path}", catalog.id(), entries.len());
        builder.ingest(catalog, &entries).await;
    }
    Ok(builder.finish())
}

fn parse_path_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

fn print_report(report: &StalenessReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_report_table(report)),
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => println!("{}", report_to_csv(report)?),
    }
    Ok(())
}

fn print_index(index: &DateIndex, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_index_table(index)),
        OutputFormat::Json => println!("{}", render_json(index)?),
        OutputFormat::Csv => {
            warn!("CSV output for index not implemented, using JSON");
            println!("{}", render_json(index)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_path_list;

    #[test]
    fn parses_comma_separated_paths() {
        let paths = parse_path_list("windows, macos,,linux ");
        assert_eq!(paths, vec!["windows", "macos", "linux"]);
    }
}
