use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::fs;
use tracing_subscriber::EnvFilter;

use sqlguard_core::analyzer::context::SchemaCatalogProvider;
use sqlguard_core::analyzer::verify;
use sqlguard_runner::{self, Config, RunnerError, CONFIG_FILE};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new sqlguard.toml config file
    Init,

    /// Analyze schema and queries without repairing them
    Check,

    /// Repair every query once and write the report
    Run,

    /// Repair queries and re-run on every change
    Watch,

    /// Verify a single query against a question
    Audit {
        /// The question the query should answer
        question: String,
        /// Candidate SQL
        sql: String,
    },

    /// Print the loaded schema catalog
    Schema,
}

const EXAMPLE_CONFIG: &str = r#"version = "1.0"

[schema]
path = "schema/"
ttl_secs = 60

[queries]
path = "queries/"
src = ["src/"]

[repair]
limit = 50

[output]
path = "sqlguard-report.json"
format = "json"
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let config_path = env::current_dir()?.join(CONFIG_FILE);
            if config_path.exists() {
                println!("Config file already exists at {}", config_path.display());
                return Ok(());
            }

            fs::write(&config_path, EXAMPLE_CONFIG)?;
            println!("Created {}", CONFIG_FILE);
            Ok(())
        }
        cmd => {
            let (config, config_dir) = match Config::find_and_load(&env::current_dir()?) {
                Ok(found) => found,
                Err(e) => fail(&e),
            };
            env::set_current_dir(&config_dir)?;
            tracing::debug!(dir = %config_dir.display(), version = %config.version, "configuration loaded");
            println!("Using configuration from: {}", config_dir.display());
            if let Err(e) = dispatch(cmd, &config) {
                fail(&e);
            }
            Ok(())
        }
    }
}

fn fail(err: &RunnerError) -> ! {
    eprintln!("{} {}", style("✖").red(), err.report());
    std::process::exit(1);
}

fn dispatch(cmd: Commands, config: &Config) -> sqlguard_runner::Result<()> {
    match cmd {
        Commands::Check => {
            println!("Checking schema and queries...");
            let bar = ProgressBar::new(0);
            if let Ok(progress) = ProgressStyle::with_template("  {bar:30.cyan} {pos}/{len} {msg}") {
                bar.set_style(progress);
            }
            let result = sqlguard_runner::check_with(config, |query, total| {
                bar.set_length(total as u64);
                bar.set_message(query.name.clone());
                if !query.passed() || query.warnings > 0 {
                    bar.println(query.render_text().trim_end());
                }
                bar.inc(1);
            });
            bar.finish_and_clear();

            let report = result?;
            println!(
                "{} All checks passed! {} queries, {} warnings",
                style("✔").green(),
                report.queries.len(),
                report.warnings
            );
        }
        Commands::Run => {
            println!("Repairing queries...");
            let report = sqlguard_runner::run(config)?;
            let repaired = report.queries.iter().filter(|q| q.repaired.is_some()).count();
            println!(
                "{} {} queries, {} repaired, {} still failing. Report written to {}",
                style("➜").green(),
                report.queries.len(),
                repaired,
                report.failed,
                config.output.path.display()
            );
        }
        Commands::Watch => {
            println!("Starting watch mode...");
            sqlguard_runner::watch(config)?;
        }
        Commands::Audit { question, sql } => {
            let catalog = sqlguard_runner::load_catalog(&config.schema.path)?;
            let verdict = verify(&catalog, &question, &sql, config.repair.limit);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            if !verdict.accepted {
                std::process::exit(2);
            }
        }
        Commands::Schema => {
            let provider = sqlguard_runner::schema_provider(config)?;
            let catalog = provider.current();
            print!("{}", catalog.describe());
        }
        Commands::Init => unreachable!(),
    }
    Ok(())
}
