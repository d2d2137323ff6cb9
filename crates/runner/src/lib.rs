mod config;
mod error;
mod provider;
mod report;

pub use config::{Config, OutputFormat, CONFIG_FILE};
pub use error::{Result, RunnerError};
pub use provider::{load_catalog, CachedSchemaProvider};
pub use report::{discover, Mode, QueryReport, QuerySource, Report, Reporter};

use std::sync::Arc;

/// Loads the configured schema behind a TTL cache.
pub fn schema_provider(config: &Config) -> Result<Arc<CachedSchemaProvider>> {
    Ok(Arc::new(CachedSchemaProvider::load(
        &config.schema.path,
        config.schema.ttl(),
    )?))
}

/// Analyzes every configured query as written. Fails with
/// [`RunnerError::ChecksFailed`] when any query has a blocker.
pub fn check(config: &Config) -> Result<Report> {
    check_with(config, |_, _| {})
}

/// Like [`check`], calling `on_query` with each query's report as soon as it
/// is analyzed, along with the number of queries discovered.
pub fn check_with<F>(config: &Config, mut on_query: F) -> Result<Report>
where
    F: FnMut(&QueryReport, usize),
{
    let mut reporter = Reporter::new(schema_provider(config)?, config.repair.limit);
    let sources = discover(&config.queries)?;
    for source in &sources {
        on_query(reporter.check(source), sources.len());
    }
    let report = reporter.finish(Mode::Check);
    if !report.is_clean() {
        return Err(RunnerError::ChecksFailed(report.failed));
    }
    Ok(report)
}

/// Repairs every configured query and writes the report.
pub fn run(config: &Config) -> Result<Report> {
    run_with(config, schema_provider(config)?)
}

fn run_with(config: &Config, provider: Arc<CachedSchemaProvider>) -> Result<Report> {
    let mut reporter = Reporter::new(provider, config.repair.limit);
    for source in discover(&config.queries)? {
        reporter.repair(&source);
    }
    let report = reporter.finish(Mode::Run);
    report.write(&config.output.path, config.output.format)?;
    Ok(report)
}

pub fn watch(config: &Config) -> Result<()> {
    use console::style;
    use notify::{event::EventKind, Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};

    println!("{}", style("SQLGuard").green().bold());
    println!("  {} Initial run...", style("➜").green());
    let provider = schema_provider(config)?;
    print_summary(&run_with(config, Arc::clone(&provider))?);

    println!("  {} Watching for changes...", style("➜").cyan());
    let (tx, rx) = std::sync::mpsc::channel();

    let mut watcher = RecommendedWatcher::new(tx, NotifyConfig::default())?;
    for path in config.watched_paths() {
        watcher.watch(path, RecursiveMode::Recursive)?;
    }

    let output_path = config
        .output
        .path
        .canonicalize()
        .unwrap_or_else(|_| config.output.path.clone());
    let schema_path = config
        .schema
        .path
        .canonicalize()
        .unwrap_or_else(|_| config.schema.path.clone());
    let current_dir = std::env::current_dir().ok();

    for res in rx {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                println!("  {} Watch error: {}", style("✖").red(), style(e).red());
                continue;
            }
        };

        if event.paths.contains(&output_path) {
            continue;
        }

        if !matches!(event.kind, EventKind::Modify(notify::event::ModifyKind::Data(_))) {
            continue;
        }

        if let Some(changed_path) = event.paths.first() {
            let relative_path = current_dir
                .as_deref()
                .and_then(|dir| changed_path.strip_prefix(dir).ok())
                .unwrap_or(changed_path)
                .display();

            println!(
                "\n{} Changed: {}",
                style("[⚡️CHECK]").yellow().bold(),
                style(relative_path).cyan()
            );
        }

        if event.paths.iter().any(|path| path.starts_with(&schema_path)) {
            if let Err(e) = provider.refresh() {
                println!(
                    "  {} Schema reload failed, keeping previous schema: {}",
                    style("✖").red(),
                    style(e).red()
                );
            }
        }

        match run_with(config, Arc::clone(&provider)) {
            Ok(report) => print_summary(&report),
            Err(e) => println!("  {} Run failed: {}", style("✖").red(), style(e).red()),
        }
    }

    Ok(())
}

fn print_summary(report: &Report) {
    use console::style;

    let repaired = report.queries.iter().filter(|q| q.repaired.is_some()).count();
    if report.is_clean() {
        println!(
            "  {} {} queries clean ({} repaired, {} warnings)",
            style("➜").green(),
            report.queries.len(),
            repaired,
            report.warnings
        );
    } else {
        println!(
            "  {} {} of {} queries still have blockers",
            style("✖").red(),
            style(report.failed).red().bold(),
            report.queries.len()
        );
    }
}
