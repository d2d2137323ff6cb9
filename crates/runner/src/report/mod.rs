//! Query discovery and per-query reports.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{OutputFormat, QueriesConfig};
use crate::error::{Result, RunnerError};
use sqlguard_core::analyzer::context::SchemaCatalogProvider;
use sqlguard_core::analyzer::detect::analyze;
use sqlguard_core::analyzer::issues::{counts, Issue};
use sqlguard_core::analyzer::verify;

/// Source extensions scanned for inline ``sql`...` `` templates.
const SOURCE_EXTENSIONS: [&str; 6] = ["ts", "js", "jsx", "tsx", "svelte", "vue"];

fn inline_query_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"sql`([^`]*)`").expect("inline query regex should compile"))
}

/// A query found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySource {
    /// File stem for query files, `stem:line` for inline templates
    pub name: String,
    pub path: PathBuf,
    pub inline: bool,
    pub sql: String,
}

/// Finds every query named by the `[queries]` section.
pub fn discover(queries: &QueriesConfig) -> Result<Vec<QuerySource>> {
    let mut sources = Vec::new();

    if let Some(path) = &queries.path {
        for entry in walk(path, &["sql"])? {
            let sql = fs::read_to_string(&entry)?;
            let name = entry
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unnamed_query")
                .to_string();
            sources.push(QuerySource {
                name,
                path: entry,
                inline: false,
                sql: sql.trim().to_string(),
            });
        }
    }

    for dir in queries.src.iter().flatten() {
        for entry in walk(dir, &SOURCE_EXTENSIONS)? {
            let content = fs::read_to_string(&entry)?;
            let stem = entry
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("inline")
                .to_string();
            for cap in inline_query_regex().captures_iter(&content) {
                let Some(query) = cap.get(1) else {
                    continue;
                };
                let line = content[..query.start()].matches('\n').count() + 1;
                sources.push(QuerySource {
                    name: format!("{}:{}", stem, line),
                    path: entry.clone(),
                    inline: true,
                    sql: query.as_str().trim().to_string(),
                });
            }
        }
    }

    debug!(count = sources.len(), "queries discovered");
    Ok(sources)
}

/// Files under `path` with one of `extensions`, in file name order.
fn walk(path: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|_| RunnerError::InvalidPath(path.to_path_buf()))?;
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if entry.file_type().is_file() && matches {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Analysis only
    Check,
    /// Analysis after repair
    Run,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryReport {
    pub name: String,
    pub path: PathBuf,
    pub inline: bool,
    pub sql: String,
    /// Repaired text, when it differs from `sql`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repaired: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub applied_rules: Vec<String>,
    pub issues: Vec<Issue>,
    pub blockers: u32,
    pub warnings: u32,
}

impl QueryReport {
    pub fn passed(&self) -> bool {
        self.blockers == 0
    }

    /// One status line, then one line per issue and the repair if any.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let mark = if self.passed() { "ok" } else { "FAIL" };
        let _ = writeln!(out, "[{}] {} ({})", mark, self.name, self.path.display());
        for issue in &self.issues {
            let severity = if issue.is_blocker() { "blocker" } else { "warning" };
            if issue.detail.is_empty() {
                let _ = writeln!(out, "    {} {}", severity, issue.kind);
            } else {
                let _ = writeln!(out, "    {} {}: {}", severity, issue.kind, issue.detail);
            }
        }
        if let Some(repaired) = &self.repaired {
            let _ = writeln!(out, "    repaired ({}): {}", self.applied_rules.join(", "), repaired);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub mode: Mode,
    pub queries: Vec<QueryReport>,
    pub blockers: u32,
    pub warnings: u32,
    /// Queries with at least one blocker
    pub failed: usize,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut out: String = self.queries.iter().map(QueryReport::render_text).collect();
        let _ = writeln!(
            out,
            "{} queries, {} failed, {} blockers, {} warnings",
            self.queries.len(),
            self.failed,
            self.blockers,
            self.warnings
        );
        out
    }

    pub fn write(&self, path: &Path, format: OutputFormat) -> Result<()> {
        fs::write(path, self.render(format)?)?;
        info!(path = %path.display(), queries = self.queries.len(), "report written");
        Ok(())
    }
}

/// Accumulates per-query results against one schema provider.
pub struct Reporter {
    provider: Arc<dyn SchemaCatalogProvider>,
    limit: u32,
    queries: Vec<QueryReport>,
}

impl Reporter {
    pub fn new(provider: Arc<dyn SchemaCatalogProvider>, limit: u32) -> Self {
        Self {
            provider,
            limit,
            queries: Vec::new(),
        }
    }

    /// Analyzes a query as written.
    pub fn check(&mut self, source: &QuerySource) -> &QueryReport {
        let catalog = self.provider.current();
        let issues = analyze(&source.sql, &catalog);
        self.push(source, None, Vec::new(), issues)
    }

    /// Repairs a query, then analyzes whichever text scores better.
    pub fn repair(&mut self, source: &QuerySource) -> &QueryReport {
        let catalog = self.provider.current();
        let verdict = verify(&catalog, "", &source.sql, self.limit);
        let candidate = verdict.candidate;
        let repaired = (candidate.sql != source.sql).then_some(candidate.sql);
        self.push(source, repaired, candidate.applied_rules, candidate.remaining_issues)
    }

    fn push(
        &mut self,
        source: &QuerySource,
        repaired: Option<String>,
        applied_rules: Vec<String>,
        issues: Vec<Issue>,
    ) -> &QueryReport {
        let (blockers, warnings) = counts(&issues);
        info!(query = %source.name, blockers, warnings, repaired = repaired.is_some(), "query analyzed");
        let index = self.queries.len();
        self.queries.push(QueryReport {
            name: source.name.clone(),
            path: source.path.clone(),
            inline: source.inline,
            sql: source.sql.clone(),
            repaired,
            applied_rules,
            issues,
            blockers,
            warnings,
        });
        &self.queries[index]
    }

    pub fn finish(self, mode: Mode) -> Report {
        let blockers = self.queries.iter().map(|q| q.blockers).sum();
        let warnings = self.queries.iter().map(|q| q.warnings).sum();
        let failed = self.queries.iter().filter(|q| !q.passed()).count();
        Report {
            mode,
            queries: self.queries,
            blockers,
            warnings,
            failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlguard_core::analyzer::context::StaticCatalog;
    use sqlguard_macros::catalog;

    fn reporter() -> Reporter {
        let catalog = catalog!("orders(id, amount)");
        Reporter::new(Arc::new(StaticCatalog::new(catalog)), 10)
    }

    fn source(sql: &str) -> QuerySource {
        QuerySource {
            name: "q".to_string(),
            path: PathBuf::from("q.sql"),
            inline: false,
            sql: sql.to_string(),
        }
    }

    #[test]
    fn test_check_and_repair() {
        let mut reporter = reporter();
        let checked = reporter.check(&source("SELECT orders.id FROM orders o")).clone();
        assert_eq!(checked.blockers, 1);
        assert_eq!(checked.warnings, 1);
        assert!(checked.repaired.is_none());

        let repaired = reporter.repair(&source("SELECT orders.id FROM orders o")).clone();
        assert_eq!(repaired.repaired.as_deref(), Some("SELECT o.id FROM orders o LIMIT 10"));
        assert!(repaired.passed());

        let report = reporter.finish(Mode::Run);
        assert_eq!(report.failed, 1);
        assert_eq!(report.blockers, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_render_text() {
        let mut reporter = reporter();
        reporter.check(&source("SELECT o.id FROM orders o"));
        let text = reporter.finish(Mode::Check).render_text();
        assert!(text.starts_with("[ok] q (q.sql)\n    warning no-limit\n"));
        assert!(text.ends_with("1 queries, 0 failed, 0 blockers, 1 warnings\n"));
    }
}
