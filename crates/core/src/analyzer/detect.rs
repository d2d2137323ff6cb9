//! Issue detection.
//!
//! [`detect`] needs only the parsed query. [`validate_schema`] also needs a
//! catalog. Both short-circuit to a single `parse-error` issue when the input
//! does not parse as one query.

use super::alias::{AliasMap, QualifierTarget};
use super::context::SchemaCatalog;
use super::error::AnalyzerError;
use super::issues::{dedup, Issue, IssueKind};
use super::query::{JoinPredicate, ParsedQuery, ProjectionKind};

pub(crate) fn parse_issue(err: &AnalyzerError) -> Issue {
    let detail = match err {
        AnalyzerError::Parse(message) => message.clone(),
        other => other.to_string(),
    };
    Issue::new(IssueKind::ParseError, detail)
}

/// AST-only checks.
pub fn detect(sql: &str) -> Vec<Issue> {
    match ParsedQuery::parse(sql) {
        Ok(query) => detect_parsed(&query),
        Err(err) => vec![parse_issue(&err)],
    }
}

/// Catalog checks: table and column existence plus qualifier discipline.
pub fn validate_schema(sql: &str, catalog: &SchemaCatalog) -> Vec<Issue> {
    match ParsedQuery::parse(sql) {
        Ok(query) => validate_parsed(&query, catalog),
        Err(err) => vec![parse_issue(&err)],
    }
}

/// Both passes over a single parse, de-duplicated.
pub fn analyze(sql: &str, catalog: &SchemaCatalog) -> Vec<Issue> {
    match ParsedQuery::parse(sql) {
        Ok(query) => analyze_parsed(&query, catalog),
        Err(err) => vec![parse_issue(&err)],
    }
}

pub fn analyze_parsed(query: &ParsedQuery, catalog: &SchemaCatalog) -> Vec<Issue> {
    dedup(detect_parsed(query).into_iter().chain(validate_parsed(query, catalog)))
}

pub fn detect_parsed(query: &ParsedQuery) -> Vec<Issue> {
    let aliases = AliasMap::resolve(query);
    let mut issues = Vec::new();

    for join in query.joins() {
        if join.predicate == JoinPredicate::Missing {
            issues.push(Issue::new(IssueKind::JoinWithoutOn, join.table.clone()));
        }
    }

    if query.group_by().is_none() && !query.aggregates().is_empty() {
        let ungrouped: Vec<&str> = query
            .projection()
            .iter()
            .filter(|p| p.is_grouping_candidate())
            .map(|p| p.expr.as_str())
            .collect();
        if !ungrouped.is_empty() {
            issues.push(Issue::new(
                IssueKind::AggregateWithoutGroupBy,
                ungrouped.join(", "),
            ));
        }
    }

    issues.extend(qualifier_issues(query, &aliases, None));

    if !query.has_limit() {
        issues.push(Issue::new(IssueKind::NoLimit, ""));
    }

    if query
        .projection()
        .iter()
        .any(|p| p.kind == ProjectionKind::Wildcard)
    {
        issues.push(Issue::new(IssueKind::SelectStar, "*"));
    }

    dedup(issues)
}

pub fn validate_parsed(query: &ParsedQuery, catalog: &SchemaCatalog) -> Vec<Issue> {
    let aliases = AliasMap::resolve(query);
    let mut issues = Vec::new();

    for table in query.tables() {
        if query.is_cte(&table.name) {
            continue;
        }
        if !catalog.contains_table(&table.name) {
            issues.push(Issue::new(IssueKind::UnknownTable, table.name.clone()));
        }
    }

    issues.extend(qualifier_issues(query, &aliases, Some(catalog)));

    let known_bases: Vec<&str> = aliases
        .referenced_tables()
        .iter()
        .filter(|table| !query.is_cte(table))
        .map(String::as_str)
        .collect();
    let all_resolved = known_bases.iter().all(|table| catalog.contains_table(table));
    let mut resolved: Vec<&str> = known_bases
        .iter()
        .filter_map(|table| catalog.resolve_table(table))
        .collect();
    resolved.sort_unstable();
    resolved.dedup();

    for column in query.columns().iter().filter(|c| c.qualifier.is_none()) {
        if query.select_aliases().contains(&column.name) {
            continue;
        }
        let matches = resolved
            .iter()
            .filter(|table| catalog.has_column(table, &column.name))
            .count();
        match matches {
            0 if all_resolved && !query.has_opaque_scope() && !resolved.is_empty() => {
                issues.push(Issue::new(IssueKind::UnknownColumn, column.name.clone()));
            }
            0 | 1 => {}
            _ => issues.push(Issue::new(IssueKind::AmbiguousColumn, column.name.clone())),
        }
    }

    dedup(issues)
}

/// `must-use-alias` and `unknown-qualifier` for qualified references; with a
/// catalog, also `unknown-column` for qualified references that resolve.
fn qualifier_issues(
    query: &ParsedQuery,
    aliases: &AliasMap,
    catalog: Option<&SchemaCatalog>,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    for column in query.columns() {
        let Some(qualifier) = &column.qualifier else {
            continue;
        };
        let table = match aliases.classify(qualifier) {
            QualifierTarget::Alias(table) | QualifierTarget::Base(table) => table,
            QualifierTarget::AliasedBase { .. } => {
                issues.push(Issue::new(IssueKind::MustUseAlias, column.display()));
                continue;
            }
            QualifierTarget::Scope => continue,
            QualifierTarget::Unknown => {
                issues.push(Issue::new(IssueKind::UnknownQualifier, qualifier.clone()));
                continue;
            }
        };
        let Some(catalog) = catalog else {
            continue;
        };
        if query.is_cte(&table) {
            continue;
        }
        if let Some(columns) = catalog.columns(&table) {
            if !columns.contains(&column.name) {
                issues.push(Issue::new(IssueKind::UnknownColumn, column.display()));
            }
        }
    }
    for qualifier in query.qualifiers() {
        if matches!(aliases.classify(qualifier), QualifierTarget::Unknown) {
            issues.push(Issue::new(IssueKind::UnknownQualifier, qualifier));
        }
    }
    issues
}
