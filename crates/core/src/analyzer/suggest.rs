//! Table-name suggestions and regeneration hints.

use super::context::schema::bare_name;
use super::context::SchemaCatalog;
use super::distance::similarity;
use super::issues::{Issue, IssueKind};

/// Minimum similarity for a table to be suggested.
pub const SUGGESTION_CUTOFF: f64 = 0.45;

/// Up to `k` catalog tables (bare and qualified names) that look like `name`,
/// best first.
pub fn suggest_tables(name: &str, catalog: &SchemaCatalog, k: usize) -> Vec<String> {
    let mut pool: Vec<&str> = Vec::new();
    for table in catalog.table_names() {
        for candidate in [table, bare_name(table)] {
            if !pool.contains(&candidate) {
                pool.push(candidate);
            }
        }
    }

    let mut scored: Vec<(f64, &str)> = pool
        .into_iter()
        .map(|candidate| (similarity(name, candidate), candidate))
        .filter(|(score, _)| *score >= SUGGESTION_CUTOFF)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(k)
        .map(|(_, candidate)| candidate.to_string())
        .collect()
}

fn hint(issue: &Issue, catalog: &SchemaCatalog) -> Option<String> {
    let line = match issue.kind {
        IssueKind::MustUseAlias => {
            "- Use the table alias everywhere (e.g., `o.amount`, not `orders.amount`).".to_string()
        }
        IssueKind::AggregateWithoutGroupBy => {
            "- Include all non-aggregated select columns in GROUP BY.".to_string()
        }
        IssueKind::AmbiguousColumn => {
            "- Qualify ambiguous columns with the correct table alias.".to_string()
        }
        IssueKind::UnknownTable => {
            let suggestions = suggest_tables(&issue.detail, catalog, 3);
            if suggestions.is_empty() {
                format!("- Table `{}` does not exist in the schema.", issue.detail)
            } else {
                format!(
                    "- Table `{}` does not exist; did you mean: {}?",
                    issue.detail,
                    suggestions.join(", ")
                )
            }
        }
        IssueKind::UnknownColumn => format!(
            "- Column `{}` does not exist; use only columns from the schema snapshot.",
            issue.detail
        ),
        IssueKind::UnknownQualifier => format!(
            "- `{}` is not a table or alias introduced in FROM/JOIN.",
            issue.detail
        ),
        IssueKind::JoinWithoutOn => {
            format!("- Add an ON predicate to the JOIN on `{}`.", issue.detail)
        }
        IssueKind::ParseError => "- Return exactly one valid PostgreSQL SELECT statement.".to_string(),
        _ => return None,
    };
    Some(line)
}

/// Hint lines for a regeneration prompt, one per distinct hint, in issue order.
pub fn repair_hints(issues: &[Issue], catalog: &SchemaCatalog) -> Vec<String> {
    let mut hints: Vec<String> = Vec::new();
    for line in issues.iter().filter_map(|issue| hint(issue, catalog)) {
        if !hints.contains(&line) {
            hints.push(line);
        }
    }
    hints
}
