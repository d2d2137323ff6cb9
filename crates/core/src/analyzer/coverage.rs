//! Question-aware coverage audit.
//!
//! Cross-checks surface features of the natural-language question against
//! the structure of the candidate SQL. This pass has its own pass/fail
//! result and is independent of issue severities.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::issues::{Issue, IssueKind};
use super::query::ParsedQuery;

/// Functions that bound a query to a calendar window.
const TIME_WINDOW_FUNCTIONS: [&str; 2] = ["date_trunc", "date_bin"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub ok: bool,
    pub missing: Vec<String>,
    pub top_k_expected: Option<u32>,
    pub top_k_found: Option<u32>,
    pub order_metric_expected: Option<String>,
    pub entities: Vec<String>,
    pub relative_time: Option<String>,
}

/// Expectations extracted from a question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFeatures {
    pub top_k: Option<u32>,
    pub order_metric: Option<String>,
    pub entities: Vec<String>,
    pub relative_time: Option<String>,
}

fn top_k_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)\btop\s+(\d+)\b").expect("top-k regex should compile"))
}

fn order_metric_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\bby\s+([a-z_ ][a-z_ ]+)\b").expect("order metric regex should compile")
    })
}

fn relative_time_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)\b(this\s+month|today|yesterday|last\s+\d+\s+days|this\s+week|last\s+month|this\s+quarter|this\s+year)\b",
        )
        .expect("relative time regex should compile")
    })
}

fn quoted_literal_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"'([^']+)'").expect("quoted literal regex should compile"))
}

fn place_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\b(from|in)\s+([A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*)\b")
            .expect("place name regex should compile")
    })
}

fn date_trunc_call_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\bdate_trunc\s*\(").expect("date_trunc regex should compile")
    })
}

fn date_literal_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"'\d{4}-\d{2}-\d{2}[^']*'").expect("date literal regex should compile")
    })
}

impl QuestionFeatures {
    pub fn extract(question: &str) -> Self {
        let question = question.trim();
        let top_k = top_k_regex()
            .captures(question)
            .and_then(|caps| caps[1].parse().ok());
        let order_metric = order_metric_regex()
            .captures(question)
            .map(|caps| caps[1].trim().to_string())
            .filter(|metric| !metric.is_empty());
        let mut entities: Vec<String> = quoted_literal_regex()
            .captures_iter(question)
            .map(|caps| caps[1].to_string())
            .collect();
        if entities.is_empty() {
            entities.extend(
                place_name_regex()
                    .captures(question)
                    .map(|caps| caps[2].to_string()),
            );
        }
        let relative_time = relative_time_regex()
            .find(question)
            .map(|m| m.as_str().to_lowercase());
        Self {
            top_k,
            order_metric,
            entities,
            relative_time,
        }
    }
}

fn has_time_window(query: &ParsedQuery, sql: &str) -> bool {
    query
        .functions()
        .iter()
        .any(|name| TIME_WINDOW_FUNCTIONS.contains(&name.as_str()))
        || date_trunc_call_regex().is_match(sql)
}

/// Audits `sql` against the expectations in `question`.
pub fn audit(question: &str, sql: &str) -> CoverageReport {
    let features = QuestionFeatures::extract(question);
    let sql = sql.trim();
    let mut report = CoverageReport {
        top_k_expected: features.top_k,
        order_metric_expected: features.order_metric.clone(),
        entities: features.entities.clone(),
        relative_time: features.relative_time.clone(),
        ..CoverageReport::default()
    };

    let query = match ParsedQuery::parse(sql) {
        Ok(query) => query,
        Err(err) => {
            tracing::debug!(error = %err, "coverage audit on unparseable SQL");
            report.missing.push("sql-parse-failed".to_string());
            return report;
        }
    };

    report.top_k_found = query.limit();
    if let Some(k) = features.top_k {
        if report.top_k_found != Some(k) {
            report.missing.push(format!("expect LIMIT {}", k));
        }
    }

    if features.order_metric.is_some() && !query.order_by_present() {
        report.missing.push("missing ORDER BY".to_string());
    }

    for entity in &features.entities {
        if !query.string_literals().iter().any(|lit| lit == entity) {
            report.missing.push(format!("missing literal '{}'", entity));
        }
    }

    if features.relative_time.is_some() && !has_time_window(&query, sql) {
        report
            .missing
            .push("missing bounded time window (date_trunc)".to_string());
    }

    report.ok = report.missing.is_empty();
    report
}

/// Question-aware issues that complement the detector.
pub fn lint(question: &str, sql: &str) -> Vec<Issue> {
    let Ok(query) = ParsedQuery::parse(sql) else {
        return Vec::new();
    };
    let features = QuestionFeatures::extract(question);
    let mut issues = Vec::new();

    if let Some(k) = features.top_k {
        if !query.order_by_present() {
            issues.push(Issue::new(IssueKind::MissingOrderByOnTopk, format!("top {}", k)));
        }
    }

    if let Some(phrase) = features.relative_time {
        if date_literal_regex().is_match(sql) {
            issues.push(Issue::new(IssueKind::RelativeTimeHardcode, phrase));
        }
    }

    issues
}
