//! Typed, severity-tagged defects found in a candidate query.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

/// How serious an issue is. A [`Severity::Blocker`] must be resolved before a
/// query is accepted; a [`Severity::Warning`] is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Blocker,
    Warning,
}

/// The closed set of defects the detector and coverage lints can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    ParseError,
    UnknownTable,
    UnknownColumn,
    AmbiguousColumn,
    MustUseAlias,
    UnknownQualifier,
    JoinWithoutOn,
    AggregateWithoutGroupBy,
    NoLimit,
    SelectStar,
    MissingOrderByOnTopk,
    RelativeTimeHardcode,
}

impl IssueKind {
    pub const ALL: [IssueKind; 12] = [
        IssueKind::ParseError,
        IssueKind::UnknownTable,
        IssueKind::UnknownColumn,
        IssueKind::AmbiguousColumn,
        IssueKind::MustUseAlias,
        IssueKind::UnknownQualifier,
        IssueKind::JoinWithoutOn,
        IssueKind::AggregateWithoutGroupBy,
        IssueKind::NoLimit,
        IssueKind::SelectStar,
        IssueKind::MissingOrderByOnTopk,
        IssueKind::RelativeTimeHardcode,
    ];

    /// Severity is fixed per kind.
    pub fn severity(self) -> Severity {
        match self {
            IssueKind::ParseError
            | IssueKind::UnknownTable
            | IssueKind::UnknownColumn
            | IssueKind::MustUseAlias
            | IssueKind::UnknownQualifier
            | IssueKind::JoinWithoutOn
            | IssueKind::AggregateWithoutGroupBy => Severity::Blocker,
            IssueKind::AmbiguousColumn
            | IssueKind::NoLimit
            | IssueKind::SelectStar
            | IssueKind::MissingOrderByOnTopk
            | IssueKind::RelativeTimeHardcode => Severity::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::ParseError => "parse-error",
            IssueKind::UnknownTable => "unknown-table",
            IssueKind::UnknownColumn => "unknown-column",
            IssueKind::AmbiguousColumn => "ambiguous-column",
            IssueKind::MustUseAlias => "must-use-alias",
            IssueKind::UnknownQualifier => "unknown-qualifier",
            IssueKind::JoinWithoutOn => "join-without-on",
            IssueKind::AggregateWithoutGroupBy => "aggregate-without-group-by",
            IssueKind::NoLimit => "no-limit",
            IssueKind::SelectStar => "select-star",
            IssueKind::MissingOrderByOnTopk => "missing-order-by-on-topk",
            IssueKind::RelativeTimeHardcode => "relative-time-hardcode",
        }
    }

    pub fn is_blocker(self) -> bool {
        self.severity() == Severity::Blocker
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single defect. Two issues are the same issue when kind and detail match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub detail: String,
    pub severity: Severity,
}

impl Issue {
    pub fn new(kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            severity: kind.severity(),
        }
    }

    pub fn is_blocker(&self) -> bool {
        self.severity == Severity::Blocker
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.detail)
        }
    }
}

/// Removes duplicate `(kind, detail)` pairs, keeping first occurrences in order.
pub fn dedup(issues: impl IntoIterator<Item = Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|issue| seen.insert((issue.kind, issue.detail.clone())))
        .collect()
}

/// Counts `(blockers, warnings)`.
pub fn counts(issues: &[Issue]) -> (u32, u32) {
    issues.iter().fold((0, 0), |(b, w), issue| match issue.severity {
        Severity::Blocker => (b + 1, w),
        Severity::Warning => (b, w + 1),
    })
}

/// Issue kinds in order, without repeats.
pub fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
    let mut out: Vec<IssueKind> = Vec::new();
    for issue in issues {
        if !out.contains(&issue.kind) {
            out.push(issue.kind);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_table() {
        let blockers: Vec<_> = IssueKind::ALL
            .iter()
            .filter(|k| k.is_blocker())
            .map(|k| k.as_str())
            .collect();
        assert_eq!(
            blockers,
            vec![
                "parse-error",
                "unknown-table",
                "unknown-column",
                "must-use-alias",
                "unknown-qualifier",
                "join-without-on",
                "aggregate-without-group-by",
            ]
        );
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let issues = vec![
            Issue::new(IssueKind::NoLimit, ""),
            Issue::new(IssueKind::UnknownTable, "order"),
            Issue::new(IssueKind::NoLimit, ""),
            Issue::new(IssueKind::UnknownTable, "usr"),
        ];
        let deduped = dedup(issues);
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0].kind, IssueKind::NoLimit);
        assert_eq!(deduped[2].detail, "usr");
        assert_eq!(counts(&deduped), (2, 1));
    }

    #[test]
    fn test_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&Issue::new(IssueKind::AggregateWithoutGroupBy, "city"))
            .expect("Issue should serialize");
        assert_eq!(
            json,
            r#"{"kind":"aggregate-without-group-by","detail":"city","severity":"blocker"}"#
        );
    }
}
