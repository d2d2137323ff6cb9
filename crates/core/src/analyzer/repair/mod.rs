//! Bounded fixed-point repair of candidate queries.
//!
//! The [`RepairEngine`] runs its rules in a fixed order for at most
//! [`MAX_PASSES`] passes. A rule's output is accepted only if it differs from
//! the current text and parses. A pass with no accepted change stops the
//! loop, so running the engine on its own output applies nothing.

pub(crate) mod edit;
pub mod rules;

use serde::Serialize;
use tracing::{debug, trace};

use super::detect::detect;
use super::issues::{kinds, Issue, IssueKind};
use super::query::ParsedQuery;
use rules::{
    AliasQualifiersFix, AliasTypoFix, BareColumnQualify, GroupByCompletion, LimitEnforcement, Rule,
};

/// Upper bound on outer passes.
pub const MAX_PASSES: u8 = 3;

/// Row cap used by [`RepairEngine::default`].
pub const DEFAULT_LIMIT: u32 = 50;

/// State of one repair attempt. Never shared between attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairSession {
    pub original: String,
    pub current: String,
    pub applied_rules: Vec<String>,
    pub remaining_issues: Vec<Issue>,
    pub pass_count: u8,
}

impl RepairSession {
    fn new(sql: &str) -> Self {
        Self {
            original: sql.to_string(),
            current: sql.to_string(),
            applied_rules: Vec::new(),
            remaining_issues: Vec::new(),
            pass_count: 0,
        }
    }
}

/// Result of [`RepairEngine::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairOutcome {
    pub sql: String,
    pub remaining: Vec<IssueKind>,
    pub remaining_issues: Vec<Issue>,
    pub applied: Vec<String>,
    pub passes: u8,
}

impl RepairOutcome {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

impl From<RepairSession> for RepairOutcome {
    fn from(session: RepairSession) -> Self {
        Self {
            sql: session.current,
            remaining: kinds(&session.remaining_issues),
            remaining_issues: session.remaining_issues,
            applied: session.applied_rules,
            passes: session.pass_count,
        }
    }
}

pub struct RepairEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RepairEngine {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl RepairEngine {
    /// The built-in rule set, with `limit` used by limit enforcement.
    pub fn new(limit: u32) -> Self {
        Self::with_rules(vec![
            Box::new(AliasQualifiersFix),
            Box::new(AliasTypoFix),
            Box::new(BareColumnQualify),
            Box::new(GroupByCompletion),
            Box::new(LimitEnforcement::new(limit)),
        ])
    }

    /// A custom, ordered rule set.
    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn apply(&self, sql: &str) -> RepairOutcome {
        let mut session = RepairSession::new(sql);
        let mut parsed = ParsedQuery::parse(sql).ok();

        while session.pass_count < MAX_PASSES {
            if parsed.is_none() {
                debug!("input does not parse, repair disabled");
                break;
            }
            session.pass_count += 1;
            let mut changed = false;

            for rule in &self.rules {
                let Some(query) = &parsed else { break };
                match rule.try_apply(&session.current, query) {
                    Some(next) if next != session.current => match ParsedQuery::parse(&next) {
                        Ok(reparsed) => {
                            debug!(rule = rule.name(), pass = session.pass_count, sql = %next, "rule applied");
                            session.current = next;
                            session.applied_rules.push(rule.name().to_string());
                            parsed = Some(reparsed);
                            changed = true;
                        }
                        Err(err) => {
                            trace!(rule = rule.name(), error = %err, "rewrite does not parse, rule declined");
                        }
                    },
                    _ => trace!(rule = rule.name(), "rule does not apply"),
                }
            }

            if !changed {
                break;
            }
        }

        session.remaining_issues = detect(&session.current);
        debug!(
            passes = session.pass_count,
            applied = session.applied_rules.len(),
            remaining = session.remaining_issues.len(),
            "repair finished"
        );
        session.into()
    }
}

/// Repairs `sql` with the built-in rules.
pub fn repair(sql: &str, limit: u32) -> RepairOutcome {
    RepairEngine::new(limit).apply(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order() {
        assert_eq!(
            RepairEngine::default().rule_names(),
            vec![
                "alias_qualifiers_fix",
                "alias_typo_fix",
                "bare_column_qualify",
                "group_by_completion",
                "limit_enforcement",
            ]
        );
    }

    #[test]
    fn test_unparseable_input_is_returned_untouched() {
        let outcome = repair("SELEC city FROM", 10);
        assert_eq!(outcome.sql, "SELEC city FROM");
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.passes, 0);
        assert_eq!(outcome.remaining, vec![IssueKind::ParseError]);
    }

    #[test]
    fn test_clean_query_needs_one_pass() {
        let outcome = repair("SELECT o.id FROM orders o LIMIT 5", 10);
        assert!(!outcome.changed());
        assert_eq!(outcome.passes, 1);
        assert!(outcome.remaining.is_empty());
    }

    #[test]
    fn test_rules_chain_within_one_pass() {
        let outcome = repair("SELECT orders.city, SUM(orders.amount) FROM orders o", 20);
        assert_eq!(
            outcome.sql,
            "SELECT o.city, SUM(o.amount) FROM orders o GROUP BY o.city LIMIT 20"
        );
        assert_eq!(
            outcome.applied,
            vec!["alias_qualifiers_fix", "group_by_completion", "limit_enforcement"]
        );
        assert_eq!(outcome.passes, 2);
        assert!(outcome.remaining.is_empty());
    }
}
