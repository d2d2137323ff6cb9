//! Built-in repair rules, in engine order.

use std::collections::BTreeSet;

use super::edit::{Edit, TokenBuffer};
use crate::analyzer::alias::{AliasMap, QualifierTarget};
use crate::analyzer::distance::within_one_edit;
use crate::analyzer::query::ParsedQuery;

/// A pure rewrite of query text.
///
/// `try_apply` returns `None` when the rule does not apply. The engine
/// re-parses any returned text and treats unparseable output as a decline,
/// so rules do not need to validate their own output.
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    fn try_apply(&self, sql: &str, query: &ParsedQuery) -> Option<String>;
}

/// Rewrites `base.column` to `alias.column` once `base` is aliased.
#[derive(Debug, Default, Clone, Copy)]
pub struct AliasQualifiersFix;

impl Rule for AliasQualifiersFix {
    fn name(&self) -> &str {
        "alias_qualifiers_fix"
    }

    fn try_apply(&self, sql: &str, query: &ParsedQuery) -> Option<String> {
        let aliases = AliasMap::resolve(query);
        if aliases.base_to_alias().is_empty() {
            return None;
        }
        let qualifiers = query.qualifiers();
        let buffer = TokenBuffer::new(sql)?;
        let mut edits = Vec::new();
        for chain in buffer.chains() {
            let len = chain.qualifier_len();
            if len == 0 || buffer.opens_call(chain.end) {
                continue;
            }
            let qualifier = buffer.joined(&chain.words[..len]);
            if !qualifiers.contains(&qualifier.as_str()) {
                continue;
            }
            if let QualifierTarget::AliasedBase { alias, .. } = aliases.classify(&qualifier) {
                edits.push(Edit::qualifier(&chain, &alias));
            }
        }
        buffer.apply(edits)
    }
}

/// Rewrites a qualifier that is one edit away from exactly one alias.
#[derive(Debug, Default, Clone, Copy)]
pub struct AliasTypoFix;

impl Rule for AliasTypoFix {
    fn name(&self) -> &str {
        "alias_typo_fix"
    }

    fn try_apply(&self, sql: &str, query: &ParsedQuery) -> Option<String> {
        let aliases = AliasMap::resolve(query);
        let known: Vec<&str> = aliases.alias_set().collect();
        if known.is_empty() {
            return None;
        }
        let qualifiers = query.qualifiers();
        let buffer = TokenBuffer::new(sql)?;
        let mut edits = Vec::new();
        for chain in buffer.chains() {
            if chain.qualifier_len() != 1 || buffer.opens_call(chain.end) {
                continue;
            }
            let qualifier = buffer.joined(&chain.words[..1]);
            if !qualifiers.contains(&qualifier.as_str())
                || aliases.classify(&qualifier) != QualifierTarget::Unknown
            {
                continue;
            }
            let candidates: Vec<&str> = known
                .iter()
                .copied()
                .filter(|alias| within_one_edit(&qualifier, alias))
                .collect();
            match candidates.as_slice() {
                [alias] => edits.push(Edit::qualifier(&chain, alias)),
                _ => tracing::trace!(
                    qualifier = %qualifier,
                    candidates = candidates.len(),
                    "no unique alias within one edit"
                ),
            }
        }
        buffer.apply(edits)
    }
}

/// Qualifies bare columns with the first referenced table. Queries with
/// subqueries, CTEs or derived tables are left alone.
///
/// With a single table the qualifier is exact. With joins it is a guess that
/// does not look at which table owns the column, so `verify` keeps the
/// unrepaired candidate whenever the guess adds blockers.
#[derive(Debug, Default, Clone, Copy)]
pub struct BareColumnQualify;

impl Rule for BareColumnQualify {
    fn name(&self) -> &str {
        "bare_column_qualify"
    }

    fn try_apply(&self, sql: &str, query: &ParsedQuery) -> Option<String> {
        let aliases = AliasMap::resolve(query);
        if !query.is_flat() || aliases.referenced_bases().is_empty() {
            return None;
        }
        let qualifier = aliases.first_qualifier()?;
        let targets: BTreeSet<&str> = query
            .columns()
            .iter()
            .filter(|c| c.qualifier.is_none())
            .map(|c| c.name.as_str())
            .filter(|name| {
                !query.select_aliases().iter().any(|a| a == name)
                    && !aliases.is_alias(name)
                    && !aliases.is_base(name)
                    && !aliases.is_scope(name)
            })
            .collect();
        if targets.is_empty() {
            return None;
        }

        let buffer = TokenBuffer::new(sql)?;
        let using = buffer.using_ranges();
        let mut edits = Vec::new();
        for chain in buffer.chains() {
            if chain.words.len() != 1 || chain.star {
                continue;
            }
            let index = chain.words[0];
            let Some(word) = buffer.word(index) else {
                continue;
            };
            if !targets.contains(word.as_str())
                || buffer.opens_call(chain.end)
                || buffer.is_declaration_site(index)
                || using.iter().any(|&(open, close)| open < index && index < close)
            {
                continue;
            }
            edits.push(Edit::prefix(index, qualifier, buffer.token(index)));
        }
        buffer.apply(edits)
    }
}

/// Adds the missing GROUP BY for an aggregate query.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupByCompletion;

impl Rule for GroupByCompletion {
    fn name(&self) -> &str {
        "group_by_completion"
    }

    fn try_apply(&self, sql: &str, query: &ParsedQuery) -> Option<String> {
        if query.group_by().is_some() || query.aggregates().is_empty() {
            return None;
        }
        if !query.is_simple_select() {
            tracing::trace!(rule = self.name(), "set operation left without GROUP BY");
            return None;
        }
        let mut exprs: Vec<&str> = Vec::new();
        for projection in query.projection().iter().filter(|p| p.is_grouping_candidate()) {
            if !exprs.contains(&projection.expr.as_str()) {
                exprs.push(&projection.expr);
            }
        }
        if exprs.is_empty() {
            return None;
        }

        let buffer = TokenBuffer::new(sql)?;
        let clause = format!("GROUP BY {}", exprs.join(", "));
        Some(match buffer.clause_after_group_by() {
            Some(pos) => format!(
                "{} {} {}",
                buffer.render_prefix(pos),
                clause,
                buffer.render_from(pos)
            ),
            None => format!("{} {}", buffer.render_trimmed(), clause),
        })
    }
}

/// Appends `LIMIT n` when the query has none.
#[derive(Debug, Clone, Copy)]
pub struct LimitEnforcement {
    limit: u32,
}

impl LimitEnforcement {
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
        }
    }
}

impl Rule for LimitEnforcement {
    fn name(&self) -> &str {
        "limit_enforcement"
    }

    fn try_apply(&self, sql: &str, query: &ParsedQuery) -> Option<String> {
        if query.has_limit() {
            return None;
        }
        let buffer = TokenBuffer::new(sql)?;
        Some(format!("{} LIMIT {}", buffer.render_trimmed(), self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(rule: &dyn Rule, sql: &str) -> Option<String> {
        let query = ParsedQuery::parse(sql).expect("Query should parse");
        rule.try_apply(sql, &query)
    }

    #[test]
    fn test_alias_qualifiers_fix() {
        assert_eq!(
            apply(&AliasQualifiersFix, "SELECT orders.amount, orders.* FROM orders o").as_deref(),
            Some("SELECT o.amount, o.* FROM orders o")
        );
        assert_eq!(
            apply(&AliasQualifiersFix, "SELECT public.orders.amount FROM public.orders o").as_deref(),
            Some("SELECT o.amount FROM public.orders o")
        );
        assert_eq!(apply(&AliasQualifiersFix, "SELECT orders.amount FROM orders"), None);
    }

    #[test]
    fn test_alias_typo_fix() {
        let sql = "SELECT od.amount FROM orders o JOIN users u ON u.id = od.user_id";
        assert_eq!(
            apply(&AliasTypoFix, sql).as_deref(),
            Some("SELECT o.amount FROM orders o JOIN users u ON u.id = o.user_id")
        );
    }

    #[test]
    fn test_alias_typo_fix_declines_ties() {
        let sql = "SELECT x.amount FROM orders o JOIN users u ON u.id = o.user_id";
        assert_eq!(apply(&AliasTypoFix, sql), None);
    }

    #[test]
    fn test_bare_column_qualify() {
        let sql = "SELECT amount, u.name, SUM(amount) AS total FROM orders o JOIN users u ON u.id = o.user_id ORDER BY total";
        assert_eq!(
            apply(&BareColumnQualify, sql).as_deref(),
            Some("SELECT o.amount, u.name, SUM(o.amount) AS total FROM orders o JOIN users u ON u.id = o.user_id ORDER BY total")
        );
        assert_eq!(
            apply(&BareColumnQualify, "SELECT city FROM orders o LIMIT 5").as_deref(),
            Some("SELECT o.city FROM orders o LIMIT 5")
        );
        assert_eq!(
            apply(&BareColumnQualify, "SELECT SUM(amount) FROM orders WHERE amount > 0").as_deref(),
            Some("SELECT SUM(orders.amount) FROM orders WHERE orders.amount > 0")
        );
        assert_eq!(apply(&BareColumnQualify, "SELECT o.city FROM orders o"), None);
        assert_eq!(
            apply(
                &BareColumnQualify,
                "WITH t AS (SELECT city FROM orders) SELECT city FROM t JOIN users u ON true"
            ),
            None
        );
    }

    #[test]
    fn test_group_by_completion() {
        assert_eq!(
            apply(&GroupByCompletion, "SELECT city, SUM(amount) FROM orders o ORDER BY 2 DESC LIMIT 3").as_deref(),
            Some("SELECT city, SUM(amount) FROM orders o GROUP BY city ORDER BY 2 DESC LIMIT 3")
        );
        assert_eq!(
            apply(&GroupByCompletion, "SELECT city, region, COUNT(*) FROM orders;").as_deref(),
            Some("SELECT city, region, COUNT(*) FROM orders GROUP BY city, region")
        );
        assert_eq!(apply(&GroupByCompletion, "SELECT SUM(amount) FROM orders"), None);
    }

    #[test]
    fn test_group_by_completion_declines_set_operations() {
        let sql = "SELECT city, SUM(amount) FROM orders UNION SELECT city, SUM(amount) FROM archive";
        assert_eq!(apply(&GroupByCompletion, sql), None);
    }

    #[test]
    fn test_limit_enforcement() {
        assert_eq!(
            apply(&LimitEnforcement::new(0), "SELECT id FROM orders ;").as_deref(),
            Some("SELECT id FROM orders LIMIT 1")
        );
        assert_eq!(apply(&LimitEnforcement::new(50), "SELECT id FROM orders LIMIT 5"), None);
    }
}
