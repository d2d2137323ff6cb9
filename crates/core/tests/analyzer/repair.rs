use sqlguard_core::prelude::*;

/// Rewrites one literal into another. Two of these undo each other forever.
struct Swap {
    name: &'static str,
    from: &'static str,
    to: &'static str,
}

impl Rule for Swap {
    fn name(&self) -> &str {
        self.name
    }

    fn try_apply(&self, sql: &str, _query: &ParsedQuery) -> Option<String> {
        sql.contains(self.from).then(|| sql.replacen(self.from, self.to, 1))
    }
}

const CORPUS: &[&str] = &[
    "SELECT orders.amount FROM orders o",
    "SELECT city, SUM(amount) FROM orders o",
    "SELECT SUM(amount) FROM orders",
    "SELECT od.amount, u.name FROM orders o JOIN users u ON u.id = od.user_id",
    "SELECT name, amount FROM orders o JOIN users u ON u.id = o.user_id ORDER BY amount DESC",
    "WITH t AS (SELECT city, amount FROM orders) SELECT city, COUNT(*) FROM t",
    "SELECT t.city FROM (SELECT city FROM orders) t",
    "SELECT city FROM orders GROUP BY city HAVING COUNT(*) > 1",
    "SELECT o.city, SUM(o.amount) FROM orders o GROUP BY o.city ORDER BY 2 DESC LIMIT 5",
    "SELECT * FROM users LIMIT 10",
    "SELEC broken FROM",
];

#[test]
fn alias_round_trip() {
    let outcome = repair("SELECT orders.amount FROM orders o", 50);

    assert!(outcome.sql.starts_with("SELECT o.amount FROM orders o"));
    assert!(outcome.applied.contains(&"alias_qualifiers_fix".to_string()));
    assert!(!outcome.remaining.contains(&IssueKind::MustUseAlias));
    assert_eq!(outcome.sql, "SELECT o.amount FROM orders o LIMIT 50");
}

#[test]
fn group_by_completion() {
    let outcome = repair("SELECT city, SUM(amount) FROM orders o", 50);

    assert_eq!(
        outcome.sql,
        "SELECT o.city, SUM(o.amount) FROM orders o GROUP BY o.city LIMIT 50"
    );
    assert!(!outcome.remaining.contains(&IssueKind::AggregateWithoutGroupBy));
    assert_eq!(
        outcome.applied,
        vec![
            "bare_column_qualify".to_string(),
            "group_by_completion".to_string(),
            "limit_enforcement".to_string()
        ]
    );
}

#[test]
fn lone_aggregate_needs_no_group_by() {
    let outcome = repair("SELECT SUM(amount) FROM orders", 50);

    assert!(!outcome.sql.contains("GROUP BY"));
    assert!(!outcome.remaining.contains(&IssueKind::AggregateWithoutGroupBy));
    assert_eq!(outcome.sql, "SELECT SUM(orders.amount) FROM orders LIMIT 50");
}

#[test]
fn set_operations_keep_their_aggregate_issue() {
    let outcome = repair(
        "SELECT city, SUM(amount) FROM orders UNION SELECT city, SUM(amount) FROM archive",
        50,
    );

    assert_eq!(
        outcome.sql,
        "SELECT city, SUM(amount) FROM orders UNION SELECT city, SUM(amount) FROM archive LIMIT 50"
    );
    assert_eq!(outcome.applied, vec!["limit_enforcement".to_string()]);
    assert!(outcome.remaining.contains(&IssueKind::AggregateWithoutGroupBy));
}

#[test]
fn typo_and_bare_columns() {
    let outcome = repair(
        "SELECT od.amount, u.name FROM orders o JOIN users u ON u.id = od.user_id",
        20,
    );
    assert_eq!(
        outcome.sql,
        "SELECT o.amount, u.name FROM orders o JOIN users u ON u.id = o.user_id LIMIT 20"
    );
    assert!(!outcome.remaining.contains(&IssueKind::UnknownQualifier));

    let outcome = repair(
        "SELECT name, amount FROM orders o JOIN users u ON u.id = o.user_id ORDER BY amount DESC",
        20,
    );
    assert_eq!(
        outcome.sql,
        "SELECT o.name, o.amount FROM orders o JOIN users u ON u.id = o.user_id ORDER BY o.amount DESC LIMIT 20"
    );
}

#[test]
fn single_table_bare_columns() {
    let outcome = repair("SELECT city FROM orders o LIMIT 5", 50);

    assert_eq!(outcome.sql, "SELECT o.city FROM orders o LIMIT 5");
    assert_eq!(outcome.applied, vec!["bare_column_qualify".to_string()]);
    assert!(outcome.remaining.is_empty());
}

#[test]
fn cte_columns_are_left_alone() {
    let outcome = repair(
        "WITH t AS (SELECT city, amount FROM orders) SELECT city, COUNT(*) FROM t",
        50,
    );
    assert_eq!(
        outcome.sql,
        "WITH t AS (SELECT city, amount FROM orders) SELECT city, COUNT(*) FROM t GROUP BY city LIMIT 50"
    );
    assert!(!outcome.applied.contains(&"bare_column_qualify".to_string()));
}

#[test]
fn repair_is_idempotent() {
    for sql in CORPUS {
        let once = repair(sql, 50);
        let twice = repair(&once.sql, 50);

        assert_eq!(twice.sql, once.sql, "second repair changed {:?}", sql);
        assert!(twice.applied.is_empty(), "second repair applied rules to {:?}", sql);
    }
}

#[test]
fn repair_never_breaks_parsing() {
    for sql in CORPUS.iter().filter(|sql| ParsedQuery::parse(sql).is_ok()) {
        let outcome = repair(sql, 50);
        assert!(
            ParsedQuery::parse(&outcome.sql).is_ok(),
            "repair of {:?} produced unparseable {:?}",
            sql,
            outcome.sql
        );
    }
}

#[test]
fn unparseable_input_is_untouched() {
    let outcome = repair("SELEC broken FROM", 50);

    assert_eq!(outcome.sql, "SELEC broken FROM");
    assert_eq!(outcome.passes, 0);
    assert_eq!(outcome.remaining, vec![IssueKind::ParseError]);
}

#[test]
fn passes_are_capped() {
    let engine = RepairEngine::with_rules(vec![
        Box::new(Swap {
            name: "one_to_two",
            from: "SELECT 1",
            to: "SELECT 2",
        }),
        Box::new(Swap {
            name: "two_to_one",
            from: "SELECT 2",
            to: "SELECT 1",
        }),
    ]);

    let outcome = engine.apply("SELECT 1");

    assert_eq!(outcome.passes, 3);
    assert_eq!(outcome.applied.len(), 6);
    assert_eq!(outcome.sql, "SELECT 1");
}

#[test]
fn unparseable_rewrites_are_declined() {
    let engine = RepairEngine::with_rules(vec![Box::new(Swap {
        name: "break_it",
        from: "SELECT",
        to: "SELEC",
    })]);

    let outcome = engine.apply("SELECT o.id FROM orders o LIMIT 1");

    assert!(!outcome.changed());
    assert_eq!(outcome.passes, 1);
    assert_eq!(outcome.sql, "SELECT o.id FROM orders o LIMIT 1");
}
