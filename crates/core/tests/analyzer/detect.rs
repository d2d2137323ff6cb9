use sqlguard_core::prelude::*;
use sqlguard_macros::catalog;

fn shop() -> SchemaCatalog {
    catalog!("orders(id, amount, city, user_id, created_at); users(id, name, city)")
}

#[test]
fn unknown_table() {
    let issues = analyze("SELECT o.id FROM ordrs o LIMIT 5", &shop());

    assert_eq!(issues, vec![Issue::new(IssueKind::UnknownTable, "ordrs")]);
    assert!(issues[0].is_blocker());

    let hints = repair_hints(&issues, &shop());
    assert_eq!(hints.len(), 1);
    assert!(hints[0].contains("did you mean: orders"));
}

#[test]
fn reserved_word_table() {
    let catalog = catalog!("orders(id, amount); users(id, name)");
    let issues = validate_schema("SELECT * FROM order", &catalog);

    assert_eq!(issues, vec![Issue::new(IssueKind::UnknownTable, "order")]);
}

#[test]
fn clean_query() {
    let sql = "SELECT o.city, SUM(o.amount) AS revenue FROM orders o \
               JOIN users u ON u.id = o.user_id \
               GROUP BY o.city ORDER BY revenue DESC LIMIT 5";
    assert!(analyze(sql, &shop()).is_empty());
}

#[test]
fn detector_needs_no_catalog() {
    let issues = detect("SELECT * FROM orders JOIN users");
    let found: Vec<IssueKind> = issues.iter().map(|issue| issue.kind).collect();

    assert_eq!(
        found,
        vec![IssueKind::JoinWithoutOn, IssueKind::NoLimit, IssueKind::SelectStar]
    );
}

#[test]
fn alias_discipline() {
    let issues = detect("SELECT orders.amount, x.name FROM orders o LIMIT 5");

    assert!(issues.contains(&Issue::new(IssueKind::MustUseAlias, "orders.amount")));
    assert!(issues.contains(&Issue::new(IssueKind::UnknownQualifier, "x")));
}

#[test]
fn columns_against_catalog() {
    let issues = analyze("SELECT o.total FROM orders o LIMIT 5", &shop());
    assert_eq!(issues, vec![Issue::new(IssueKind::UnknownColumn, "o.total")]);

    let issues = analyze("SELECT total FROM orders LIMIT 5", &shop());
    assert_eq!(issues, vec![Issue::new(IssueKind::UnknownColumn, "total")]);

    let issues = analyze(
        "SELECT city FROM orders o JOIN users u ON u.id = o.user_id LIMIT 5",
        &shop(),
    );
    assert_eq!(issues, vec![Issue::new(IssueKind::AmbiguousColumn, "city")]);
    assert!(!issues[0].is_blocker());
}

#[test]
fn ddl_and_snapshot_catalogs_agree() {
    let from_ddl = SchemaCatalog::from_ddl(
        r#"
        CREATE TABLE orders (id INT, amount NUMERIC, city TEXT, user_id INT, created_at TIMESTAMP);
        CREATE TABLE users (id INT, name TEXT, city TEXT);
    "#,
    )
    .expect("Schema definition should parse");
    let from_snapshot = SchemaCatalog::from_snapshot(
        r#"{"tables": [
            {"name": "orders", "columns": ["id", "amount", "city", "user_id", "created_at"]},
            {"name": "users", "columns": [{"name": "id"}, {"name": "name"}, "city"]}
        ]}"#,
    )
    .expect("Snapshot should parse");

    assert_eq!(from_ddl, shop());
    assert_eq!(from_snapshot, shop());
}

#[test]
fn parse_errors_are_single_blockers() {
    for sql in ["SELEC 1", "", "SELECT 1; SELECT 2", "DELETE FROM orders"] {
        let issues = analyze(sql, &shop());
        assert_eq!(issues.len(), 1, "{:?}", sql);
        assert_eq!(issues[0].kind, IssueKind::ParseError);
    }
}
