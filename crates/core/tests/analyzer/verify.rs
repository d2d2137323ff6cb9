use sqlguard_core::prelude::*;
use sqlguard_macros::catalog;

fn shop() -> SchemaCatalog {
    catalog!("orders(id, amount, city, user_id, created_at); users(id, name, city)")
}

#[test]
fn repaired_candidate_is_accepted() {
    let verdict = verify(
        &shop(),
        "Top 5 cities by revenue",
        "SELECT city, SUM(amount) AS revenue FROM orders o ORDER BY revenue DESC",
        5,
    );

    assert_eq!(
        verdict.candidate.sql,
        "SELECT o.city, SUM(o.amount) AS revenue FROM orders o GROUP BY o.city ORDER BY revenue DESC LIMIT 5"
    );
    assert_eq!(
        verdict.candidate.applied_rules,
        vec![
            "bare_column_qualify".to_string(),
            "group_by_completion".to_string(),
            "limit_enforcement".to_string()
        ]
    );
    assert!(verdict.accepted);
    assert!(verdict.coverage.ok);
    assert!(verdict.hints.is_empty());
}

#[test]
fn repair_never_makes_things_worse() {
    let sql = "SELECT name FROM orders o JOIN users u ON u.id = o.user_id LIMIT 5";
    let verdict = verify(&shop(), "list customer names", sql, 50);

    assert_eq!(verdict.candidate.sql, sql);
    assert!(verdict.candidate.applied_rules.is_empty());
    assert!(verdict.accepted);
}

#[test]
fn unknown_table_is_rejected_with_hints() {
    let verdict = verify(&shop(), "list orders", "SELECT o.id FROM ordrs o", 50);

    assert!(!verdict.accepted);
    assert_eq!(verdict.candidate.score(), (1, 0));
    assert!(verdict
        .hints
        .iter()
        .any(|hint| hint.contains("did you mean: orders")));
}

#[test]
fn unparseable_candidate() {
    let verdict = verify(&shop(), "list orders", "SELEC id FROM orders", 50);

    assert!(!verdict.accepted);
    assert_eq!(verdict.candidate.sql, "SELEC id FROM orders");
    assert_eq!(verdict.candidate.remaining_issues.len(), 1);
    assert_eq!(verdict.candidate.remaining_issues[0].kind, IssueKind::ParseError);
    assert_eq!(verdict.coverage.missing, vec!["sql-parse-failed".to_string()]);
    assert!(verdict
        .hints
        .iter()
        .any(|hint| hint.contains("valid PostgreSQL SELECT")));
}

#[test]
fn best_attempt_wins() {
    let verdict = verify_all(
        &shop(),
        "list orders",
        ["SELECT * FROM ordrs", "SELECT o.id FROM orders o"],
        50,
    )
    .expect("Verification should produce a verdict");

    assert_eq!(verdict.candidate.sql, "SELECT o.id FROM orders o LIMIT 50");
    assert!(verdict.accepted);

    let verdict = verify_all(
        &shop(),
        "list orders",
        ["SELECT o.id FROM orders o LIMIT 1", "SELECT o.amount FROM orders o LIMIT 1"],
        50,
    )
    .expect("Verification should produce a verdict");
    assert_eq!(verdict.candidate.sql, "SELECT o.id FROM orders o LIMIT 1");

    assert!(verify_all(&shop(), "list orders", Vec::<&str>::new(), 50).is_none());
}

#[test]
fn model_output_pipeline() {
    let response = "```sql\nSELECT orders.amount FROM orders o;\n```";
    let sql = extract_sql(response).expect("Extraction should succeed");
    let sql = sanitize(&sql, 100).expect("Sanitizing should succeed");
    let verdict = verify(&shop(), "order amounts", &sql, 100);

    assert!(verdict.candidate.sql.starts_with("SELECT o.amount FROM orders o"));
    assert!(verdict.candidate.sql.ends_with("LIMIT 100"));
    assert!(verdict.accepted);
}

#[test]
fn sanitize_rejects_writes() {
    let err = sanitize("DELETE FROM orders", 100).expect_err("Writes should be rejected");
    assert!(matches!(err, AnalyzerError::NotAQuery(_)));
}
