use sqlguard_core::prelude::*;

#[test]
fn entity_and_time_window() {
    let question = "Total revenue in 'Can Tho' this month";

    let report = audit(question, "SELECT SUM(o.amount) FROM orders o LIMIT 1");
    assert!(!report.ok);
    assert!(report.missing.contains(&"missing literal 'Can Tho'".to_string()));

    let report = audit(
        question,
        "SELECT SUM(o.amount) FROM orders o WHERE o.city = 'Can Tho' LIMIT 1",
    );
    assert!(!report.ok);
    assert_eq!(
        report.missing,
        vec!["missing bounded time window (date_trunc)".to_string()]
    );
    assert_eq!(report.entities, vec!["Can Tho".to_string()]);
    assert_eq!(report.relative_time.as_deref(), Some("this month"));

    let report = audit(
        question,
        "SELECT SUM(o.amount) FROM orders o WHERE o.city = 'Can Tho' \
         AND o.created_at >= DATE_TRUNC('month', CURRENT_DATE) LIMIT 1",
    );
    assert!(report.ok);
    assert!(report.missing.is_empty());
}

#[test]
fn missing_literal() {
    let report = audit(
        "How many orders came from Ho Chi Minh",
        "SELECT COUNT(*) FROM orders o WHERE o.city = 'Hanoi' LIMIT 1",
    );
    assert_eq!(report.missing, vec!["missing literal 'Ho Chi Minh'".to_string()]);
}

#[test]
fn top_k_and_ordering() {
    let question = "Top 5 cities by revenue";

    let report = audit(question, "SELECT o.city FROM orders o LIMIT 10");
    assert_eq!(report.top_k_expected, Some(5));
    assert_eq!(report.top_k_found, Some(10));
    assert_eq!(
        report.missing,
        vec!["expect LIMIT 5".to_string(), "missing ORDER BY".to_string()]
    );

    let report = audit(
        question,
        "SELECT o.city, SUM(o.amount) AS revenue FROM orders o GROUP BY o.city ORDER BY revenue DESC LIMIT 5",
    );
    assert!(report.ok);

    let report = audit(
        question,
        "SELECT o.city, SUM(o.amount) AS revenue FROM orders o GROUP BY o.city ORDER BY 2 DESC FETCH FIRST 5 ROWS ONLY",
    );
    assert_eq!(report.top_k_found, Some(5));
    assert!(report.ok);
}

#[test]
fn question_lints() {
    let issues = lint(
        "top 3 orders this month",
        "SELECT o.id FROM orders o WHERE o.created_at >= '2024-06-01' LIMIT 3",
    );
    assert_eq!(
        issues,
        vec![
            Issue::new(IssueKind::MissingOrderByOnTopk, "top 3"),
            Issue::new(IssueKind::RelativeTimeHardcode, "this month"),
        ]
    );
    assert!(issues.iter().all(|issue| !issue.is_blocker()));
}

#[test]
fn coverage_of_unparseable_sql() {
    let report = audit("list all orders", "SELEC id FROM");
    assert!(!report.ok);
    assert_eq!(report.missing, vec!["sql-parse-failed".to_string()]);
}
