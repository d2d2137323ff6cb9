use sqlguard_core::prelude::*;

fn scored(sql: &str, blockers: usize, warnings: usize) -> Candidate {
    let issues = std::iter::repeat(Issue::new(IssueKind::UnknownTable, "t"))
        .take(blockers)
        .chain(std::iter::repeat(Issue::new(IssueKind::NoLimit, "")).take(warnings))
        .collect();
    Candidate::new(sql, Vec::new(), issues)
}

#[test]
fn fewer_blockers_win() {
    let chosen = select(scored("a", 1, 5), scored("b", 0, 50));

    assert_eq!(chosen.sql, "b");
    assert_eq!(chosen.score(), (0, 50));
    assert!(chosen.is_clean());
}

#[test]
fn warnings_break_blocker_ties() {
    assert_eq!(select(scored("a", 1, 3), scored("b", 1, 2)).sql, "b");
}

#[test]
fn ties_keep_the_first() {
    assert_eq!(select(scored("a", 0, 1), scored("b", 0, 1)).sql, "a");

    let best = select_best(vec![
        scored("a", 2, 0),
        scored("b", 0, 1),
        scored("c", 0, 1),
        scored("d", 1, 0),
    ])
    .expect("Selection should find a candidate");
    assert_eq!(best.sql, "b");

    assert!(select_best(Vec::<Candidate>::new()).is_none());
}

#[test]
fn candidates_from_repair() {
    let candidate = Candidate::from_outcome(repair("SELECT orders.amount FROM orders o", 50));

    assert_eq!(candidate.sql, "SELECT o.amount FROM orders o LIMIT 50");
    assert_eq!(candidate.score(), (0, 0));
    assert_eq!(
        candidate.applied_rules,
        vec!["alias_qualifiers_fix".to_string(), "limit_enforcement".to_string()]
    );
}
