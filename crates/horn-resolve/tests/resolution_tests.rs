//! End-to-end resolution scenarios: base data, conjunctions, rules,
//! follow-on steps, deduplication and exhaustion.

use horn_resolve::{
    KnowledgeBase, Pagination, PatternConfig, Registry, ResolverKind, Response, RuleConfig,
    Session,
};

async fn answers_until_exhausted(session: &mut Session, limit: usize) -> Vec<Vec<i64>> {
    let mut answers = Vec::new();
    for _ in 0..limit {
        match session.resolve_next().await {
            Some(Response::Answer(answer)) => answers.push(answer.concept_map().clone()),
            Some(Response::Exhausted(_)) => return answers,
            None => panic!("session channel closed unexpectedly"),
        }
    }
    panic!("no exhausted signal within {limit} pulls");
}

#[tokio::test]
async fn single_pattern_streams_base_data_then_exhausts() {
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(10).with_traversal(Pagination::new(3, 0))
    ]);
    let registry = Registry::new(kb);
    let mut session = Session::new(&registry, vec![10], Pagination::new(0, 0));

    let answers = answers_until_exhausted(&mut session, 10).await;
    assert_eq!(answers, vec![vec![10], vec![11], vec![12]]);
}

#[tokio::test]
async fn exhaustion_is_terminal_across_repeated_pulls() {
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(10).with_traversal(Pagination::new(3, 0))
    ]);
    let registry = Registry::new(kb);
    let mut session = Session::new(&registry, vec![10], Pagination::new(0, 0));

    let answers = answers_until_exhausted(&mut session, 10).await;
    assert_eq!(answers.len(), 3);

    for _ in 0..3 {
        match session.resolve_next().await {
            Some(Response::Exhausted(_)) => {}
            other => panic!("expected exhausted after exhaustion, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn conjunction_joins_two_patterns_without_duplicates() {
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(1).with_traversal(Pagination::new(2, 0)),
        PatternConfig::base(10).with_traversal(Pagination::new(1, 0)),
    ]);
    let registry = Registry::new(kb);
    let mut session = Session::new(&registry, vec![1, 10], Pagination::new(0, 0));

    let answers = answers_until_exhausted(&mut session, 20).await;
    assert_eq!(answers, vec![vec![1, 10], vec![2, 10]]);
}

#[tokio::test]
async fn conjunction_deduplicates_across_its_own_base_data_and_sub_resolvers() {
    // the conjunction's own traversal yields [1]; the planned concludable
    // re-derives [1] and adds [2] — [1] must come through exactly once
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(1).with_traversal(Pagination::new(2, 0))
    ]);
    let registry = Registry::new(kb);
    let mut session = Session::new(&registry, vec![1], Pagination::new(1, 0));

    let answers = answers_until_exhausted(&mut session, 20).await;
    assert_eq!(answers, vec![vec![1], vec![2]]);
}

#[tokio::test]
async fn rule_answers_are_inferred_and_carry_body_provenance() {
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(20)
            .with_traversal(Pagination::new(0, 0))
            .with_rule(RuleConfig::new(vec![5])),
        PatternConfig::base(5).with_traversal(Pagination::new(1, 0)),
    ]);
    let registry = Registry::new(kb);
    let mut session = Session::new(&registry, vec![20], Pagination::new(0, 0));

    let response = session.resolve_next().await.expect("response");
    let answer = response.into_answer().expect("an answer before exhaustion");
    assert_eq!(answer.concept_map(), &vec![5]);
    assert!(answer.is_inferred());

    // the conjunction recorded its inferred contributor
    assert_eq!(answer.derivations().len(), 1);
    let (contributor, contributed) = answer.derivations().iter().next().unwrap();
    assert_eq!(contributor.kind(), ResolverKind::Concludable);
    assert!(contributed.is_inferred());

    // the concludable recorded the rule, and the rule recorded its body
    let (rule, rule_answer) = contributed.derivations().iter().next().unwrap();
    assert_eq!(rule.kind(), ResolverKind::Rule);
    let (body, body_answer) = rule_answer.derivations().iter().next().unwrap();
    assert_eq!(body.kind(), ResolverKind::Conjunction);
    assert_eq!(body_answer.concept_map(), &vec![5]);

    match session.resolve_next().await {
        Some(Response::Exhausted(_)) => {}
        other => panic!("expected exhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn multi_answer_rules_stream_one_conclusion_per_pull() {
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(40)
            .with_traversal(Pagination::new(0, 0))
            .with_rule(RuleConfig::new(vec![1]).with_traversal(Pagination::new(0, 0))),
        PatternConfig::base(1).with_traversal(Pagination::new(2, 0)),
    ]);
    let registry = Registry::new(kb);
    let mut session = Session::new(&registry, vec![40], Pagination::new(0, 0));

    let mut answers = Vec::new();
    loop {
        match session.resolve_next().await.expect("response") {
            Response::Answer(answer) => {
                assert!(answer.is_inferred());
                answers.push(answer.concept_map().clone());
            }
            Response::Exhausted(_) => break,
        }
    }
    assert_eq!(answers, vec![vec![1], vec![2]]);
}

#[tokio::test]
async fn follow_on_steps_fold_before_drawing_base_data() {
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(3)
            .with_traversal(Pagination::new(2, 0))
            .with_then(4),
        PatternConfig::base(4).with_traversal(Pagination::new(2, 0)),
    ]);
    let registry = Registry::new(kb);
    let mut session = Session::new(&registry, vec![3], Pagination::new(0, 0));

    let answers = answers_until_exhausted(&mut session, 20).await;
    assert_eq!(answers, vec![vec![3], vec![4]]);
}

#[tokio::test]
async fn a_pattern_may_appear_twice_in_a_conjunction() {
    // both plan positions resolve through the single shared concludable;
    // answers are attributed to positions by how far the map has grown
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(5).with_traversal(Pagination::new(1, 0))
    ]);
    let registry = Registry::new(kb);
    let mut session = Session::new(&registry, vec![5, 5], Pagination::new(0, 0));

    let answers = answers_until_exhausted(&mut session, 20).await;
    assert_eq!(answers, vec![vec![5, 5]]);
}

#[tokio::test]
async fn top_level_answers_reach_the_recorder() {
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(20)
            .with_traversal(Pagination::new(0, 0))
            .with_rule(RuleConfig::new(vec![5])),
        PatternConfig::base(5).with_traversal(Pagination::new(1, 0)),
    ]);
    let registry = Registry::new(kb);
    let mut session = Session::new(&registry, vec![20], Pagination::new(0, 0));

    let answers = answers_until_exhausted(&mut session, 10).await;
    assert_eq!(answers, vec![vec![5]]);

    let records = registry.recorder().snapshot().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].concept_map, vec![5]);
    assert!(records[0].inferred);
    assert!(!records[0].derivations.is_empty());
}

#[tokio::test]
async fn answers_arrive_one_per_pull() {
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(10).with_traversal(Pagination::new(2, 0))
    ]);
    let registry = Registry::new(kb);
    let mut session = Session::new(&registry, vec![10], Pagination::new(0, 0));

    // one credit granted: exactly one response arrives, the second answer
    // stays buffered downstream until asked for
    let first = session.resolve_next().await.expect("response");
    assert_eq!(first.as_answer().expect("answer").concept_map(), &vec![10]);

    let second = session.resolve_next().await.expect("response");
    assert_eq!(second.as_answer().expect("answer").concept_map(), &vec![11]);
}
