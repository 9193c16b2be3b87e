//! Registry memoization: at most one resolver per signature, shared across
//! every branch of a query execution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use horn_actor::Actor;
use horn_resolve::{
    KnowledgeBase, Pagination, PatternConfig, Registry, ResolverKind, ResolverMessage,
    ResolverRef, Response, RuleConfig, Session,
};

struct NullResolver;

impl Actor for NullResolver {
    type Message = ResolverMessage;
    type Error = std::convert::Infallible;

    fn handle(&mut self, _message: ResolverMessage) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn null_ref(kind: ResolverKind) -> ResolverRef {
    ResolverRef::new(kind, horn_actor::spawn("null", |_| NullResolver))
}

#[tokio::test]
async fn factory_runs_at_most_once_under_concurrent_registration() {
    let registry = Registry::new(KnowledgeBase::default());
    let creations = Arc::new(AtomicUsize::new(0));

    let mut joins = Vec::new();
    for _ in 0..32 {
        let registry = registry.clone();
        let creations = Arc::clone(&creations);
        joins.push(tokio::spawn(async move {
            registry.register_concludable(7, |_| {
                creations.fetch_add(1, Ordering::SeqCst);
                null_ref(ResolverKind::Concludable)
            })
        }));
    }

    let mut refs = Vec::new();
    for join in joins {
        refs.push(join.await.unwrap());
    }

    assert_eq!(creations.load(Ordering::SeqCst), 1);
    let first = &refs[0];
    assert!(refs.iter().all(|reference| reference == first));
}

#[tokio::test]
async fn rule_registration_is_keyed_by_body() {
    let registry = Registry::new(KnowledgeBase::default());

    let a = registry.rule(&RuleConfig::new(vec![1, 2]));
    let b = registry.rule(&RuleConfig::new(vec![1, 2]));
    let c = registry.rule(&RuleConfig::new(vec![2, 1]));

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[tokio::test]
async fn sibling_queries_share_one_concludable_instance() {
    let kb = KnowledgeBase::new(vec![
        PatternConfig::base(7).with_traversal(Pagination::new(2, 0))
    ]);
    let registry = Registry::new(kb);

    let mut left = Session::new(&registry, vec![7], Pagination::new(0, 0));
    let mut right = Session::new(&registry, vec![7], Pagination::new(0, 0));

    // both branches resolve through the same shared actor...
    assert_eq!(registry.concludable(7), registry.concludable(7));

    // ...and each gets its own full answer stream
    for session in [&mut left, &mut right] {
        match session.resolve_next().await {
            Some(Response::Answer(answer)) => assert_eq!(answer.concept_map(), &vec![7]),
            other => panic!("expected an answer, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn rule_bodies_are_shared_between_rules_with_the_same_when() {
    let registry = Registry::new(KnowledgeBase::default());
    let a = registry.rule_body(vec![3, 4], Pagination::new(1, 0));
    let b = registry.rule_body(vec![3, 4], Pagination::new(1, 0));
    assert_eq!(a, b);
    assert_eq!(a.kind(), ResolverKind::Conjunction);
}
