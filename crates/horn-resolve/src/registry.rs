//! Shared, deduplicating actor instantiation.
//!
//! One resolver actor exists per resolvable signature across the whole
//! query execution: registration is memoized with first-writer-wins
//! semantics, which is what lets two branches of a query share a rule's
//! stream (and its dedup state) instead of re-resolving it, and what keeps
//! actor creation bounded on cyclic rule graphs. Resolvers register their
//! downstream actors lazily, on first message, so construction itself never
//! re-enters the registry.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{KnowledgeBase, Pagination, RuleConfig};
use crate::execution::spawn_resolver;
use crate::message::{ResolverRef, Response};
use crate::recorder::RecorderHandle;
use crate::resolvers::{ConcludableResolver, ConjunctionResolver, RuleResolver};

/// Cloneable handle to the registry shared by every resolver of one query
/// execution. Must be created inside a tokio runtime (it spawns the
/// execution recorder).
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    knowledge: KnowledgeBase,
    concludables: DashMap<i64, ResolverRef>,
    rules: DashMap<Vec<i64>, ResolverRef>,
    rule_bodies: DashMap<Vec<i64>, ResolverRef>,
    recorder: RecorderHandle,
}

impl Registry {
    pub fn new(knowledge: KnowledgeBase) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                knowledge,
                concludables: DashMap::new(),
                rules: DashMap::new(),
                rule_bodies: DashMap::new(),
                recorder: RecorderHandle::spawn(),
            }),
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.inner.knowledge
    }

    pub fn recorder(&self) -> &RecorderHandle {
        &self.inner.recorder
    }

    /// Memoized registration: the factory runs at most once per pattern id,
    /// atomically; every caller receives the single shared instance.
    pub fn register_concludable(
        &self,
        pattern: i64,
        factory: impl FnOnce(i64) -> ResolverRef,
    ) -> ResolverRef {
        self.inner
            .concludables
            .entry(pattern)
            .or_insert_with(|| factory(pattern))
            .value()
            .clone()
    }

    /// Memoized registration keyed by the rule's "when" body.
    pub fn register_rule(
        &self,
        when: Vec<i64>,
        factory: impl FnOnce(&[i64]) -> ResolverRef,
    ) -> ResolverRef {
        let key = when.clone();
        self.inner
            .rules
            .entry(key)
            .or_insert_with(|| factory(&when))
            .value()
            .clone()
    }

    /// Memoized registration of a rule-body conjunction, keyed by the body.
    pub fn register_rule_body(
        &self,
        when: Vec<i64>,
        factory: impl FnOnce(&[i64]) -> ResolverRef,
    ) -> ResolverRef {
        let key = when.clone();
        self.inner
            .rule_bodies
            .entry(key)
            .or_insert_with(|| factory(&when))
            .value()
            .clone()
    }

    /// The shared concludable for a pattern, configured from the knowledge
    /// base; created lazily on first reference.
    pub fn concludable(&self, pattern: i64) -> ResolverRef {
        let registry = self.clone();
        self.register_concludable(pattern, move |pattern| {
            let config = registry.inner.knowledge.pattern(pattern);
            spawn_resolver(
                format!("concludable-{pattern}"),
                ConcludableResolver::new(config),
                registry.clone(),
                None,
            )
        })
    }

    /// The shared rule resolver for a rule declaration.
    pub fn rule(&self, rule: &RuleConfig) -> ResolverRef {
        let registry = self.clone();
        let config = rule.clone();
        self.register_rule(rule.when.clone(), move |when| {
            spawn_resolver(
                format!("rule-{when:?}"),
                RuleResolver::new(config),
                registry,
                None,
            )
        })
    }

    /// The shared conjunction resolving a rule's "when" clause.
    pub fn rule_body(&self, when: Vec<i64>, traversal: Pagination) -> ResolverRef {
        let registry = self.clone();
        self.register_rule_body(when, move |when| {
            spawn_resolver(
                format!("rule-body-{when:?}"),
                ConjunctionResolver::new(when.to_vec(), traversal),
                registry,
                None,
            )
        })
    }

    /// Spawn the root conjunction of a query, wired to the session's answer
    /// sink. Roots are per query and deliberately not registered.
    pub fn root_conjunction(
        &self,
        patterns: Vec<i64>,
        traversal: Pagination,
        sink: UnboundedSender<Response>,
    ) -> ResolverRef {
        spawn_resolver(
            format!("root-conjunction-{patterns:?}"),
            ConjunctionResolver::new(patterns, traversal),
            self.clone(),
            Some(sink),
        )
    }
}
