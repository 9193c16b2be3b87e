//! Rule-body resolution: a one-input pass-through over a rule's "when"
//! clause.

use crate::config::RuleConfig;
use crate::derivations::Derivations;
use crate::error::ResolveError;
use crate::execution::{Behavior, ResolverCx};
use crate::message::{Answer, Request, ResolverKind, ResolverRef};
use crate::producer::ResponseProducer;

/// Evaluates exactly one rule's "when" conjunction. A rule never answers
/// from base data directly: every answer it produces is inferred and
/// carries a derivations entry for the body resolver.
pub struct RuleResolver {
    config: RuleConfig,
    body: Option<ResolverRef>,
}

impl RuleResolver {
    pub(crate) fn new(config: RuleConfig) -> Self {
        Self { config, body: None }
    }
}

impl Behavior for RuleResolver {
    const KIND: ResolverKind = ResolverKind::Rule;

    fn pattern_label(&self) -> String {
        format!("rule(when: {:?})", self.config.when)
    }

    fn initialise(&mut self, cx: &ResolverCx) {
        self.body = Some(
            cx.registry()
                .rule_body(self.config.when.clone(), self.config.traversal),
        );
    }

    fn create_producer(&mut self, request: &Request, _cx: &ResolverCx) -> ResponseProducer {
        let mut producer = ResponseProducer::new(None);
        if let Some(body) = &self.body {
            let to_downstream = Request::new(
                request.path().append(body.clone()),
                request.partial_concept_map().clone(),
                request.unifiers().clone(),
                Derivations::empty(),
            );
            producer.queue_downstream(to_downstream);
        }
        producer
    }

    fn receive_answer(
        &mut self,
        from_upstream: &Request,
        answer: Answer,
        producer: &mut ResponseProducer,
        _cx: &ResolverCx,
    ) -> Result<(), ResolveError> {
        let source = answer.source_request().receiver().clone();
        if source.kind() != ResolverKind::Conjunction {
            return Err(ResolveError::UnhandledSourceKind {
                kind: source.kind(),
                resolver: source.name().to_string(),
            });
        }

        let merged: i64 = answer.concept_map().iter().sum();
        let mut concept_map = from_upstream.partial_concept_map().clone();
        concept_map.push(merged);
        let derivations = answer
            .source_request()
            .partial_derivations()
            .with_answer(source, answer.clone());
        producer.buffer_answer(concept_map, derivations);
        Ok(())
    }
}
