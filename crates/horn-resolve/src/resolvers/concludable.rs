//! Single-pattern resolution.

use crate::config::PatternConfig;
use crate::error::ResolveError;
use crate::execution::{Behavior, ResolverCx};
use crate::message::{Answer, ConceptMap, Request, ResolverKind, ResolverRef};
use crate::producer::ResponseProducer;
use crate::traversal::ScalarTraversal;

/// Resolves one pattern, either from base data or by delegating to the
/// rules that conclude it. A pattern configured with a follow-on step
/// delegates there first and draws base data for each folded intermediate
/// result instead.
pub struct ConcludableResolver {
    config: PatternConfig,
    rule_refs: Vec<ResolverRef>,
    then_ref: Option<ResolverRef>,
}

impl ConcludableResolver {
    pub(crate) fn new(config: PatternConfig) -> Self {
        Self {
            config,
            rule_refs: Vec::new(),
            then_ref: None,
        }
    }

    /// Register a base-data traversal derived for the given folded value.
    /// Each base value v becomes the answer `partial ++ [v + pattern]`.
    fn register_traversal(
        &self,
        producer: &mut ResponseProducer,
        from_upstream: &Request,
        seed: i64,
    ) {
        if self.config.traversal.size == 0 {
            return;
        }
        tracing::debug!(pattern = self.config.id, seed, "registering base-data traversal");
        let pattern = self.config.id;
        let partial = from_upstream.partial_concept_map().clone();
        let rows = ScalarTraversal::new(self.config.traversal).map(move |value| {
            let mut concept_map = partial.clone();
            concept_map.push(value + pattern);
            concept_map
        });
        producer.register_traversal(Box::new(rows));
    }

    /// Queue one downstream candidate per rule capable of concluding this
    /// pattern, carrying the given partial result.
    fn queue_rule_candidates(
        &self,
        producer: &mut ResponseProducer,
        from_upstream: &Request,
        partial: &ConceptMap,
    ) {
        for rule in &self.rule_refs {
            let to_downstream = Request::new(
                from_upstream.path().append(rule.clone()),
                partial.clone(),
                from_upstream.unifiers().clone(),
                from_upstream.partial_derivations().clone(),
            );
            producer.queue_downstream(to_downstream);
        }
    }
}

impl Behavior for ConcludableResolver {
    const KIND: ResolverKind = ResolverKind::Concludable;

    fn pattern_label(&self) -> String {
        format!("concludable({})", self.config.id)
    }

    fn initialise(&mut self, cx: &ResolverCx) {
        self.rule_refs = self
            .config
            .rules
            .iter()
            .map(|rule| cx.registry().rule(rule))
            .collect();
        self.then_ref = self
            .config
            .then
            .map(|pattern| cx.registry().concludable(pattern));
    }

    fn create_producer(&mut self, request: &Request, _cx: &ResolverCx) -> ResponseProducer {
        let mut producer = ResponseProducer::new(None);
        if let Some(next) = &self.then_ref {
            let to_downstream = Request::new(
                request.path().append(next.clone()),
                request.partial_concept_map().clone(),
                request.unifiers().clone(),
                request.partial_derivations().clone(),
            );
            producer.queue_downstream(to_downstream);
        } else {
            let seed: i64 = request.partial_concept_map().iter().sum();
            self.register_traversal(&mut producer, request, seed);
            self.queue_rule_candidates(&mut producer, request, request.partial_concept_map());
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
        match source.kind() {
            ResolverKind::Concludable | ResolverKind::Conjunction => {
                // a follow-on step answered: the folded intermediate result
                // opens fresh base data and makes the rules applicable to it
                let folded: i64 = answer.concept_map().iter().sum();
                self.register_traversal(producer, from_upstream, folded);
                self.queue_rule_candidates(producer, from_upstream, answer.concept_map());
                Ok(())
            }
            ResolverKind::Rule => {
                let Some(concluded) = answer.concept_map().last().copied() else {
                    return Err(ResolveError::MalformedAnswer {
                        resolver: source.name().to_string(),
                    });
                };
                let mut concept_map = from_upstream.partial_concept_map().clone();
                concept_map.push(concluded);
                if producer.record_produced(&concept_map) {
                    let derivations = answer
                        .source_request()
                        .partial_derivations()
                        .with_answer(source, answer.clone());
                    producer.buffer_answer(concept_map, derivations);
                }
                Ok(())
            }
        }
    }
}
