//! Conjunction resolution: the logical AND of an ordered pattern sequence.

use crate::config::Pagination;
use crate::derivations::Derivations;
use crate::error::ResolveError;
use crate::execution::{Behavior, ResolverCx};
use crate::message::{Answer, Request, ResolverKind, ResolverRef};
use crate::producer::ResponseProducer;
use crate::traversal::TupleTraversal;

/// ANDs together a fixed sequence of planned concludables, each contributing
/// one bound value to a growing concept map, left to right. Also serves as
/// the body resolver of a rule's "when" clause.
pub struct ConjunctionResolver {
    patterns: Vec<i64>,
    traversal: Pagination,
    planned: Vec<ResolverRef>,
}

impl ConjunctionResolver {
    pub(crate) fn new(patterns: Vec<i64>, traversal: Pagination) -> Self {
        Self {
            patterns,
            traversal,
            planned: Vec::new(),
        }
    }

    /// The plan position an answer belongs to. Each planned step appends
    /// exactly one binding, so the position follows from how far the map
    /// has grown past the upstream partial; the resolver registered at that
    /// position must be the answer's source.
    fn planned_index(&self, from_upstream: &Request, answer: &Answer) -> Option<usize> {
        let completed = answer
            .concept_map()
            .len()
            .saturating_sub(from_upstream.partial_concept_map().len());
        let index = completed.checked_sub(1)?;
        if self.planned.get(index) == Some(answer.source_request().receiver()) {
            Some(index)
        } else {
            None
        }
    }
}

impl Behavior for ConjunctionResolver {
    const KIND: ResolverKind = ResolverKind::Conjunction;

    fn pattern_label(&self) -> String {
        format!("conjunction({:?})", self.patterns)
    }

    fn initialise(&mut self, cx: &ResolverCx) {
        // visited strictly in plan order
        self.planned = self
            .patterns
            .iter()
            .map(|&pattern| cx.registry().concludable(pattern))
            .collect();
    }

    fn create_producer(&mut self, request: &Request, _cx: &ResolverCx) -> ResponseProducer {
        let mut producer = ResponseProducer::new(None);
        if self.traversal.size > 0 {
            producer.register_traversal(Box::new(TupleTraversal::new(
                self.patterns.clone(),
                self.traversal,
            )));
        }
        if let Some(first) = self.planned.first() {
            let to_downstream = Request::new(
                request.path().append(first.clone()),
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
        let Some(index) = self.planned_index(from_upstream, &answer) else {
            return match source.kind() {
                ResolverKind::Concludable => Err(ResolveError::UnplannedSource {
                    resolver: source.name().to_string(),
                }),
                kind => Err(ResolveError::UnhandledSourceKind {
                    kind,
                    resolver: source.name().to_string(),
                }),
            };
        };

        let mut derivations = answer.source_request().partial_derivations().clone();
        if answer.is_inferred() {
            derivations = derivations.with_answer(source, answer.clone());
        }
        let concept_map = answer.concept_map().clone();

        if index + 1 == self.planned.len() {
            // the full conjunction is satisfied
            tracing::debug!(map = ?concept_map, "conjunction candidate");
            if producer.record_produced(&concept_map) {
                producer.buffer_answer(concept_map, derivations);
            }
        } else {
            let next = self.planned[index + 1].clone();
            let to_downstream = Request::new(
                from_upstream.path().append(next),
                concept_map,
                answer.unifiers().clone(),
                derivations,
            );
            // deepen before revisiting earlier steps
            producer.queue_downstream_front(to_downstream);
        }
        Ok(())
    }
}
