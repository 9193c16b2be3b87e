//! Per-request flow control and buffering.

use std::collections::VecDeque;
use std::fmt;

use ahash::AHashSet;

use crate::derivations::Derivations;
use crate::message::{ConceptMap, Request};

/// Lazy base-data iterator feeding a producer. Safe to abandon before
/// exhaustion.
pub type Traversal = Box<dyn Iterator<Item = ConceptMap> + Send>;

/// An answer computed ahead of upstream demand, held until credit is
/// granted.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedAnswer {
    pub concept_map: ConceptMap,
    pub derivations: Derivations,
}

/// Mutable state machine tracking one logical request a resolver is
/// servicing: credits granted by upstream, in-flight downstream requests,
/// buffered answers, the lazy base-data iterator, the queue of downstream
/// requests not yet dispatched, the set of downstream requests already
/// exhausted, and the set of concept maps already emitted.
///
/// Invariant, at every quiescent point:
/// `requests_from_upstream >= requests_to_downstream + buffered`.
/// The counters are unsigned; a would-be underflow is reported to the
/// caller instead of wrapping.
pub struct ResponseProducer {
    requests_from_upstream: usize,
    requests_to_downstream: usize,
    buffered: VecDeque<BufferedAnswer>,
    traversal: Option<Traversal>,
    available_downstream: VecDeque<Request>,
    exhausted_downstream: AHashSet<Request>,
    produced: AHashSet<ConceptMap>,
}

impl fmt::Debug for ResponseProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseProducer")
            .field("requests_from_upstream", &self.requests_from_upstream)
            .field("requests_to_downstream", &self.requests_to_downstream)
            .field("buffered", &self.buffered.len())
            .field("has_traversal", &self.traversal.is_some())
            .field("available_downstream", &self.available_downstream.len())
            .field("exhausted_downstream", &self.exhausted_downstream.len())
            .field("produced", &self.produced.len())
            .finish()
    }
}

impl ResponseProducer {
    pub fn new(traversal: Option<Traversal>) -> Self {
        Self {
            requests_from_upstream: 0,
            requests_to_downstream: 0,
            buffered: VecDeque::new(),
            traversal,
            available_downstream: VecDeque::new(),
            exhausted_downstream: AHashSet::new(),
            produced: AHashSet::new(),
        }
    }

    pub fn requests_from_upstream(&self) -> usize {
        self.requests_from_upstream
    }

    pub fn requests_to_downstream(&self) -> usize {
        self.requests_to_downstream
    }

    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    /// Grant one more upstream credit.
    pub fn increment_requests_from_upstream(&mut self) {
        self.requests_from_upstream += 1;
    }

    /// Consume one upstream credit (an answer was delivered). False on
    /// underflow.
    #[must_use]
    pub fn decrement_requests_from_upstream(&mut self) -> bool {
        match self.requests_from_upstream.checked_sub(1) {
            Some(value) => {
                self.requests_from_upstream = value;
                true
            }
            None => false,
        }
    }

    /// An exhausted reply satisfies every outstanding upstream credit.
    pub fn clear_requests_from_upstream(&mut self) {
        self.requests_from_upstream = 0;
    }

    pub fn increment_requests_to_downstream(&mut self) {
        self.requests_to_downstream += 1;
    }

    /// A downstream response arrived. False on underflow.
    #[must_use]
    pub fn decrement_requests_to_downstream(&mut self) -> bool {
        match self.requests_to_downstream.checked_sub(1) {
            Some(value) => {
                self.requests_to_downstream = value;
                true
            }
            None => false,
        }
    }

    /// Credit not yet covered by in-flight downstream work or buffered
    /// answers.
    pub fn unmet_upstream_credit(&self) -> usize {
        self.requests_from_upstream
            .saturating_sub(self.requests_to_downstream + self.buffered.len())
    }

    /// Install a base-data iterator. A drained iterator may be replaced by
    /// a later registration; an undrained one is extended, preserving
    /// enumeration order.
    pub fn register_traversal(&mut self, traversal: Traversal) {
        self.traversal = match self.traversal.take() {
            Some(existing) => Some(Box::new(existing.chain(traversal))),
            None => Some(traversal),
        };
    }

    pub fn has_traversal(&self) -> bool {
        self.traversal.is_some()
    }

    pub fn buffer_answer(&mut self, concept_map: ConceptMap, derivations: Derivations) {
        self.buffered.push_back(BufferedAnswer {
            concept_map,
            derivations,
        });
    }

    /// The next answer deliverable under the credit discipline, if any.
    ///
    /// Buffered answers deliver while any upstream credit is outstanding
    /// (they already count against the invariant); the base-data iterator
    /// is only drained for credit not covered by in-flight work or the
    /// buffer, and its output is filtered through the produced set. The
    /// iterator is dropped as soon as it runs dry.
    pub fn next_answer(&mut self) -> Option<BufferedAnswer> {
        if self.requests_from_upstream > 0 {
            if let Some(buffered) = self.buffered.pop_front() {
                return Some(buffered);
            }
        }
        if self.unmet_upstream_credit() == 0 {
            return None;
        }
        loop {
            let traversal = self.traversal.as_mut()?;
            match traversal.next() {
                Some(concept_map) => {
                    if self.produced.insert(concept_map.clone()) {
                        return Some(BufferedAnswer {
                            concept_map,
                            derivations: Derivations::empty(),
                        });
                    }
                }
                None => {
                    self.traversal = None;
                    return None;
                }
            }
        }
    }

    /// Queue a downstream request for later dispatch.
    pub fn queue_downstream(&mut self, request: Request) {
        if self.exhausted_downstream.contains(&request) {
            return;
        }
        self.available_downstream.push_back(request);
    }

    /// Queue a downstream request ahead of the others (deeper requests are
    /// explored first).
    pub fn queue_downstream_front(&mut self, request: Request) {
        if self.exhausted_downstream.contains(&request) {
            return;
        }
        self.available_downstream.push_front(request);
    }

    /// Take the next dispatchable downstream request, skipping any that
    /// exhausted since they were queued.
    pub fn take_downstream(&mut self) -> Option<Request> {
        while let Some(request) = self.available_downstream.pop_front() {
            if !self.exhausted_downstream.contains(&request) {
                return Some(request);
            }
        }
        None
    }

    pub fn has_available_downstream(&self) -> bool {
        self.available_downstream
            .iter()
            .any(|request| !self.exhausted_downstream.contains(request))
    }

    pub fn mark_downstream_exhausted(&mut self, request: Request) {
        self.exhausted_downstream.insert(request);
    }

    pub fn is_downstream_exhausted(&self, request: &Request) -> bool {
        self.exhausted_downstream.contains(request)
    }

    /// Record a concept map as emitted; true iff it was not seen before.
    #[must_use]
    pub fn record_produced(&mut self, concept_map: &ConceptMap) -> bool {
        self.produced.insert(concept_map.clone())
    }

    pub fn has_produced(&self, concept_map: &ConceptMap) -> bool {
        self.produced.contains(concept_map)
    }

    /// True exactly when no answer can ever be produced again: the
    /// base-data iterator is gone, nothing is buffered, and every
    /// downstream source is exhausted or was never queued. Monotone: once
    /// true it stays true.
    pub fn finished(&self) -> bool {
        self.traversal.is_none()
            && self.buffered.is_empty()
            && self.requests_to_downstream == 0
            && !self.has_available_downstream()
    }

    /// The flow-control invariant; checked by tests at quiescent points.
    pub fn holds_credit_invariant(&self) -> bool {
        self.requests_from_upstream >= self.requests_to_downstream + self.buffered.len()
    }
}
