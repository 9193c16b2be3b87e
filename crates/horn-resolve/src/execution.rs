//! Routing and credit bookkeeping shared by every resolver actor.
//!
//! [`Execution`] is the generic half of a resolver: it owns the table of
//! [`ResponseProducer`]s (one per distinct inbound request), the router
//! mapping each issued downstream request back to the upstream request that
//! caused it, and the pump that turns granted credit into answers,
//! downstream dispatches, or the terminal exhausted signal. The
//! kind-specific half is a [`Behavior`].
//!
//! Every response — answer or exhausted — is sent in reply to an inbound
//! pull, so each dispatch pairs with at most one response and the credit
//! counters never need to go negative. A producer that runs dry with no
//! outstanding credit defers its exhausted signal to the next pull.

use std::collections::hash_map::Entry;

use ahash::AHashMap;
use horn_actor::{Actor, ActorRef};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::ResolveError;
use crate::message::{
    Answer, Exhausted, Request, ResolverKind, ResolverMessage, ResolverRef, Response,
};
use crate::producer::ResponseProducer;
use crate::registry::Registry;

/// Construction context handed to behaviors: the resolver's own handle and
/// the shared registry.
pub struct ResolverCx {
    self_ref: ResolverRef,
    registry: Registry,
}

impl ResolverCx {
    pub fn self_ref(&self) -> &ResolverRef {
        &self.self_ref
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// The kind-specific half of a resolver.
///
/// `initialise` runs once, on the first message — never at construction, so
/// a cyclic rule graph cannot recurse while its actors are being built.
pub trait Behavior: Send + 'static {
    const KIND: ResolverKind;

    /// Short label naming the pattern this resolver answers.
    fn pattern_label(&self) -> String;

    /// Resolve downstream actors through the registry.
    fn initialise(&mut self, cx: &ResolverCx);

    /// Build the flow-control state for a newly seen request.
    fn create_producer(&mut self, request: &Request, cx: &ResolverCx) -> ResponseProducer;

    /// Fold a downstream answer into the producer: buffer answers, register
    /// base-data traversals, queue further downstream requests.
    fn receive_answer(
        &mut self,
        from_upstream: &Request,
        answer: Answer,
        producer: &mut ResponseProducer,
        cx: &ResolverCx,
    ) -> Result<(), ResolveError>;
}

/// Generic resolver actor: behavior plus the shared protocol state.
pub struct Execution<B: Behavior> {
    cx: ResolverCx,
    behavior: B,
    producers: AHashMap<Request, ResponseProducer>,
    router: AHashMap<Request, Request>,
    root_sink: Option<UnboundedSender<Response>>,
    initialised: bool,
}

impl<B: Behavior> Actor for Execution<B> {
    type Message = ResolverMessage;
    type Error = ResolveError;

    fn handle(&mut self, message: ResolverMessage) -> Result<(), ResolveError> {
        if !self.initialised {
            self.behavior.initialise(&self.cx);
            self.initialised = true;
        }
        match message {
            ResolverMessage::Request(request) => self.on_request(request),
            ResolverMessage::Answer(answer) => self.on_answer(answer),
            ResolverMessage::Exhausted(exhausted) => self.on_exhausted(exhausted),
        }
    }
}

impl<B: Behavior> Execution<B> {
    fn on_request(&mut self, from_upstream: Request) -> Result<(), ResolveError> {
        tracing::debug!(resolver = %self.cx.self_ref.name(), request = %from_upstream, "received request");

        if from_upstream.receiver() != &self.cx.self_ref {
            return Err(ResolveError::MisroutedRequest {
                expected: self.cx.self_ref.name().to_string(),
                actual: from_upstream.receiver().name().to_string(),
            });
        }

        match self.producers.entry(from_upstream.clone()) {
            Entry::Occupied(_) => {}
            Entry::Vacant(vacant) => {
                vacant.insert(self.behavior.create_producer(&from_upstream, &self.cx));
            }
        }

        if self.producer(&from_upstream)?.finished() {
            // terminal state: the reply pairs with this very pull, no
            // credit is granted
            return self.respond_exhausted(&from_upstream);
        }
        self.producer(&from_upstream)?
            .increment_requests_from_upstream();
        self.pump(&from_upstream)
    }

    fn on_answer(&mut self, answer: Answer) -> Result<(), ResolveError> {
        tracing::debug!(
            resolver = %self.cx.self_ref.name(),
            source = %answer.source_request(),
            map = ?answer.concept_map(),
            "received answer"
        );

        let sent_downstream = answer.source_request().clone();
        let from_upstream = self.route(&sent_downstream)?;

        let producer = self.producer(&from_upstream)?;
        if !producer.decrement_requests_to_downstream() {
            return Err(ResolveError::CreditUnderflow {
                request: from_upstream.to_string(),
            });
        }
        // the answering downstream may hold more answers; queue it for
        // another pull
        if !producer.is_downstream_exhausted(&sent_downstream) {
            producer.queue_downstream(sent_downstream);
        }

        let Self {
            behavior,
            producers,
            cx,
            ..
        } = self;
        let producer = producers
            .get_mut(&from_upstream)
            .ok_or_else(|| ResolveError::UnknownRequest {
                request: from_upstream.to_string(),
            })?;
        behavior.receive_answer(&from_upstream, answer, producer, cx)?;

        self.pump(&from_upstream)
    }

    fn on_exhausted(&mut self, exhausted: Exhausted) -> Result<(), ResolveError> {
        tracing::debug!(
            resolver = %self.cx.self_ref.name(),
            source = %exhausted.source_request(),
            "received exhausted"
        );

        let sent_downstream = exhausted.source_request().clone();
        let from_upstream = self.route(&sent_downstream)?;

        let producer = self.producer(&from_upstream)?;
        if !producer.decrement_requests_to_downstream() {
            return Err(ResolveError::CreditUnderflow {
                request: from_upstream.to_string(),
            });
        }
        producer.mark_downstream_exhausted(sent_downstream);

        self.pump(&from_upstream)
    }

    /// The shared "try to answer now, else advance" step.
    fn pump(&mut self, from_upstream: &Request) -> Result<(), ResolveError> {
        // deliver as many answers as granted credit allows
        loop {
            let Some(buffered) = self.producer(from_upstream)?.next_answer() else {
                break;
            };
            let answer = Answer::new(
                from_upstream.clone(),
                buffered.concept_map,
                from_upstream.unifiers().clone(),
                self.behavior.pattern_label(),
                buffered.derivations,
            );
            self.respond_answer(from_upstream, answer)?;
        }

        // one more downstream pull if credit remains uncovered
        let producer = self.producer(from_upstream)?;
        if producer.unmet_upstream_credit() > 0 {
            if let Some(to_downstream) = producer.take_downstream() {
                producer.increment_requests_to_downstream();
                self.router
                    .insert(to_downstream.clone(), from_upstream.clone());
                tracing::debug!(
                    resolver = %self.cx.self_ref.name(),
                    downstream = %to_downstream,
                    "requesting from downstream"
                );
                to_downstream
                    .receiver()
                    .tell(ResolverMessage::Request(to_downstream.clone()));
            }
        }

        let producer = self.producer(from_upstream)?;
        if producer.requests_from_upstream() > 0 && producer.finished() {
            self.respond_exhausted(from_upstream)?;
        }
        Ok(())
    }

    fn respond_answer(
        &mut self,
        from_upstream: &Request,
        answer: Answer,
    ) -> Result<(), ResolveError> {
        if !self
            .producer(from_upstream)?
            .decrement_requests_from_upstream()
        {
            return Err(ResolveError::CreditUnderflow {
                request: from_upstream.to_string(),
            });
        }
        tracing::debug!(
            resolver = %self.cx.self_ref.name(),
            map = ?answer.concept_map(),
            inferred = answer.is_inferred(),
            "responding answer upstream"
        );
        match from_upstream.sender() {
            None => {
                // top-level answer: record durably, then hand to the session
                self.cx.registry.recorder().record(answer.clone());
                match &self.root_sink {
                    Some(sink) => {
                        let _ = sink.send(Response::Answer(answer));
                    }
                    None => {
                        tracing::warn!(
                            resolver = %self.cx.self_ref.name(),
                            "root answer dropped: resolver has no session sink"
                        );
                    }
                }
            }
            Some(sender) => sender.tell(ResolverMessage::Answer(answer)),
        }
        Ok(())
    }

    fn respond_exhausted(&mut self, from_upstream: &Request) -> Result<(), ResolveError> {
        self.producer(from_upstream)?.clear_requests_from_upstream();
        tracing::debug!(
            resolver = %self.cx.self_ref.name(),
            request = %from_upstream,
            "responding exhausted upstream"
        );
        let exhausted = Exhausted::new(from_upstream.clone());
        match from_upstream.sender() {
            None => {
                if let Some(sink) = &self.root_sink {
                    let _ = sink.send(Response::Exhausted(exhausted));
                }
            }
            Some(sender) => sender.tell(ResolverMessage::Exhausted(exhausted)),
        }
        Ok(())
    }

    fn route(&self, sent_downstream: &Request) -> Result<Request, ResolveError> {
        self.router
            .get(sent_downstream)
            .cloned()
            .ok_or_else(|| ResolveError::UnroutableResponse {
                request: sent_downstream.to_string(),
            })
    }

    fn producer(&mut self, request: &Request) -> Result<&mut ResponseProducer, ResolveError> {
        self.producers
            .get_mut(request)
            .ok_or_else(|| ResolveError::UnknownRequest {
                request: request.to_string(),
            })
    }
}

/// Spawn a resolver actor for the given behavior.
pub(crate) fn spawn_resolver<B: Behavior>(
    name: String,
    behavior: B,
    registry: Registry,
    root_sink: Option<UnboundedSender<Response>>,
) -> ResolverRef {
    let actor = horn_actor::spawn(name, |self_actor: ActorRef<ResolverMessage>| Execution {
        cx: ResolverCx {
            self_ref: ResolverRef::new(B::KIND, self_actor),
            registry,
        },
        behavior,
        producers: AHashMap::new(),
        router: AHashMap::new(),
        root_sink,
        initialised: false,
    });
    ResolverRef::new(B::KIND, actor)
}
