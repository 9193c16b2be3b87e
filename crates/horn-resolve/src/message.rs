//! Wire messages exchanged between resolver actors.
//!
//! A [`Request`] travels down the resolver tree asking for one more answer;
//! a [`Response`] travels back up, either carrying an [`Answer`] or the
//! terminal [`Exhausted`] signal. Routing is positional: every request
//! carries the [`Path`] of actors it has traversed, and a response is
//! addressed by the `source_request` it replies to.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use horn_actor::{ActorId, ActorRef};

use crate::derivations::Derivations;

/// Ordered sequence of bound values for a query fragment.
pub type ConceptMap = Vec<i64>;

/// Opaque substitution descriptor carried alongside requests and answers.
/// The protocol never interprets it; it only participates in request
/// identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Unifiers(Vec<String>);

impl Unifiers {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The three resolver behaviors sharing the resolution protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverKind {
    Concludable,
    Conjunction,
    Rule,
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverKind::Concludable => write!(f, "concludable"),
            ResolverKind::Conjunction => write!(f, "conjunction"),
            ResolverKind::Rule => write!(f, "rule"),
        }
    }
}

/// Identity-keyed handle to a resolver actor, tagged with its kind so that
/// a receiver can fold answers without inspecting the actor behind the
/// handle.
#[derive(Clone)]
pub struct ResolverRef {
    kind: ResolverKind,
    actor: ActorRef<ResolverMessage>,
}

impl ResolverRef {
    pub fn new(kind: ResolverKind, actor: ActorRef<ResolverMessage>) -> Self {
        Self { kind, actor }
    }

    pub fn kind(&self) -> ResolverKind {
        self.kind
    }

    pub fn id(&self) -> ActorId {
        self.actor.id()
    }

    pub fn name(&self) -> &str {
        self.actor.name()
    }

    pub fn tell(&self, message: ResolverMessage) {
        self.actor.tell(message);
    }
}

impl PartialEq for ResolverRef {
    fn eq(&self, other: &Self) -> bool {
        self.actor == other.actor
    }
}

impl Eq for ResolverRef {}

impl Hash for ResolverRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.actor.hash(state);
    }
}

impl fmt::Debug for ResolverRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]{}", self.kind, self.id(), self.name())
    }
}

/// Immutable, append-only chain of the resolver actors a request has
/// traversed. The last element is the current receiver, the second-to-last
/// the immediate upstream sender.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    hops: Arc<Vec<ResolverRef>>,
}

impl Path {
    /// A path containing only its origin. Paths are never empty.
    pub fn root(origin: ResolverRef) -> Self {
        Self {
            hops: Arc::new(vec![origin]),
        }
    }

    /// Extend the chain by one hop, leaving `self` untouched.
    pub fn append(&self, next: ResolverRef) -> Self {
        let mut hops = self.hops.as_ref().clone();
        hops.push(next);
        Self {
            hops: Arc::new(hops),
        }
    }

    /// The receiver of a request carrying this path.
    pub fn current(&self) -> &ResolverRef {
        self.hops.last().expect("a path is never empty")
    }

    /// The immediate upstream, or None at the root.
    pub fn sender(&self) -> Option<&ResolverRef> {
        if self.hops.len() < 2 {
            None
        } else {
            self.hops.get(self.hops.len() - 2)
        }
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}

/// Immutable request for one more answer to a query fragment.
///
/// Two requests are the same request — for routing and for credit
/// accounting — iff their path, partial concept map and unifiers are equal.
/// The provenance accumulated so far is carried along but excluded from
/// identity.
#[derive(Clone, Debug)]
pub struct Request {
    path: Path,
    partial_concept_map: ConceptMap,
    unifiers: Unifiers,
    partial_derivations: Derivations,
}

impl Request {
    pub fn new(
        path: Path,
        partial_concept_map: ConceptMap,
        unifiers: Unifiers,
        partial_derivations: Derivations,
    ) -> Self {
        Self {
            path,
            partial_concept_map,
            unifiers,
            partial_derivations,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn receiver(&self) -> &ResolverRef {
        self.path.current()
    }

    pub fn sender(&self) -> Option<&ResolverRef> {
        self.path.sender()
    }

    pub fn partial_concept_map(&self) -> &ConceptMap {
        &self.partial_concept_map
    }

    pub fn unifiers(&self) -> &Unifiers {
        &self.unifiers
    }

    pub fn partial_derivations(&self) -> &Derivations {
        &self.partial_derivations
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.partial_concept_map == other.partial_concept_map
            && self.unifiers == other.unifiers
    }
}

impl Eq for Request {}

impl Hash for Request {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.partial_concept_map.hash(state);
        self.unifiers.hash(state);
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sender = self
            .sender()
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| "<root>".to_string());
        write!(
            f,
            "req(to: {}, from: {}, map: {:?})",
            self.receiver().name(),
            sender,
            self.partial_concept_map
        )
    }
}

/// One answer to a request, together with the provenance of its inference.
#[derive(Clone, Debug, PartialEq)]
pub struct Answer {
    source_request: Request,
    concept_map: ConceptMap,
    unifiers: Unifiers,
    pattern_answered: String,
    derivations: Derivations,
}

impl Answer {
    pub fn new(
        source_request: Request,
        concept_map: ConceptMap,
        unifiers: Unifiers,
        pattern_answered: String,
        derivations: Derivations,
    ) -> Self {
        Self {
            source_request,
            concept_map,
            unifiers,
            pattern_answered,
            derivations,
        }
    }

    /// The request this answer replies to.
    pub fn source_request(&self) -> &Request {
        &self.source_request
    }

    pub fn concept_map(&self) -> &ConceptMap {
        &self.concept_map
    }

    pub fn unifiers(&self) -> &Unifiers {
        &self.unifiers
    }

    pub fn pattern_answered(&self) -> &str {
        &self.pattern_answered
    }

    pub fn derivations(&self) -> &Derivations {
        &self.derivations
    }

    /// True iff any rule application contributed to this answer.
    pub fn is_inferred(&self) -> bool {
        !self.derivations.is_empty()
    }
}

/// Terminal signal: no further answers will ever arrive for the source
/// request.
#[derive(Clone, Debug, PartialEq)]
pub struct Exhausted {
    source_request: Request,
}

impl Exhausted {
    pub fn new(source_request: Request) -> Self {
        Self { source_request }
    }

    pub fn source_request(&self) -> &Request {
        &self.source_request
    }
}

/// Reply to a request: one more answer, or never again.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    Answer(Answer),
    Exhausted(Exhausted),
}

impl Response {
    pub fn source_request(&self) -> &Request {
        match self {
            Response::Answer(answer) => answer.source_request(),
            Response::Exhausted(exhausted) => exhausted.source_request(),
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Response::Answer(_))
    }

    pub fn as_answer(&self) -> Option<&Answer> {
        match self {
            Response::Answer(answer) => Some(answer),
            Response::Exhausted(_) => None,
        }
    }

    pub fn into_answer(self) -> Option<Answer> {
        match self {
            Response::Answer(answer) => Some(answer),
            Response::Exhausted(_) => None,
        }
    }
}

/// Mailbox message type shared by every resolver actor.
#[derive(Clone, Debug)]
pub enum ResolverMessage {
    Request(Request),
    Answer(Answer),
    Exhausted(Exhausted),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::dummy_resolver;
    use std::collections::HashMap;

    #[tokio::test]
    async fn path_append_leaves_original_untouched() {
        let a = dummy_resolver(ResolverKind::Conjunction);
        let b = dummy_resolver(ResolverKind::Concludable);

        let root = Path::root(a.clone());
        let extended = root.append(b.clone());

        assert_eq!(root.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(root.current(), &a);
        assert_eq!(extended.current(), &b);
        assert_eq!(root.sender(), None);
        assert_eq!(extended.sender(), Some(&a));
    }

    #[tokio::test]
    async fn request_identity_ignores_derivations() {
        let a = dummy_resolver(ResolverKind::Conjunction);
        let b = dummy_resolver(ResolverKind::Concludable);
        let path = Path::root(a.clone());

        let plain = Request::new(path.clone(), vec![1, 2], Unifiers::default(), Derivations::empty());
        let answer = Answer::new(
            plain.clone(),
            vec![1, 2, 3],
            Unifiers::default(),
            "p".to_string(),
            Derivations::empty(),
        );
        let with_provenance = Request::new(
            path,
            vec![1, 2],
            Unifiers::default(),
            Derivations::empty().with_answer(b, answer),
        );

        assert_eq!(plain, with_provenance);

        let mut routed = HashMap::new();
        routed.insert(plain.clone(), "upstream");
        assert_eq!(routed.get(&with_provenance), Some(&"upstream"));
    }

    #[tokio::test]
    async fn request_identity_distinguishes_maps_and_paths() {
        let a = dummy_resolver(ResolverKind::Conjunction);
        let b = dummy_resolver(ResolverKind::Concludable);
        let root = Path::root(a.clone());

        let one = Request::new(root.clone(), vec![1], Unifiers::default(), Derivations::empty());
        let two = Request::new(root.clone(), vec![2], Unifiers::default(), Derivations::empty());
        let deeper = Request::new(
            root.append(b),
            vec![1],
            Unifiers::default(),
            Derivations::empty(),
        );

        assert_ne!(one, two);
        assert_ne!(one, deeper);
    }

    #[tokio::test]
    async fn resolver_refs_compare_by_identity() {
        let a = dummy_resolver(ResolverKind::Rule);
        let b = dummy_resolver(ResolverKind::Rule);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[tokio::test]
    async fn answer_is_inferred_iff_derivations_nonempty() {
        let a = dummy_resolver(ResolverKind::Conjunction);
        let request = Request::new(
            Path::root(a.clone()),
            vec![],
            Unifiers::default(),
            Derivations::empty(),
        );
        let base = Answer::new(
            request.clone(),
            vec![5],
            Unifiers::default(),
            "p".to_string(),
            Derivations::empty(),
        );
        assert!(!base.is_inferred());

        let inferred = Answer::new(
            request,
            vec![5],
            Unifiers::default(),
            "p".to_string(),
            Derivations::empty().with_answer(a, base.clone()),
        );
        assert!(inferred.is_inferred());
    }
}
