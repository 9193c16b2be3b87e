//! Root query driver.

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::config::Pagination;
use crate::derivations::Derivations;
use crate::message::{Path, Request, ResolverMessage, ResolverRef, Response, Unifiers};
use crate::registry::Registry;

/// Drives one conjunctive query: owns the root conjunction, the canonical
/// root request, and the channel its responses stream into.
///
/// Every [`pull`](Session::pull) grants the root resolver one credit — one
/// more answer, or the terminal exhausted signal. Pulling after exhaustion
/// yields exhausted again.
pub struct Session {
    root: ResolverRef,
    root_request: Request,
    responses: UnboundedReceiver<Response>,
}

impl Session {
    pub fn new(registry: &Registry, patterns: Vec<i64>, traversal: Pagination) -> Self {
        let (sink, responses) = mpsc::unbounded_channel();
        let root = registry.root_conjunction(patterns, traversal, sink);
        let root_request = Request::new(
            Path::root(root.clone()),
            Vec::new(),
            Unifiers::default(),
            Derivations::empty(),
        );
        Self {
            root,
            root_request,
            responses,
        }
    }

    pub fn root_resolver(&self) -> &ResolverRef {
        &self.root
    }

    pub fn root_request(&self) -> &Request {
        &self.root_request
    }

    /// Ask for one more answer.
    pub fn pull(&self) {
        self.root
            .tell(ResolverMessage::Request(self.root_request.clone()));
    }

    /// The next streamed response; None if the execution was torn down.
    pub async fn next_response(&mut self) -> Option<Response> {
        self.responses.recv().await
    }

    /// Pull once and await the resulting response.
    pub async fn resolve_next(&mut self) -> Option<Response> {
        self.pull();
        self.next_response().await
    }
}
