//! Mailbox actor runtime.
//!
//! Every actor is a tokio task draining an unbounded mpsc mailbox. Messages
//! are processed strictly one at a time, in arrival order; `tell` is an
//! asynchronous, non-blocking enqueue. There is no synchronous call/reply
//! primitive: request/response protocols are built on top by exchanging
//! messages that carry enough context to route the reply.
//!
//! Actor handles ([`ActorRef`]) compare and hash by a process-unique
//! [`ActorId`], so they can be used as map keys with reference semantics
//! regardless of the state behind them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

static NEXT_ACTOR_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique actor identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State driven by a mailbox.
///
/// `handle` runs on the actor's own task; it may freely mutate the state and
/// `tell` other actors, but must never block. Returning an error stops the
/// actor: the error is logged and the mailbox is dropped. Messages sent to a
/// stopped actor are discarded.
pub trait Actor: Send + 'static {
    type Message: Send + 'static;
    type Error: fmt::Display + Send + 'static;

    fn handle(&mut self, message: Self::Message) -> Result<(), Self::Error>;
}

/// Cloneable, identity-keyed handle to a spawned actor.
pub struct ActorRef<M> {
    id: ActorId,
    name: Arc<str>,
    mailbox: mpsc::UnboundedSender<M>,
}

impl<M> Clone for ActorRef<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<M> PartialEq for ActorRef<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<M> Eq for ActorRef<M> {}

impl<M> Hash for ActorRef<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<M> fmt::Debug for ActorRef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl<M: Send + 'static> ActorRef<M> {
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asynchronously enqueue a message. Never blocks; messages to a stopped
    /// actor are dropped.
    pub fn tell(&self, message: M) {
        if self.mailbox.send(message).is_err() {
            tracing::trace!(actor = %self.name, id = %self.id, "mailbox closed, message dropped");
        }
    }
}

/// Spawn an actor, returning its handle.
///
/// The `init` closure receives the actor's own handle before the first
/// message is processed, so the state can know its own identity and hand it
/// out to peers. Must be called from within a tokio runtime.
pub fn spawn<A, F>(name: impl Into<String>, init: F) -> ActorRef<A::Message>
where
    A: Actor,
    F: FnOnce(ActorRef<A::Message>) -> A,
{
    let name: Arc<str> = Arc::from(name.into());
    let id = ActorId(NEXT_ACTOR_ID.fetch_add(1, Ordering::Relaxed));
    let (mailbox, mut inbox) = mpsc::unbounded_channel();
    let handle = ActorRef {
        id,
        name: Arc::clone(&name),
        mailbox,
    };
    let mut state = init(handle.clone());
    tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            if let Err(error) = state.handle(message) {
                tracing::error!(actor = %name, id = %id, %error, "actor failed, stopping");
                break;
            }
        }
        tracing::trace!(actor = %name, id = %id, "actor stopped");
    });
    handle
}
