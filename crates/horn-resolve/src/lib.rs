//! Horn resolution core.
//!
//! Resolves a conjunctive query — possibly requiring recursive rule
//! application — by decomposing it into a tree of cooperating resolver
//! actors that stream answers to each other lazily, on demand, with
//! explicit credit-based flow control:
//!
//! ```text
//!                      ┌──────────────────┐
//!        pull ───────► │ root conjunction │ ───────► answers / exhausted
//!                      └────────┬─────────┘
//!               plan order      │
//!              ┌────────────────┴───┐
//!              ▼                    ▼
//!        ┌───────────┐        ┌───────────┐
//!        │concludable│        │concludable│   (shared via the registry)
//!        └─────┬─────┘        └───────────┘
//!              │ rules
//!              ▼
//!          ┌──────┐   body   ┌──────────────────┐
//!          │ rule │ ───────► │ body conjunction │ ──► concludables ...
//!          └──────┘          └──────────────────┘
//! ```
//!
//! Each actor resolves one fragment of the query (a single pattern, a
//! conjunction of patterns, or the body of a rule) and may recursively
//! depend on other actors, including actors resolving the same fragment
//! from a different part of the query: the [`registry::Registry`] hands
//! every branch the single shared instance per signature. Upstream demand
//! is expressed as credit — one request message per wanted answer — and an
//! actor never promises more answers than it has outstanding ways to
//! produce; excess answers are buffered, never discarded.
//!
//! Recursive rule graphs terminate in actor count thanks to registry
//! memoization; a *request* cycle (a fragment whose resolution depends on
//! itself) is not detected and may fail to terminate.
//!
//! ## Module organization
//!
//! - [`message`]: requests, responses, paths, resolver handles
//! - [`derivations`]: provenance of inferred answers
//! - [`producer`]: per-request flow control and buffering
//! - [`execution`]: routing and credit bookkeeping shared by all resolvers
//! - [`resolvers`]: the concludable / conjunction / rule behaviors
//! - [`registry`]: deduplicating actor instantiation
//! - [`traversal`]: the stand-in base-data source
//! - [`recorder`]: durable recording of top-level answers
//! - [`config`]: knowledge-base configuration
//! - [`session`]: root query driver

pub mod config;
pub mod derivations;
pub mod error;
pub mod execution;
pub mod message;
pub mod producer;
pub mod recorder;
pub mod registry;
pub mod resolvers;
pub mod session;
pub mod traversal;

pub use config::{ConfigError, KnowledgeBase, Pagination, PatternConfig, RuleConfig};
pub use derivations::Derivations;
pub use error::ResolveError;
pub use message::{
    Answer, ConceptMap, Exhausted, Path, Request, ResolverKind, ResolverMessage, ResolverRef,
    Response, Unifiers,
};
pub use producer::{BufferedAnswer, ResponseProducer};
pub use recorder::{AnswerRecord, DerivationRecord, RecorderHandle};
pub use registry::Registry;
pub use session::Session;
