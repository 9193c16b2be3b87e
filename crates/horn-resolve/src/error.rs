//! Failure taxonomy of the resolution protocol.

use crate::message::ResolverKind;

/// Failures that are fatal to the owning resolver actor.
///
/// None of these are retried: each one indicates a logic bug in the
/// protocol, and continuing would risk inconsistent credit accounting.
/// Exhaustion is not an error — it travels through the response channel.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A request arrived whose path does not end at the handling resolver.
    #[error("request for {actual} was routed to {expected}")]
    MisroutedRequest { expected: String, actual: String },

    /// A response arrived for a downstream request this resolver never
    /// issued.
    #[error("response to unrecognised downstream request {request}")]
    UnroutableResponse { request: String },

    /// No flow-control state exists for a request that should already have
    /// been seen.
    #[error("no response producer for request {request}")]
    UnknownRequest { request: String },

    /// A credit counter would have gone negative.
    #[error("credit accounting underflow for request {request}")]
    CreditUnderflow { request: String },

    /// An answer arrived from a resolver kind the receiver cannot fold.
    #[error("unhandled downstream resolver kind {kind} ({resolver})")]
    UnhandledSourceKind { kind: ResolverKind, resolver: String },

    /// An answer arrived from a resolver outside the configured plan.
    #[error("answer from unplanned resolver {resolver}")]
    UnplannedSource { resolver: String },

    /// A rule delivered an answer with no concluded value.
    #[error("malformed answer from {resolver}: empty concept map")]
    MalformedAnswer { resolver: String },
}
