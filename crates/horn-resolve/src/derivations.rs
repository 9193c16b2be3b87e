//! Provenance of inferred answers.

use ahash::AHashMap;

use crate::message::{Answer, ResolverRef};

/// Immutable mapping from a resolver to the answer it supplied along a
/// resolution path. The empty mapping is the identity value meaning "no
/// inference involved": an answer derived purely from base data carries it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Derivations {
    answers: AHashMap<ResolverRef, Answer>,
}

impl Derivations {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A new mapping with one entry added or overwritten; `self` is left
    /// untouched.
    pub fn with_answer(&self, resolver: ResolverRef, answer: Answer) -> Self {
        let mut answers = self.answers.clone();
        answers.insert(resolver, answer);
        Self { answers }
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn get(&self, resolver: &ResolverRef) -> Option<&Answer> {
        self.answers.get(resolver)
    }

    pub fn contains(&self, resolver: &ResolverRef) -> bool {
        self.answers.contains_key(resolver)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResolverRef, &Answer)> {
        self.answers.iter()
    }
}
