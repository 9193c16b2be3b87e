//! Durable recording of top-level answers.
//!
//! The recorder is its own actor: resolvers `tell` it final answers
//! fire-and-forget and never wait for an acknowledgement. Answers are
//! flattened into serializable records, with the provenance tree expanded
//! recursively, so the record set can be persisted or displayed without
//! touching live actor handles.

use chrono::{DateTime, Utc};
use horn_actor::{Actor, ActorRef};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::derivations::Derivations;
use crate::message::{Answer, ConceptMap};

/// One node of a recorded provenance tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationRecord {
    pub resolver: String,
    pub concept_map: ConceptMap,
    pub pattern: String,
    pub inferred: bool,
    pub derivations: Vec<DerivationRecord>,
}

/// Serializable record of a top-level answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub concept_map: ConceptMap,
    pub pattern: String,
    pub inferred: bool,
    pub derivations: Vec<DerivationRecord>,
    pub recorded_at: DateTime<Utc>,
}

impl AnswerRecord {
    pub fn from_answer(answer: &Answer) -> Self {
        Self {
            concept_map: answer.concept_map().clone(),
            pattern: answer.pattern_answered().to_string(),
            inferred: answer.is_inferred(),
            derivations: derivation_records(answer.derivations()),
            recorded_at: Utc::now(),
        }
    }
}

fn derivation_records(derivations: &Derivations) -> Vec<DerivationRecord> {
    let mut records: Vec<DerivationRecord> = derivations
        .iter()
        .map(|(resolver, answer)| DerivationRecord {
            resolver: resolver.name().to_string(),
            concept_map: answer.concept_map().clone(),
            pattern: answer.pattern_answered().to_string(),
            inferred: answer.is_inferred(),
            derivations: derivation_records(answer.derivations()),
        })
        .collect();
    // map iteration order is arbitrary; keep records deterministic
    records.sort_by(|a, b| a.resolver.cmp(&b.resolver));
    records
}

enum RecorderMessage {
    Record(Answer),
    Snapshot(oneshot::Sender<Vec<AnswerRecord>>),
}

struct ExecutionRecorder {
    records: Vec<AnswerRecord>,
}

impl Actor for ExecutionRecorder {
    type Message = RecorderMessage;
    type Error = std::convert::Infallible;

    fn handle(&mut self, message: RecorderMessage) -> Result<(), Self::Error> {
        match message {
            RecorderMessage::Record(answer) => {
                tracing::debug!(map = ?answer.concept_map(), "recording top-level answer");
                self.records.push(AnswerRecord::from_answer(&answer));
            }
            RecorderMessage::Snapshot(reply) => {
                let _ = reply.send(self.records.clone());
            }
        }
        Ok(())
    }
}

/// Cloneable handle to the execution recorder.
#[derive(Clone)]
pub struct RecorderHandle {
    actor: ActorRef<RecorderMessage>,
}

impl RecorderHandle {
    pub fn spawn() -> Self {
        Self {
            actor: horn_actor::spawn("execution-recorder", |_| ExecutionRecorder {
                records: Vec::new(),
            }),
        }
    }

    /// Fire-and-forget: no acknowledgement is ever sent back.
    pub fn record(&self, answer: Answer) {
        self.actor.tell(RecorderMessage::Record(answer));
    }

    /// The records accumulated so far, in recording order.
    pub async fn snapshot(&self) -> Vec<AnswerRecord> {
        let (reply, response) = oneshot::channel();
        self.actor.tell(RecorderMessage::Snapshot(reply));
        response.await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Path, Request, ResolverKind, Unifiers};
    use crate::test_support::dummy_resolver;

    #[tokio::test]
    async fn records_answers_in_order() {
        let recorder = RecorderHandle::spawn();
        let root = dummy_resolver(ResolverKind::Conjunction);
        let request = Request::new(
            Path::root(root.clone()),
            vec![],
            Unifiers::default(),
            Derivations::empty(),
        );

        for value in [1, 2, 3] {
            recorder.record(Answer::new(
                request.clone(),
                vec![value],
                Unifiers::default(),
                "conjunction([1])".to_string(),
                Derivations::empty(),
            ));
        }

        let records = recorder.snapshot().await;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].concept_map, vec![1]);
        assert_eq!(records[2].concept_map, vec![3]);
        assert!(records.iter().all(|record| !record.inferred));
    }

    #[tokio::test]
    async fn expands_the_provenance_tree() {
        let recorder = RecorderHandle::spawn();
        let root = dummy_resolver(ResolverKind::Conjunction);
        let rule = dummy_resolver(ResolverKind::Rule);
        let request = Request::new(
            Path::root(root.clone()),
            vec![],
            Unifiers::default(),
            Derivations::empty(),
        );

        let rule_answer = Answer::new(
            request.clone(),
            vec![5],
            Unifiers::default(),
            "rule(when: [5])".to_string(),
            Derivations::empty(),
        );
        let top = Answer::new(
            request,
            vec![5],
            Unifiers::default(),
            "conjunction([5])".to_string(),
            Derivations::empty().with_answer(rule.clone(), rule_answer),
        );
        recorder.record(top);

        let records = recorder.snapshot().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].inferred);
        assert_eq!(records[0].derivations.len(), 1);
        assert_eq!(records[0].derivations[0].resolver, rule.name());

        // records serialize cleanly
        let json = serde_json::to_string(&records).unwrap();
        assert!(json.contains("rule(when: [5])"));
    }
}
