use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Answers, Topic};
use super::initializer::DerivationTrace;
use crate::workflows::case::{CaseId, PersonId, RepositoryError};

/// Stored answers for one topic instance of a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSheet {
    pub case_id: CaseId,
    pub topic: Topic,
    pub child: Option<PersonId>,
    pub opened_on: NaiveDate,
    pub answers: Answers,
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait AssessmentRepository: Send + Sync {
    fn insert(&self, sheet: AnswerSheet) -> Result<AnswerSheet, RepositoryError>;
    fn update(&self, sheet: AnswerSheet) -> Result<(), RepositoryError>;
    fn fetch(&self, case_id: &CaseId, topic: Topic)
        -> Result<Option<AnswerSheet>, RepositoryError>;
}

/// Outbound channel for derivation traces so automatic decisions can be reconstructed later.
pub trait AuditSink: Send + Sync {
    fn record(&self, trace: DerivationTrace) -> Result<(), AuditError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit transport unavailable: {0}")]
    Transport(String),
}
