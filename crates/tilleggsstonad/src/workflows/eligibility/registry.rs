use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::workflows::case::PersonId;

/// Registry facts about a child that automatic derivations may rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildFacts {
    pub person_id: PersonId,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub guardians: Vec<PersonId>,
}

/// Population-registry lookup. Failures never abort an evaluation; callers fall back to manual input.
pub trait RegistryFactProvider: Send + Sync {
    fn child_facts(&self, person_id: &PersonId) -> Result<ChildFacts, RegistryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no registry record for the requested person")]
    NotFound,
    #[error("registry unavailable: {0}")]
    Upstream(String),
}
