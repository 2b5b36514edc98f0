use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::RuleCatalog;
use super::domain::{AnswerToken, StepAnswer, StepId, Topic, TopicEvaluation};
use super::evaluator::{evaluate, EvaluationError};
use super::initializer::{initialize, CaseFacts, GradeRuleConfig};
use super::registry::RegistryFactProvider;
use super::repository::{AnswerSheet, AssessmentRepository, AuditError, AuditSink};
use crate::workflows::case::{CaseId, CaseLocks, CaseStatusProvider, PersonId, RepositoryError};

/// Caseworker input for a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub step: StepId,
    pub answer: AnswerToken,
    #[serde(default)]
    pub justification: Option<String>,
}

/// Service composing the rule catalog, initializer, and assessment storage.
pub struct EligibilityService<R, A> {
    repository: Arc<R>,
    audit: Arc<A>,
    catalog: Arc<RuleCatalog>,
    registry: Arc<dyn RegistryFactProvider>,
    cases: Arc<dyn CaseStatusProvider>,
    config: GradeRuleConfig,
    locks: CaseLocks,
}

impl<R, A> EligibilityService<R, A>
where
    R: AssessmentRepository + 'static,
    A: AuditSink + 'static,
{
    pub fn new(
        repository: Arc<R>,
        audit: Arc<A>,
        catalog: Arc<RuleCatalog>,
        registry: Arc<dyn RegistryFactProvider>,
        cases: Arc<dyn CaseStatusProvider>,
        config: GradeRuleConfig,
    ) -> Self {
        Self {
            repository,
            audit,
            catalog,
            registry,
            cases,
            config,
            locks: CaseLocks::default(),
        }
    }

    /// Open a topic for a case, pre-filling derivable answers. Opening twice returns the stored state.
    pub fn open_topic(
        &self,
        case_id: &CaseId,
        topic: Topic,
        child: Option<PersonId>,
        today: NaiveDate,
    ) -> Result<TopicEvaluation, EligibilityServiceError> {
        self.ensure_editable(case_id)?;
        let graph = self.catalog.graph(topic)?;

        if let Some(existing) = self.repository.fetch(case_id, topic)? {
            return Ok(evaluate(graph, &existing.answers)?);
        }

        // Registry I/O happens before the case lock; its result is a fixed input from here on.
        let child_facts = match &child {
            Some(person_id) => match self.registry.child_facts(person_id) {
                Ok(facts) => Some(facts),
                Err(err) => {
                    warn!(%case_id, topic = topic.label(), error = %err, "registry lookup failed, falling back to manual assessment");
                    None
                }
            },
            None => None,
        };
        let facts = CaseFacts {
            child: child_facts,
            evaluated_on: today,
        };

        let lock = self.locks.for_case(case_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = self.repository.fetch(case_id, topic)? {
            return Ok(evaluate(graph, &existing.answers)?);
        }

        let initialization = initialize(graph, &facts, &self.config)?;
        for trace in initialization.traces {
            self.audit.record(trace)?;
        }

        let sheet = self.repository.insert(AnswerSheet {
            case_id: *case_id,
            topic,
            child,
            opened_on: today,
            answers: initialization.answers,
        })?;
        let evaluation = evaluate(graph, &sheet.answers)?;

        info!(
            %case_id,
            topic = topic.label(),
            verdict = evaluation.verdict.label(),
            "eligibility topic opened"
        );
        Ok(evaluation)
    }

    pub fn get_verdict(
        &self,
        case_id: &CaseId,
        topic: Topic,
    ) -> Result<TopicEvaluation, EligibilityServiceError> {
        let graph = self.catalog.graph(topic)?;
        let sheet = self
            .repository
            .fetch(case_id, topic)?
            .ok_or(EligibilityServiceError::TopicNotOpened {
                case_id: *case_id,
                topic,
            })?;
        Ok(evaluate(graph, &sheet.answers)?)
    }

    /// Record an answer and re-evaluate. Rejected submissions leave the stored answers untouched.
    pub fn submit_answer(
        &self,
        case_id: &CaseId,
        topic: Topic,
        submission: AnswerSubmission,
    ) -> Result<TopicEvaluation, EligibilityServiceError> {
        self.ensure_editable(case_id)?;
        let graph = self.catalog.graph(topic)?;
        graph.resolve(submission.step, submission.answer)?;

        let lock = self.locks.for_case(case_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut sheet = self
            .repository
            .fetch(case_id, topic)?
            .ok_or(EligibilityServiceError::TopicNotOpened {
                case_id: *case_id,
                topic,
            })?;

        let mut answers = sheet.answers.clone();
        answers.insert(
            submission.step,
            StepAnswer::manual(submission.answer, submission.justification),
        );
        let evaluation = evaluate(graph, &answers)?;

        let visited: BTreeSet<StepId> = evaluation.visited_steps().collect();
        if !visited.contains(&submission.step) {
            return Err(EvaluationError::UnreachableStep {
                step: submission.step,
            }
            .into());
        }
        answers.retain(|step, _| visited.contains(step));

        sheet.answers = answers;
        self.repository.update(sheet)?;

        debug!(
            %case_id,
            topic = topic.label(),
            step = ?submission.step,
            verdict = evaluation.verdict.label(),
            "answer recorded"
        );
        Ok(evaluation)
    }

    fn ensure_editable(&self, case_id: &CaseId) -> Result<(), EligibilityServiceError> {
        if self.cases.is_locked(case_id)? {
            return Err(EligibilityServiceError::CaseLocked { case_id: *case_id });
        }
        Ok(())
    }
}

/// Error raised by the eligibility service.
#[derive(Debug, thiserror::Error)]
pub enum EligibilityServiceError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error("case {case_id} is locked for further editing")]
    CaseLocked { case_id: CaseId },
    #[error("topic {topic:?} has not been opened for case {case_id}")]
    TopicNotOpened { case_id: CaseId, topic: Topic },
}
