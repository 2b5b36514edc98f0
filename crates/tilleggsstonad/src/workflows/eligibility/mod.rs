//! Declarative eligibility rules: topic graphs, automatic pre-fill, and evaluation.

pub mod catalog;
pub mod domain;
pub mod evaluator;
pub mod graph;
pub mod initializer;
pub mod registry;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::RuleCatalog;
pub use domain::{
    AnswerToken, Answers, Assessment, AssessmentOutcome, JustificationPolicy, Outcome,
    StepAnswer, StepId, Topic, TopicEvaluation, Verdict,
};
pub use evaluator::{evaluate, EvaluationError};
pub use graph::{yes_no, Derivation, Edge, GraphError, RuleGraph, RuleStep};
pub use initializer::{
    has_completed_grade, initialize, school_grade, CaseFacts, DerivationTrace, GradeRuleConfig,
    Initialization,
};
pub use registry::{ChildFacts, RegistryError, RegistryFactProvider};
pub use repository::{AnswerSheet, AssessmentRepository, AuditError, AuditSink};
pub use router::{eligibility_router, OpenTopicRequest};
pub use service::{AnswerSubmission, EligibilityService, EligibilityServiceError};
