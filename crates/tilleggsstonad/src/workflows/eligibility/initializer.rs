use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::{AnswerToken, Answers, Assessment, StepAnswer, StepId, Topic, Verdict};
use super::evaluator::{evaluate, EvaluationError};
use super::graph::{Derivation, RuleGraph};
use super::registry::ChildFacts;
use crate::workflows::case::PersonId;

/// Settings for deriving a child's school grade from the birth date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRuleConfig {
    /// Children start school in the calendar year they turn this age.
    pub school_start_age: i32,
    /// Grade that must be completed before child-care costs stop being covered.
    pub completed_grade_threshold: i32,
    pub safety_margin_months: u32,
    /// Last month (1-12) of the school year.
    pub school_year_end_month: u32,
}

impl Default for GradeRuleConfig {
    fn default() -> Self {
        Self {
            school_start_age: 6,
            completed_grade_threshold: 4,
            safety_margin_months: 1,
            school_year_end_month: 6,
        }
    }
}

/// Grade the child attends on `on`.
///
/// Before the school year ends (shifted forward by the safety margin, wrapping over the year
/// boundary like calendar months do) the child is still in the previous grade.
pub fn school_grade(birth_date: NaiveDate, on: NaiveDate, config: &GradeRuleConfig) -> i32 {
    let mut grade = (on.year() - birth_date.year()) - (config.school_start_age - 1);
    let shifted_month = (on.month0() + config.safety_margin_months) % 12 + 1;
    if shifted_month < config.school_year_end_month {
        grade -= 1;
    }
    grade
}

pub fn has_completed_grade(birth_date: NaiveDate, on: NaiveDate, config: &GradeRuleConfig) -> bool {
    school_grade(birth_date, on, config) > config.completed_grade_threshold
}

/// Immutable snapshot of external facts used for one initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseFacts {
    pub child: Option<ChildFacts>,
    pub evaluated_on: NaiveDate,
}

/// Audit record of an automatic derivation: its inputs and what it decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationTrace {
    pub topic: Topic,
    pub step: StepId,
    pub derivation: Derivation,
    pub child: Option<PersonId>,
    pub birth_date: Option<NaiveDate>,
    pub evaluated_on: NaiveDate,
    pub school_grade: Option<i32>,
    pub answer: Option<AnswerToken>,
}

/// Starting state of a topic instance before any caseworker input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initialization {
    pub answers: Answers,
    pub assessments: BTreeMap<StepId, Assessment>,
    pub verdict: Verdict,
    pub traces: Vec<DerivationTrace>,
}

/// Pre-fill the answers that can be derived from `facts`; every other main step starts unanswered.
pub fn initialize(
    graph: &RuleGraph,
    facts: &CaseFacts,
    config: &GradeRuleConfig,
) -> Result<Initialization, EvaluationError> {
    let mut answers = Answers::new();
    let mut traces = Vec::new();

    for step in graph.main_steps() {
        let Some(derivation) = graph.derivation(*step) else {
            continue;
        };
        let (answer, trace) = derive(graph.topic(), *step, derivation, facts, config);
        if let Some(answer) = answer {
            answers.insert(*step, answer);
        }
        traces.push(trace);
    }

    let evaluation = evaluate(graph, &answers)?;
    let assessments = evaluation
        .assessments
        .into_iter()
        .map(|assessment| (assessment.step, assessment))
        .collect();

    Ok(Initialization {
        answers,
        assessments,
        verdict: evaluation.verdict,
        traces,
    })
}

fn derive(
    topic: Topic,
    step: StepId,
    derivation: Derivation,
    facts: &CaseFacts,
    config: &GradeRuleConfig,
) -> (Option<StepAnswer>, DerivationTrace) {
    match derivation {
        Derivation::CompletedSchoolGrade => {
            let grade = facts
                .child
                .as_ref()
                .map(|child| school_grade(child.birth_date, facts.evaluated_on, config));
            let answer = grade
                .filter(|grade| *grade <= config.completed_grade_threshold)
                .map(|_| StepAnswer {
                    answer: AnswerToken::No,
                    justification: Some(format!(
                        "Automatically assessed: based on the child's age on {}, the child has not completed school grade {}.",
                        facts.evaluated_on.format("%d.%m.%Y"),
                        config.completed_grade_threshold
                    )),
                    automatic: true,
                });

            let trace = DerivationTrace {
                topic,
                step,
                derivation,
                child: facts.child.as_ref().map(|child| child.person_id.clone()),
                birth_date: facts.child.as_ref().map(|child| child.birth_date),
                evaluated_on: facts.evaluated_on,
                school_grade: grade,
                answer: answer.as_ref().map(|answer| answer.answer),
            };
            (answer, trace)
        }
    }
}
