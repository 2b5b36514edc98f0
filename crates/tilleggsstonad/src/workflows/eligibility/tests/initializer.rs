use super::common::*;
use crate::workflows::case::PersonId;
use crate::workflows::eligibility::{
    has_completed_grade, initialize, school_grade, AnswerToken, AssessmentOutcome, CaseFacts,
    ChildFacts, GradeRuleConfig, StepId, Verdict,
};

fn child(birth_date: chrono::NaiveDate) -> ChildFacts {
    ChildFacts {
        person_id: PersonId("child".to_string()),
        birth_date,
        guardians: Vec::new(),
    }
}

#[test]
fn grade_before_summer_counts_the_current_school_year() {
    let config = GradeRuleConfig::default();

    assert_eq!(school_grade(date(2015, 1, 1), date(2024, 5, 1), &config), 4);
    assert!(!has_completed_grade(
        date(2015, 1, 1),
        date(2024, 5, 1),
        &config
    ));
}

#[test]
fn grade_after_summer_is_unchanged() {
    let config = GradeRuleConfig::default();

    assert_eq!(school_grade(date(2015, 1, 1), date(2024, 7, 1), &config), 4);
    assert!(!has_completed_grade(
        date(2015, 1, 1),
        date(2024, 7, 1),
        &config
    ));
}

#[test]
fn grade_early_in_the_year_is_decremented() {
    let config = GradeRuleConfig::default();

    assert_eq!(school_grade(date(2013, 1, 1), date(2024, 1, 1), &config), 5);
    assert!(has_completed_grade(
        date(2013, 1, 1),
        date(2024, 1, 1),
        &config
    ));
}

#[test]
fn december_wraps_into_the_decrementing_months() {
    let config = GradeRuleConfig::default();

    assert_eq!(school_grade(date(2014, 3, 1), date(2024, 12, 1), &config), 4);
    assert_eq!(school_grade(date(2014, 3, 1), date(2024, 11, 1), &config), 5);
}

#[test]
fn young_child_is_automatically_met() {
    let graph = child_care_graph();
    let facts = CaseFacts {
        child: Some(child(date(2015, 1, 1))),
        evaluated_on: date(2024, 5, 1),
    };

    let initialization =
        initialize(&graph, &facts, &GradeRuleConfig::default()).expect("initializes");

    let age = &initialization.assessments[&StepId::CompletedFourthGrade];
    assert_eq!(age.answer, Some(AnswerToken::No));
    assert_eq!(age.outcome, AssessmentOutcome::AutomaticallyMet);
    assert!(age
        .justification
        .as_deref()
        .expect("automatic justification")
        .contains("01.05.2024"));
    assert!(initialization.answers[&StepId::CompletedFourthGrade].automatic);

    for step in [
        StepId::CostsCoveredByOtherScheme,
        StepId::OtherParentReceivesSupport,
        StepId::CostsDocumented,
    ] {
        assert_eq!(
            initialization.assessments[&step].outcome,
            AssessmentOutcome::NotYetDecided
        );
    }
    assert_eq!(initialization.verdict, Verdict::NotYetDecided);

    let trace = initialization.traces.first().expect("trace emitted");
    assert_eq!(trace.school_grade, Some(4));
    assert_eq!(trace.answer, Some(AnswerToken::No));
    assert_eq!(trace.birth_date, Some(date(2015, 1, 1)));
}

#[test]
fn older_child_is_left_for_the_caseworker() {
    let graph = child_care_graph();
    let facts = CaseFacts {
        child: Some(child(date(2013, 1, 1))),
        evaluated_on: date(2024, 1, 1),
    };

    let initialization =
        initialize(&graph, &facts, &GradeRuleConfig::default()).expect("initializes");

    assert!(initialization.answers.is_empty());
    assert_eq!(
        initialization.assessments[&StepId::CompletedFourthGrade].outcome,
        AssessmentOutcome::NotYetDecided
    );
    let trace = initialization.traces.first().expect("trace emitted");
    assert_eq!(trace.school_grade, Some(5));
    assert_eq!(trace.answer, None);
}

#[test]
fn missing_registry_facts_leave_every_step_unanswered() {
    let graph = child_care_graph();
    let facts = CaseFacts {
        child: None,
        evaluated_on: date(2024, 5, 1),
    };

    let initialization =
        initialize(&graph, &facts, &GradeRuleConfig::default()).expect("initializes");

    assert!(initialization.answers.is_empty());
    assert_eq!(initialization.assessments.len(), 4);
    assert_eq!(initialization.traces.len(), 1);
    assert_eq!(initialization.traces[0].school_grade, None);
}

#[test]
fn topics_without_derivations_emit_no_traces() {
    let catalog = catalog();
    let graph = catalog
        .graph(crate::workflows::eligibility::Topic::Activity)
        .expect("configured");
    let facts = CaseFacts {
        child: Some(child(date(2015, 1, 1))),
        evaluated_on: date(2024, 5, 1),
    };

    let initialization =
        initialize(graph, &facts, &GradeRuleConfig::default()).expect("initializes");

    assert!(initialization.traces.is_empty());
    assert_eq!(initialization.verdict, Verdict::NotYetDecided);
}
