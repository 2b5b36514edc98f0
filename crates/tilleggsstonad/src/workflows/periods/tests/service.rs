use super::common::*;
use crate::workflows::case::{CaseId, RepositoryError};
use crate::workflows::eligibility::Verdict;
use crate::workflows::periods::{
    BenefitPeriodRepository, BenefitPeriodService, ImmutableBoundsError, PeriodServiceError,
    PeriodStatus, StoreError, ValidationError, WindowDraft,
};
use std::sync::Arc;

#[test]
fn replace_persists_periods_with_fresh_identities() {
    let harness = harness();
    let case_id = january_case(&harness);

    let first = harness
        .service
        .replace_benefit_periods(
            &case_id,
            vec![
                proposed(date(2024, 1, 16), date(2024, 1, 31)),
                proposed(date(2024, 1, 1), date(2024, 1, 15)),
            ],
        )
        .expect("periods accepted");
    let second = harness
        .service
        .replace_benefit_periods(&case_id, vec![proposed(date(2024, 1, 1), date(2024, 1, 15))])
        .expect("periods accepted");

    assert_eq!(first.len(), 2);
    assert_eq!(first[0].start, date(2024, 1, 1));
    assert!(first.iter().all(|period| period.case_id == case_id));
    assert_eq!(second.len(), 1);
    assert!(first.iter().all(|period| period.id != second[0].id));
    assert_eq!(
        harness
            .service
            .list_benefit_periods(&case_id)
            .expect("list succeeds"),
        second
    );
}

#[test]
fn rejected_replacement_leaves_previous_periods_untouched() {
    let harness = harness();
    let case_id = january_case(&harness);
    let accepted = harness
        .service
        .replace_benefit_periods(&case_id, vec![proposed(date(2024, 1, 1), date(2024, 1, 31))])
        .expect("periods accepted");

    let result = harness.service.replace_benefit_periods(
        &case_id,
        vec![
            proposed(date(2024, 1, 1), date(2024, 1, 10)),
            proposed(date(2024, 1, 20), date(2024, 2, 15)),
        ],
    );

    match result {
        Err(PeriodServiceError::Validation(ValidationError::CoverageGap { from, .. })) => {
            assert_eq!(from, date(2024, 2, 1));
        }
        other => panic!("expected coverage gap, got {other:?}"),
    }
    assert_eq!(
        harness.periods.for_case(&case_id).expect("re-read succeeds"),
        accepted
    );
}

#[test]
fn validate_never_persists() {
    let harness = harness();
    let case_id = january_case(&harness);

    harness
        .service
        .validate(&case_id, &[proposed(date(2024, 1, 1), date(2024, 1, 31))])
        .expect("periods valid");

    assert!(harness
        .service
        .list_benefit_periods(&case_id)
        .expect("list succeeds")
        .is_empty());
}

#[test]
fn locked_cases_reject_every_mutation() {
    let harness = harness();
    let case_id = january_case(&harness);
    let window_id = harness
        .service
        .list_eligibility_windows(&case_id)
        .expect("list succeeds")[0]
        .id;
    harness.cases.lock_case(case_id);

    let replace = harness
        .service
        .replace_benefit_periods(&case_id, vec![proposed(date(2024, 1, 1), date(2024, 1, 31))]);
    let upsert = harness.service.upsert_eligibility_window(
        &case_id,
        draft(TARGET_GROUP, date(2024, 2, 1), date(2024, 2, 29)),
    );
    let delete = harness
        .service
        .delete_eligibility_window(&case_id, window_id, None);

    assert!(matches!(replace, Err(PeriodServiceError::CaseLocked { .. })));
    assert!(matches!(upsert, Err(PeriodServiceError::CaseLocked { .. })));
    assert!(matches!(delete, Err(PeriodServiceError::CaseLocked { .. })));
    assert_eq!(
        harness
            .service
            .list_eligibility_windows(&case_id)
            .expect("list succeeds")
            .len(),
        2
    );
}

#[test]
fn shrinking_a_window_reports_conflict_but_keeps_the_edit() {
    let harness = harness();
    let case_id = january_case(&harness);
    harness
        .service
        .replace_benefit_periods(&case_id, vec![proposed(date(2024, 1, 1), date(2024, 1, 31))])
        .expect("periods accepted");
    let target_group = harness
        .service
        .list_eligibility_windows(&case_id)
        .expect("list succeeds")
        .into_iter()
        .find(|window| window.category == TARGET_GROUP)
        .expect("target group window present");

    let outcome = harness
        .service
        .upsert_eligibility_window(
            &case_id,
            WindowDraft {
                id: Some(target_group.id),
                ..draft(TARGET_GROUP, date(2024, 1, 1), date(2024, 1, 15))
            },
        )
        .expect("edit persists");

    assert_eq!(outcome.status, PeriodStatus::Conflict);
    assert!(outcome
        .conflict
        .as_deref()
        .unwrap_or_default()
        .contains("2024-01-16"));
    assert_eq!(outcome.window.end, date(2024, 1, 15));
    assert_eq!(
        harness
            .service
            .list_benefit_periods(&case_id)
            .expect("list succeeds")
            .len(),
        1
    );
}

#[test]
fn window_edits_without_periods_reconcile() {
    let harness = harness();
    let case_id = CaseId::new();

    let outcome = harness
        .service
        .upsert_eligibility_window(
            &case_id,
            draft(ACTIVITY, date(2024, 1, 1), date(2024, 1, 31)),
        )
        .expect("window saved");

    assert_eq!(outcome.status, PeriodStatus::Ok);
    assert_eq!(outcome.conflict, None);
    assert_eq!(outcome.window.verdict, Verdict::Met);
}

#[test]
fn deleting_a_covering_window_reports_conflict() {
    let harness = harness();
    let case_id = january_case(&harness);
    harness
        .service
        .replace_benefit_periods(&case_id, vec![proposed(date(2024, 1, 1), date(2024, 1, 31))])
        .expect("periods accepted");
    let activity = harness
        .service
        .list_eligibility_windows(&case_id)
        .expect("list succeeds")
        .into_iter()
        .find(|window| window.category == ACTIVITY)
        .expect("activity window present");

    let outcome = harness
        .service
        .delete_eligibility_window(&case_id, activity.id, Some("Programme cancelled".to_string()))
        .expect("delete persists");

    assert_eq!(outcome.status, PeriodStatus::Conflict);
    assert_eq!(outcome.window.verdict, Verdict::Deleted);
    assert_eq!(
        outcome.window.deletion_note.as_deref(),
        Some("Programme cancelled")
    );
}

#[test]
fn system_window_bounds_cannot_be_edited_through_the_service() {
    let harness = harness();
    let case_id = CaseId::new();
    let recorded = harness
        .service
        .record_system_window(
            &case_id,
            draft(TARGET_GROUP, date(2024, 1, 1), date(2024, 6, 30)),
        )
        .expect("system window recorded");

    let moved = harness.service.upsert_eligibility_window(
        &case_id,
        WindowDraft {
            id: Some(recorded.window.id),
            ..draft(TARGET_GROUP, date(2024, 2, 1), date(2024, 6, 30))
        },
    );
    let justified = harness.service.upsert_eligibility_window(
        &case_id,
        WindowDraft {
            id: Some(recorded.window.id),
            justification: Some("Verified against registry".to_string()),
            ..draft(TARGET_GROUP, date(2024, 1, 1), date(2024, 6, 30))
        },
    );

    assert!(matches!(
        moved,
        Err(PeriodServiceError::Store(StoreError::ImmutableBounds(
            ImmutableBoundsError { .. }
        )))
    ));
    let justified = justified.expect("justification edit succeeds");
    assert_eq!(
        justified.window.justification.as_deref(),
        Some("Verified against registry")
    );
    assert_eq!(justified.window.start, date(2024, 1, 1));
}

#[test]
fn repository_failures_propagate_from_window_reconciliation() {
    let service = BenefitPeriodService::new(
        Arc::new(MemoryWindows::default()),
        Arc::new(UnavailablePeriods),
        catalog(),
        Arc::new(MemoryCaseStatus::default()),
    );

    let result = service.upsert_eligibility_window(
        &CaseId::new(),
        draft(TARGET_GROUP, date(2024, 1, 1), date(2024, 1, 31)),
    );

    assert!(matches!(
        result,
        Err(PeriodServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}
