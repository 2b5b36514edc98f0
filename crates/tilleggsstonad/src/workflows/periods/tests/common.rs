use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::case::{CaseId, CaseStatusProvider, RepositoryError};
use crate::workflows::eligibility::{AnswerToken, Answers, RuleCatalog, StepAnswer, StepId, Verdict};
use crate::workflows::periods::{
    ActivityKind, BenefitPeriod, BenefitPeriodRepository, BenefitPeriodService, EligibilityWindow,
    ProposedBenefitPeriod, TargetGroupKind, WindowCategory, WindowDraft, WindowId,
    WindowRepository, WindowSource,
};

pub(super) const TARGET_GROUP: WindowCategory =
    WindowCategory::TargetGroup(TargetGroupKind::WorkAssessmentAllowance);
pub(super) const ACTIVITY: WindowCategory =
    WindowCategory::Activity(ActivityKind::LabourMarketProgramme);

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn catalog() -> Arc<RuleCatalog> {
    Arc::new(RuleCatalog::standard().expect("standard catalog builds"))
}

/// Answers that resolve the category's rule graph to met.
pub(super) fn met_answers(category: WindowCategory) -> Answers {
    let favorable: &[(StepId, AnswerToken)] = match category {
        WindowCategory::TargetGroup(_) => &[(StepId::MembershipInScheme, AnswerToken::Yes)],
        WindowCategory::Activity(_) => &[
            (StepId::ActivityIsPaid, AnswerToken::No),
            (StepId::ReceivesSickPay, AnswerToken::No),
        ],
    };
    favorable
        .iter()
        .map(|(step, answer)| (*step, StepAnswer::manual(*answer, None)))
        .collect()
}

pub(super) fn draft(category: WindowCategory, start: NaiveDate, end: NaiveDate) -> WindowDraft {
    WindowDraft {
        id: None,
        category,
        start,
        end,
        answers: met_answers(category),
        justification: None,
    }
}

/// Stored window with a fixed verdict, bypassing rule evaluation.
pub(super) fn window(
    category: WindowCategory,
    start: NaiveDate,
    end: NaiveDate,
    verdict: Verdict,
) -> EligibilityWindow {
    EligibilityWindow {
        id: WindowId::new(),
        case_id: CaseId::new(),
        category,
        start,
        end,
        source: WindowSource::Manual,
        verdict,
        answers: Answers::new(),
        justification: None,
        deletion_note: None,
    }
}

pub(super) fn proposed(start: NaiveDate, end: NaiveDate) -> ProposedBenefitPeriod {
    ProposedBenefitPeriod {
        start,
        end,
        target_group: TargetGroupKind::WorkAssessmentAllowance,
        activity: ActivityKind::LabourMarketProgramme,
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryWindows {
    windows: Arc<Mutex<HashMap<WindowId, EligibilityWindow>>>,
}

impl WindowRepository for MemoryWindows {
    fn insert(&self, window: EligibilityWindow) -> Result<EligibilityWindow, RepositoryError> {
        let mut guard = self.windows.lock().expect("repository mutex poisoned");
        if guard.contains_key(&window.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(window.id, window.clone());
        Ok(window)
    }

    fn update(&self, window: EligibilityWindow) -> Result<(), RepositoryError> {
        let mut guard = self.windows.lock().expect("repository mutex poisoned");
        match guard.get_mut(&window.id) {
            Some(existing) => {
                *existing = window;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &WindowId) -> Result<Option<EligibilityWindow>, RepositoryError> {
        let guard = self.windows.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_case(&self, case_id: &CaseId) -> Result<Vec<EligibilityWindow>, RepositoryError> {
        let guard = self.windows.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|window| window.case_id == *case_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryPeriods {
    periods: Arc<Mutex<HashMap<CaseId, Vec<BenefitPeriod>>>>,
}

impl BenefitPeriodRepository for MemoryPeriods {
    fn for_case(&self, case_id: &CaseId) -> Result<Vec<BenefitPeriod>, RepositoryError> {
        let guard = self.periods.lock().expect("repository mutex poisoned");
        Ok(guard.get(case_id).cloned().unwrap_or_default())
    }

    fn replace_all(
        &self,
        case_id: &CaseId,
        periods: Vec<BenefitPeriod>,
    ) -> Result<Vec<BenefitPeriod>, RepositoryError> {
        let mut guard = self.periods.lock().expect("repository mutex poisoned");
        guard.insert(*case_id, periods.clone());
        Ok(periods)
    }
}

pub(super) struct UnavailablePeriods;

impl BenefitPeriodRepository for UnavailablePeriods {
    fn for_case(&self, _case_id: &CaseId) -> Result<Vec<BenefitPeriod>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace_all(
        &self,
        _case_id: &CaseId,
        _periods: Vec<BenefitPeriod>,
    ) -> Result<Vec<BenefitPeriod>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryCaseStatus {
    locked: Arc<Mutex<HashSet<CaseId>>>,
}

impl MemoryCaseStatus {
    pub(super) fn lock_case(&self, case_id: CaseId) {
        self.locked
            .lock()
            .expect("status mutex poisoned")
            .insert(case_id);
    }
}

impl CaseStatusProvider for MemoryCaseStatus {
    fn is_locked(&self, case_id: &CaseId) -> Result<bool, RepositoryError> {
        Ok(self
            .locked
            .lock()
            .expect("status mutex poisoned")
            .contains(case_id))
    }
}

pub(super) struct Harness {
    pub(super) service: BenefitPeriodService<MemoryWindows, MemoryPeriods>,
    pub(super) periods: Arc<MemoryPeriods>,
    pub(super) cases: Arc<MemoryCaseStatus>,
}

pub(super) fn harness() -> Harness {
    let periods = Arc::new(MemoryPeriods::default());
    let cases = Arc::new(MemoryCaseStatus::default());
    let service = BenefitPeriodService::new(
        Arc::new(MemoryWindows::default()),
        periods.clone(),
        catalog(),
        cases.clone(),
    );
    Harness {
        service,
        periods,
        cases,
    }
}

/// Case with met target-group and activity windows covering all of January 2024.
pub(super) fn january_case(harness: &Harness) -> CaseId {
    let case_id = CaseId::new();
    for category in [TARGET_GROUP, ACTIVITY] {
        harness
            .service
            .upsert_eligibility_window(&case_id, draft(category, date(2024, 1, 1), date(2024, 1, 31)))
            .expect("window saved");
    }
    case_id
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
