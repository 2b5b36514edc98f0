use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tilleggsstonad::workflows::case::{CaseId, CaseStatusProvider, PersonId, RepositoryError};
use tilleggsstonad::workflows::eligibility::{
    AnswerSheet, AssessmentRepository, AuditError, AuditSink, ChildFacts, DerivationTrace,
    RegistryError, RegistryFactProvider, Topic,
};
use tilleggsstonad::workflows::periods::{
    BenefitPeriod, BenefitPeriodRepository, EligibilityWindow, WindowId, WindowRepository,
};
use tilleggsstonad::telemetry::AUDIT_TARGET;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAssessmentRepository {
    sheets: Arc<Mutex<HashMap<(CaseId, Topic), AnswerSheet>>>,
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn insert(&self, sheet: AnswerSheet) -> Result<AnswerSheet, RepositoryError> {
        let mut guard = self.sheets.lock().expect("repository mutex poisoned");
        let key = (sheet.case_id, sheet.topic);
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, sheet.clone());
        Ok(sheet)
    }

    fn update(&self, sheet: AnswerSheet) -> Result<(), RepositoryError> {
        let mut guard = self.sheets.lock().expect("repository mutex poisoned");
        let key = (sheet.case_id, sheet.topic);
        if guard.contains_key(&key) {
            guard.insert(key, sheet);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(
        &self,
        case_id: &CaseId,
        topic: Topic,
    ) -> Result<Option<AnswerSheet>, RepositoryError> {
        let guard = self.sheets.lock().expect("repository mutex poisoned");
        Ok(guard.get(&(*case_id, topic)).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryWindowRepository {
    windows: Arc<Mutex<HashMap<WindowId, EligibilityWindow>>>,
}

impl WindowRepository for InMemoryWindowRepository {
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
        if guard.contains_key(&window.id) {
            guard.insert(window.id, window);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
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
pub(crate) struct InMemoryBenefitPeriodRepository {
    periods: Arc<Mutex<HashMap<CaseId, Vec<BenefitPeriod>>>>,
}

impl BenefitPeriodRepository for InMemoryBenefitPeriodRepository {
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

/// Audit sink forwarding derivation traces to the audit tracing target.
#[derive(Default, Clone, Copy)]
pub(crate) struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, trace: DerivationTrace) -> Result<(), AuditError> {
        info!(
            target: AUDIT_TARGET,
            topic = trace.topic.label(),
            step = ?trace.step,
            derivation = ?trace.derivation,
            child = ?trace.child,
            birth_date = ?trace.birth_date,
            evaluated_on = %trace.evaluated_on,
            school_grade = ?trace.school_grade,
            answer = ?trace.answer,
            "automatic derivation"
        );
        Ok(())
    }
}

/// Registry stand-in serving a fixed set of children. Unknown persons are reported as not found.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRegistry {
    children: HashMap<PersonId, ChildFacts>,
}

impl InMemoryRegistry {
    pub(crate) fn with_child(mut self, person_id: PersonId, birth_date: NaiveDate) -> Self {
        self.children.insert(
            person_id.clone(),
            ChildFacts {
                person_id,
                birth_date,
                guardians: Vec::new(),
            },
        );
        self
    }
}

impl RegistryFactProvider for InMemoryRegistry {
    fn child_facts(&self, person_id: &PersonId) -> Result<ChildFacts, RegistryError> {
        self.children
            .get(person_id)
            .cloned()
            .ok_or(RegistryError::NotFound)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCaseStatus {
    locked: Arc<Mutex<HashSet<CaseId>>>,
}

impl InMemoryCaseStatus {
    pub(crate) fn finalize(&self, case_id: CaseId) {
        self.locked
            .lock()
            .expect("status mutex poisoned")
            .insert(case_id);
    }
}

impl CaseStatusProvider for InMemoryCaseStatus {
    fn is_locked(&self, case_id: &CaseId) -> Result<bool, RepositoryError> {
        Ok(self
            .locked
            .lock()
            .expect("status mutex poisoned")
            .contains(case_id))
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
