use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::case::{CaseId, CaseStatusProvider, PersonId, RepositoryError};
use crate::workflows::eligibility::{
    AnswerSheet, AnswerToken, AssessmentRepository, AuditError, AuditSink, ChildFacts,
    DerivationTrace, EligibilityService, GradeRuleConfig, RegistryError, RegistryFactProvider,
    RuleCatalog, RuleGraph, StepAnswer, Topic,
};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn catalog() -> RuleCatalog {
    RuleCatalog::standard().expect("standard catalog builds")
}

pub(super) fn child_care_graph() -> RuleGraph {
    catalog()
        .graph(Topic::ChildCare)
        .expect("child care configured")
        .clone()
}

pub(super) fn answer(token: AnswerToken) -> StepAnswer {
    StepAnswer::manual(token, None)
}

pub(super) fn justified(token: AnswerToken, justification: &str) -> StepAnswer {
    StepAnswer::manual(token, Some(justification.to_string()))
}

pub(super) fn young_child() -> PersonId {
    PersonId("15011500001".to_string())
}

pub(super) fn older_child() -> PersonId {
    PersonId("01011300002".to_string())
}

#[derive(Default, Clone)]
pub(super) struct MemoryAssessments {
    pub(super) sheets: Arc<Mutex<HashMap<(CaseId, Topic), AnswerSheet>>>,
}

impl AssessmentRepository for MemoryAssessments {
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
        guard.insert((sheet.case_id, sheet.topic), sheet);
        Ok(())
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
pub(super) struct MemoryAudit {
    traces: Arc<Mutex<Vec<DerivationTrace>>>,
}

impl MemoryAudit {
    pub(super) fn traces(&self) -> Vec<DerivationTrace> {
        self.traces.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, trace: DerivationTrace) -> Result<(), AuditError> {
        self.traces
            .lock()
            .expect("audit mutex poisoned")
            .push(trace);
        Ok(())
    }
}

pub(super) struct StubRegistry {
    children: HashMap<PersonId, ChildFacts>,
}

impl StubRegistry {
    pub(super) fn with_children() -> Self {
        let mut children = HashMap::new();
        for (person_id, birth_date) in [
            (young_child(), date(2015, 1, 15)),
            (older_child(), date(2013, 1, 1)),
        ] {
            children.insert(
                person_id.clone(),
                ChildFacts {
                    person_id,
                    birth_date,
                    guardians: vec![PersonId("01017512345".to_string())],
                },
            );
        }
        Self { children }
    }
}

impl RegistryFactProvider for StubRegistry {
    fn child_facts(&self, person_id: &PersonId) -> Result<ChildFacts, RegistryError> {
        self.children
            .get(person_id)
            .cloned()
            .ok_or(RegistryError::NotFound)
    }
}

pub(super) struct OfflineRegistry;

impl RegistryFactProvider for OfflineRegistry {
    fn child_facts(&self, _person_id: &PersonId) -> Result<ChildFacts, RegistryError> {
        Err(RegistryError::Upstream("connection reset".to_string()))
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
    pub(super) service: EligibilityService<MemoryAssessments, MemoryAudit>,
    pub(super) repository: Arc<MemoryAssessments>,
    pub(super) audit: Arc<MemoryAudit>,
    pub(super) cases: Arc<MemoryCaseStatus>,
}

pub(super) fn harness_with(registry: Arc<dyn RegistryFactProvider>) -> Harness {
    let repository = Arc::new(MemoryAssessments::default());
    let audit = Arc::new(MemoryAudit::default());
    let cases = Arc::new(MemoryCaseStatus::default());
    let service = EligibilityService::new(
        repository.clone(),
        audit.clone(),
        Arc::new(catalog()),
        registry,
        cases.clone(),
        GradeRuleConfig::default(),
    );
    Harness {
        service,
        repository,
        audit,
        cases,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(Arc::new(StubRegistry::with_children()))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
