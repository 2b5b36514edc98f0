use std::sync::{Arc, PoisonError};

use tracing::{info, warn};

use super::domain::{
    BenefitPeriod, BenefitPeriodId, EligibilityWindow, PeriodStatus, ProposedBenefitPeriod,
    WindowDraft, WindowId, WindowSaveOutcome, WindowSource,
};
use super::repository::{BenefitPeriodRepository, WindowRepository};
use super::store::{EligibilityPeriodStore, StoreError};
use super::validation::{validate_benefit_periods, ValidationError};
use crate::workflows::case::{CaseId, CaseLocks, CaseStatusProvider, RepositoryError};
use crate::workflows::eligibility::RuleCatalog;

/// Service reconciling a case's benefit periods with its eligibility windows.
pub struct BenefitPeriodService<W, B> {
    store: EligibilityPeriodStore<W>,
    periods: Arc<B>,
    cases: Arc<dyn CaseStatusProvider>,
    locks: CaseLocks,
}

impl<W, B> BenefitPeriodService<W, B>
where
    W: WindowRepository + 'static,
    B: BenefitPeriodRepository + 'static,
{
    pub fn new(
        windows: Arc<W>,
        periods: Arc<B>,
        catalog: Arc<RuleCatalog>,
        cases: Arc<dyn CaseStatusProvider>,
    ) -> Self {
        Self {
            store: EligibilityPeriodStore::new(windows, catalog),
            periods,
            cases,
            locks: CaseLocks::default(),
        }
    }

    pub fn list_benefit_periods(
        &self,
        case_id: &CaseId,
    ) -> Result<Vec<BenefitPeriod>, PeriodServiceError> {
        let mut periods = self.periods.for_case(case_id)?;
        periods.sort_by_key(|period| (period.start, period.end));
        Ok(periods)
    }

    /// Check proposed periods against the case's current windows without persisting anything.
    pub fn validate(
        &self,
        case_id: &CaseId,
        proposed: &[ProposedBenefitPeriod],
    ) -> Result<(), PeriodServiceError> {
        let windows = self.store.list_for_case(case_id)?;
        validate_benefit_periods(proposed, &windows)?;
        Ok(())
    }

    /// Replace every benefit period of the case. A rejected set leaves the stored periods as they were.
    pub fn replace_benefit_periods(
        &self,
        case_id: &CaseId,
        proposed: Vec<ProposedBenefitPeriod>,
    ) -> Result<Vec<BenefitPeriod>, PeriodServiceError> {
        self.ensure_editable(case_id)?;
        let lock = self.locks.for_case(case_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let windows = self.store.list_for_case(case_id)?;
        if let Err(err) = validate_benefit_periods(&proposed, &windows) {
            warn!(%case_id, error = %err, "benefit periods rejected");
            return Err(err.into());
        }

        // TODO: diff against the stored periods instead of replacing the whole set once
        // payment dispatch needs stable period identities.
        let periods = proposed
            .into_iter()
            .map(|period| BenefitPeriod {
                id: BenefitPeriodId::new(),
                case_id: *case_id,
                start: period.start,
                end: period.end,
                target_group: period.target_group,
                activity: period.activity,
            })
            .collect();
        let mut stored = self.periods.replace_all(case_id, periods)?;
        stored.sort_by_key(|period| (period.start, period.end));

        info!(%case_id, periods = stored.len(), "benefit periods replaced");
        Ok(stored)
    }

    pub fn list_eligibility_windows(
        &self,
        case_id: &CaseId,
    ) -> Result<Vec<EligibilityWindow>, PeriodServiceError> {
        Ok(self.store.list_for_case(case_id)?)
    }

    /// Save a caseworker-entered window and report whether existing benefit periods still reconcile.
    pub fn upsert_eligibility_window(
        &self,
        case_id: &CaseId,
        draft: WindowDraft,
    ) -> Result<WindowSaveOutcome, PeriodServiceError> {
        self.save_window(case_id, draft, WindowSource::Manual)
    }

    /// Register a window derived from upstream systems. Its bounds are fixed from here on.
    pub fn record_system_window(
        &self,
        case_id: &CaseId,
        draft: WindowDraft,
    ) -> Result<WindowSaveOutcome, PeriodServiceError> {
        self.save_window(case_id, draft, WindowSource::System)
    }

    pub fn delete_eligibility_window(
        &self,
        case_id: &CaseId,
        window_id: WindowId,
        note: Option<String>,
    ) -> Result<WindowSaveOutcome, PeriodServiceError> {
        self.ensure_editable(case_id)?;
        let lock = self.locks.for_case(case_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let window = self.store.mark_deleted(case_id, window_id, note)?;
        info!(%case_id, %window_id, "eligibility window deleted");
        self.reconcile(case_id, window)
    }

    fn save_window(
        &self,
        case_id: &CaseId,
        draft: WindowDraft,
        source: WindowSource,
    ) -> Result<WindowSaveOutcome, PeriodServiceError> {
        self.ensure_editable(case_id)?;
        let lock = self.locks.for_case(case_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let window = self.store.upsert(case_id, draft, source)?;
        info!(
            %case_id,
            window_id = %window.id,
            verdict = window.verdict.label(),
            "eligibility window saved"
        );
        self.reconcile(case_id, window)
    }

    /// Re-check the stored benefit periods after a window edit. A conflict is reported, not raised.
    fn reconcile(
        &self,
        case_id: &CaseId,
        window: EligibilityWindow,
    ) -> Result<WindowSaveOutcome, PeriodServiceError> {
        let existing: Vec<ProposedBenefitPeriod> = self
            .periods
            .for_case(case_id)?
            .iter()
            .map(ProposedBenefitPeriod::from)
            .collect();
        let windows = self.store.list_for_case(case_id)?;

        match validate_benefit_periods(&existing, &windows) {
            Ok(()) => Ok(WindowSaveOutcome {
                window,
                status: PeriodStatus::Ok,
                conflict: None,
            }),
            Err(err) => {
                warn!(%case_id, window_id = %window.id, error = %err, "benefit periods no longer reconcile");
                Ok(WindowSaveOutcome {
                    window,
                    status: PeriodStatus::Conflict,
                    conflict: Some(err.to_string()),
                })
            }
        }
    }

    fn ensure_editable(&self, case_id: &CaseId) -> Result<(), PeriodServiceError> {
        if self.cases.is_locked(case_id)? {
            return Err(PeriodServiceError::CaseLocked { case_id: *case_id });
        }
        Ok(())
    }
}

/// Error raised by the benefit-period service.
#[derive(Debug, thiserror::Error)]
pub enum PeriodServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("case {case_id} is locked for further editing")]
    CaseLocked { case_id: CaseId },
}
