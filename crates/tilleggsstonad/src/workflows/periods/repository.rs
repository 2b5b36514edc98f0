use super::domain::{BenefitPeriod, EligibilityWindow, WindowId};
use crate::workflows::case::{CaseId, RepositoryError};

/// Storage for eligibility windows. Windows are soft-deleted, never removed.
pub trait WindowRepository: Send + Sync {
    fn insert(&self, window: EligibilityWindow) -> Result<EligibilityWindow, RepositoryError>;
    fn update(&self, window: EligibilityWindow) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &WindowId) -> Result<Option<EligibilityWindow>, RepositoryError>;
    fn for_case(&self, case_id: &CaseId) -> Result<Vec<EligibilityWindow>, RepositoryError>;
}

pub trait BenefitPeriodRepository: Send + Sync {
    fn for_case(&self, case_id: &CaseId) -> Result<Vec<BenefitPeriod>, RepositoryError>;
    /// Discard every stored period of the case and persist `periods` as a single unit.
    fn replace_all(
        &self,
        case_id: &CaseId,
        periods: Vec<BenefitPeriod>,
    ) -> Result<Vec<BenefitPeriod>, RepositoryError>;
}
