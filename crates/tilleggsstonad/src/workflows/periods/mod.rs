//! Eligibility windows and the benefit periods they authorise.
//!
//! Windows carry a verdict snapshot evaluated from the `target_group` or `activity` rule graph.
//! Benefit periods are only accepted when every day they span is covered by a met window of both
//! chosen categories.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ActivityKind, BenefitPeriod, BenefitPeriodId, Dimension, EligibilityWindow, PeriodStatus,
    ProposedBenefitPeriod, TargetGroupKind, WindowCategory, WindowDraft, WindowId,
    WindowSaveOutcome, WindowSource,
};
pub use repository::{BenefitPeriodRepository, WindowRepository};
pub use router::{period_router, DeleteWindowRequest};
pub use service::{BenefitPeriodService, PeriodServiceError};
pub use store::{BoundField, EligibilityPeriodStore, ImmutableBoundsError, StoreError};
pub use validation::{validate_benefit_periods, PeriodSpan, ValidationError};
