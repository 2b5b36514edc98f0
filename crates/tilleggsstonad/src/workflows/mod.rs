pub mod case;
pub mod eligibility;
pub mod periods;
