//! Eligibility rule engine and benefit-period reconciliation for supplementary benefits.
//!
//! Rule graphs decide whether a case satisfies an eligibility topic, eligibility windows record
//! the time-bounded target-group and activity verdicts, and the benefit-period service keeps the
//! granted periods consistent with those windows.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
