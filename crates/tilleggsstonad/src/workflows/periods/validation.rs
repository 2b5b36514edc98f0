use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{Dimension, EligibilityWindow, ProposedBenefitPeriod, WindowCategory};

/// Date span of an offending benefit period, for caseworker-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl From<&ProposedBenefitPeriod> for PeriodSpan {
    fn from(period: &ProposedBenefitPeriod) -> Self {
        Self {
            start: period.start,
            end: period.end,
        }
    }
}

impl fmt::Display for PeriodSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// First violation found in a set of benefit periods.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("benefit period {period} ends before it starts")]
    InvalidRange { period: PeriodSpan },
    #[error("benefit periods {first} and {second} overlap")]
    Overlap { first: PeriodSpan, second: PeriodSpan },
    #[error("benefit period {period} has no eligible {missing} window from {from} to {to}")]
    CoverageGap {
        period: PeriodSpan,
        missing: Dimension,
        from: NaiveDate,
        to: NaiveDate,
    },
}

/// Check that benefit periods are well-formed, pairwise disjoint, and that every day they span
/// is authorised by a met window of the chosen target group and of the chosen activity.
///
/// Overlaps are reported before any coverage gap. Coverage is checked period by period in start
/// order and stops at the first uncovered day; the reported gap runs until that dimension is
/// covered again or the period ends.
pub fn validate_benefit_periods(
    proposed: &[ProposedBenefitPeriod],
    windows: &[EligibilityWindow],
) -> Result<(), ValidationError> {
    if let Some(period) = proposed.iter().find(|period| period.end < period.start) {
        return Err(ValidationError::InvalidRange {
            period: period.into(),
        });
    }

    let mut sorted: Vec<&ProposedBenefitPeriod> = proposed.iter().collect();
    sorted.sort_by_key(|period| (period.start, period.end));

    for pair in sorted.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if second.start <= first.end {
            return Err(ValidationError::Overlap {
                first: first.into(),
                second: second.into(),
            });
        }
    }

    sorted
        .into_iter()
        .try_for_each(|period| check_coverage(period, windows))
}

fn check_coverage(
    period: &ProposedBenefitPeriod,
    windows: &[EligibilityWindow],
) -> Result<(), ValidationError> {
    let required = [
        WindowCategory::TargetGroup(period.target_group),
        WindowCategory::Activity(period.activity),
    ];

    let mut day = Some(period.start);
    while let Some(current) = day.filter(|current| *current <= period.end) {
        for category in required {
            if !authorised(windows, category, current) {
                return Err(ValidationError::CoverageGap {
                    period: period.into(),
                    missing: category.dimension(),
                    from: current,
                    to: gap_end(windows, category, current, period.end),
                });
            }
        }
        day = current.succ_opt();
    }
    Ok(())
}

fn authorised(windows: &[EligibilityWindow], category: WindowCategory, day: NaiveDate) -> bool {
    windows.iter().any(|window| window.authorises(category, day))
}

fn gap_end(
    windows: &[EligibilityWindow],
    category: WindowCategory,
    from: NaiveDate,
    limit: NaiveDate,
) -> NaiveDate {
    let mut last = from;
    while let Some(next) = last.succ_opt().filter(|next| *next <= limit) {
        if authorised(windows, category, next) {
            break;
        }
        last = next;
    }
    last
}
