use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflows::case::CaseId;
use crate::workflows::eligibility::{Answers, Topic, Verdict};

/// Identifier of an eligibility window (vilkårperiode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub Uuid);

impl WindowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a granted benefit period (stønadsperiode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenefitPeriodId(pub Uuid);

impl BenefitPeriodId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BenefitPeriodId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetGroupKind {
    WorkAssessmentAllowance,
    DisabilityBenefit,
    SingleParentTransitionalBenefit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    LabourMarketProgramme,
    Education,
}

/// The two orthogonal dimensions whose overlap authorises payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    TargetGroup,
    Activity,
}

impl Dimension {
    pub const fn label(self) -> &'static str {
        match self {
            Dimension::TargetGroup => "target group",
            Dimension::Activity => "activity",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category of an eligibility window. Ordering breaks ties between windows starting the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "kind", rename_all = "snake_case")]
pub enum WindowCategory {
    TargetGroup(TargetGroupKind),
    Activity(ActivityKind),
}

impl WindowCategory {
    /// Rule graph whose answers decide the window's verdict.
    pub const fn topic(self) -> Topic {
        match self {
            WindowCategory::TargetGroup(_) => Topic::TargetGroup,
            WindowCategory::Activity(_) => Topic::Activity,
        }
    }

    pub const fn dimension(self) -> Dimension {
        match self {
            WindowCategory::TargetGroup(_) => Dimension::TargetGroup,
            WindowCategory::Activity(_) => Dimension::Activity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSource {
    Manual,
    System,
}

/// Time-bounded eligibility for one category, with the verdict snapshot taken at its last save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityWindow {
    pub id: WindowId,
    pub case_id: CaseId,
    pub category: WindowCategory,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub source: WindowSource,
    pub verdict: Verdict,
    pub answers: Answers,
    pub justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_note: Option<String>,
}

impl EligibilityWindow {
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Whether this window makes `day` payable for `category`.
    pub fn authorises(&self, category: WindowCategory, day: NaiveDate) -> bool {
        self.verdict == Verdict::Met && self.category == category && self.covers(day)
    }

    pub fn is_deleted(&self) -> bool {
        self.verdict == Verdict::Deleted
    }
}

/// Caller input for creating (no `id`) or updating an eligibility window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDraft {
    #[serde(default)]
    pub id: Option<WindowId>,
    pub category: WindowCategory,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub answers: Answers,
    #[serde(default)]
    pub justification: Option<String>,
}

/// Persisted benefit period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitPeriod {
    pub id: BenefitPeriodId,
    pub case_id: CaseId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub target_group: TargetGroupKind,
    pub activity: ActivityKind,
}

/// Benefit period as proposed by a caseworker, before it receives an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedBenefitPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub target_group: TargetGroupKind,
    pub activity: ActivityKind,
}

impl From<&BenefitPeriod> for ProposedBenefitPeriod {
    fn from(period: &BenefitPeriod) -> Self {
        Self {
            start: period.start,
            end: period.end,
            target_group: period.target_group,
            activity: period.activity,
        }
    }
}

/// Whether the case's existing benefit periods still reconcile after a window edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Ok,
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSaveOutcome {
    pub window: EligibilityWindow,
    pub status: PeriodStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<String>,
}
