use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Eligibility category evaluated by one rule graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    ChildCare,
    TargetGroup,
    Activity,
}

impl Topic {
    pub const fn label(self) -> &'static str {
        match self {
            Topic::ChildCare => "child_care",
            Topic::TargetGroup => "target_group",
            Topic::Activity => "activity",
        }
    }
}

/// Question identifiers shared by every topic graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    CompletedFourthGrade,
    AgeException,
    CostsCoveredByOtherScheme,
    OtherParentReceivesSupport,
    CostsDocumented,
    MembershipInScheme,
    ActivityIsPaid,
    ReceivesSickPay,
}

/// Answer tokens a caseworker (or the initializer) can give to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerToken {
    Yes,
    No,
    NeedsMoreSupervisionThanPeers,
    GuardianHasIrregularWorkingHours,
}

/// Outcome carried by a terminal edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Met,
    NotMet,
}

/// Whether the answer that resolved to a terminal must carry a written justification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JustificationPolicy {
    None,
    Optional,
    Required,
}

/// A recorded answer for a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAnswer {
    pub answer: AnswerToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    /// Set when the initializer derived the answer from registry facts.
    #[serde(default)]
    pub automatic: bool,
}

impl StepAnswer {
    pub fn manual(answer: AnswerToken, justification: Option<String>) -> Self {
        Self {
            answer,
            justification: justification
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            automatic: false,
        }
    }

    pub fn has_justification(&self) -> bool {
        self.justification
            .as_deref()
            .map(|text| !text.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Current answers for one topic instance, keyed by step.
pub type Answers = BTreeMap<StepId, StepAnswer>;

/// Resolved state of a single main step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentOutcome {
    Met,
    AutomaticallyMet,
    NotMet,
    NotYetDecided,
}

impl AssessmentOutcome {
    pub const fn is_favorable(self) -> bool {
        matches!(self, AssessmentOutcome::Met | AssessmentOutcome::AutomaticallyMet)
    }
}

/// Sub-verdict for one main step, including every step visited on the way to its terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub step: StepId,
    pub answer: Option<AnswerToken>,
    pub justification: Option<String>,
    pub outcome: AssessmentOutcome,
    pub path: Vec<StepId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification_policy: Option<JustificationPolicy>,
}

/// Aggregate verdict for a topic instance or an eligibility window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Met,
    NotMet,
    NotYetDecided,
    Deleted,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Verdict::Met => "met",
            Verdict::NotMet => "not_met",
            Verdict::NotYetDecided => "not_yet_decided",
            Verdict::Deleted => "deleted",
        }
    }

    /// An unresolved main step wins over an unfavorable one, which wins over met.
    pub fn aggregate<'a>(assessments: impl IntoIterator<Item = &'a Assessment>) -> Self {
        let mut verdict = Verdict::Met;
        for assessment in assessments {
            match assessment.outcome {
                AssessmentOutcome::NotYetDecided => return Verdict::NotYetDecided,
                AssessmentOutcome::NotMet => verdict = Verdict::NotMet,
                AssessmentOutcome::Met | AssessmentOutcome::AutomaticallyMet => {}
            }
        }
        verdict
    }
}

/// Evaluation result for one topic instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEvaluation {
    pub topic: Topic,
    pub verdict: Verdict,
    pub assessments: Vec<Assessment>,
}

impl TopicEvaluation {
    pub fn assessment(&self, step: StepId) -> Option<&Assessment> {
        self.assessments
            .iter()
            .find(|assessment| assessment.step == step)
    }

    /// Every step visited while resolving the main steps.
    pub fn visited_steps(&self) -> impl Iterator<Item = StepId> + '_ {
        self.assessments
            .iter()
            .flat_map(|assessment| assessment.path.iter().copied())
    }
}
