use std::collections::BTreeMap;

use super::domain::JustificationPolicy::{Optional, Required};
use super::domain::{AnswerToken, StepId, Topic};
use super::evaluator::EvaluationError;
use super::graph::{yes_no, Derivation, Edge, GraphError, RuleGraph};

/// Every topic graph, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    graphs: BTreeMap<Topic, RuleGraph>,
}

impl RuleCatalog {
    pub fn standard() -> Result<Self, GraphError> {
        Self::from_graphs([child_care()?, target_group()?, activity()?])
    }

    pub fn from_graphs(graphs: impl IntoIterator<Item = RuleGraph>) -> Result<Self, GraphError> {
        let mut by_topic = BTreeMap::new();
        for graph in graphs {
            let topic = graph.topic();
            if by_topic.insert(topic, graph).is_some() {
                return Err(GraphError::DuplicateTopic { topic });
            }
        }
        Ok(Self { graphs: by_topic })
    }

    pub fn graph(&self, topic: Topic) -> Result<&RuleGraph, EvaluationError> {
        self.graphs
            .get(&topic)
            .ok_or(EvaluationError::TopicNotConfigured(topic))
    }

    pub fn topics(&self) -> impl Iterator<Item = Topic> + '_ {
        self.graphs.keys().copied()
    }
}

/// Coverage of child-care costs (pass av barn).
fn child_care() -> Result<RuleGraph, GraphError> {
    RuleGraph::builder(Topic::ChildCare)
        .step(
            StepId::CompletedFourthGrade,
            yes_no(Edge::next(StepId::AgeException), Edge::met(Optional)),
        )
        .step(
            StepId::AgeException,
            [
                (AnswerToken::NeedsMoreSupervisionThanPeers, Edge::met(Required)),
                (
                    AnswerToken::GuardianHasIrregularWorkingHours,
                    Edge::met(Required),
                ),
                (AnswerToken::No, Edge::not_met(Required)),
            ],
        )
        .step(
            StepId::CostsCoveredByOtherScheme,
            yes_no(Edge::not_met(Optional), Edge::met(Optional)),
        )
        .step(
            StepId::OtherParentReceivesSupport,
            yes_no(Edge::not_met(Optional), Edge::met(Optional)),
        )
        .step(
            StepId::CostsDocumented,
            yes_no(Edge::met(Optional), Edge::not_met(Optional)),
        )
        .main([
            StepId::CompletedFourthGrade,
            StepId::CostsCoveredByOtherScheme,
            StepId::OtherParentReceivesSupport,
            StepId::CostsDocumented,
        ])
        .derive(StepId::CompletedFourthGrade, Derivation::CompletedSchoolGrade)
        .build()
}

fn target_group() -> Result<RuleGraph, GraphError> {
    RuleGraph::builder(Topic::TargetGroup)
        .step(
            StepId::MembershipInScheme,
            yes_no(Edge::met(Optional), Edge::not_met(Required)),
        )
        .main([StepId::MembershipInScheme])
        .build()
}

fn activity() -> Result<RuleGraph, GraphError> {
    RuleGraph::builder(Topic::Activity)
        .step(
            StepId::ActivityIsPaid,
            yes_no(Edge::not_met(Required), Edge::met(Optional)),
        )
        .step(
            StepId::ReceivesSickPay,
            yes_no(Edge::not_met(Required), Edge::met(Optional)),
        )
        .main([StepId::ActivityIsPaid, StepId::ReceivesSickPay])
        .build()
}
