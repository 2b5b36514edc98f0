use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::domain::{AnswerToken, JustificationPolicy, Outcome, StepId, Topic};
use super::evaluator::EvaluationError;

/// Where an answer leads: another question or a final outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    NextStep(StepId),
    Terminal {
        outcome: Outcome,
        justification: JustificationPolicy,
    },
}

impl Edge {
    pub const fn next(step: StepId) -> Self {
        Edge::NextStep(step)
    }

    pub const fn met(justification: JustificationPolicy) -> Self {
        Edge::Terminal {
            outcome: Outcome::Met,
            justification,
        }
    }

    pub const fn not_met(justification: JustificationPolicy) -> Self {
        Edge::Terminal {
            outcome: Outcome::NotMet,
            justification,
        }
    }
}

/// Automatic answer sources a graph may attach to a main step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    /// Answer `no` when the child's age shows the configured school grade is not completed.
    CompletedSchoolGrade,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleStep {
    pub id: StepId,
    edges: BTreeMap<AnswerToken, Edge>,
}

impl RuleStep {
    pub fn new(id: StepId, edges: impl IntoIterator<Item = (AnswerToken, Edge)>) -> Self {
        Self {
            id,
            edges: edges.into_iter().collect(),
        }
    }

    pub fn answers(&self) -> impl Iterator<Item = AnswerToken> + '_ {
        self.edges.keys().copied()
    }

    pub fn edge(&self, answer: AnswerToken) -> Option<Edge> {
        self.edges.get(&answer).copied()
    }
}

/// Yes/no mapping used by most steps.
pub fn yes_no(if_yes: Edge, if_no: Edge) -> Vec<(AnswerToken, Edge)> {
    vec![(AnswerToken::Yes, if_yes), (AnswerToken::No, if_no)]
}

/// Build-time misconfiguration of a rule graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("{topic:?} is defined by more than one graph")]
    DuplicateTopic { topic: Topic },
    #[error("{topic:?} defines step {step:?} more than once")]
    DuplicateStep { topic: Topic, step: StepId },
    #[error("{topic:?} step {from:?} points to unknown step {target:?}")]
    UnknownStep {
        topic: Topic,
        from: StepId,
        target: StepId,
    },
    #[error("{topic:?} lists undefined main step {step:?}")]
    UnknownMainStep { topic: Topic, step: StepId },
    #[error("{topic:?} has no main steps")]
    NoMainSteps { topic: Topic },
    #[error("{topic:?} step {step:?} accepts no answers")]
    EmptyStep { topic: Topic, step: StepId },
    #[error("{topic:?} contains a cycle through step {step:?}")]
    Cycle { topic: Topic, step: StepId },
    #[error("{topic:?} step {step:?} is not reachable from any main step")]
    Unreachable { topic: Topic, step: StepId },
    #[error("{topic:?} attaches a derivation to {step:?}, which is not a main step")]
    DerivationOnBranchStep { topic: Topic, step: StepId },
}

/// Immutable decision graph for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleGraph {
    topic: Topic,
    steps: BTreeMap<StepId, RuleStep>,
    main_steps: Vec<StepId>,
    derivations: BTreeMap<StepId, Derivation>,
}

impl RuleGraph {
    pub fn builder(topic: Topic) -> RuleGraphBuilder {
        RuleGraphBuilder {
            topic,
            steps: Vec::new(),
            main_steps: Vec::new(),
            derivations: BTreeMap::new(),
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Main steps in declaration order; they are the entry points of the graph.
    pub fn main_steps(&self) -> &[StepId] {
        &self.main_steps
    }

    pub fn contains(&self, step: StepId) -> bool {
        self.steps.contains_key(&step)
    }

    pub fn step(&self, step: StepId) -> Option<&RuleStep> {
        self.steps.get(&step)
    }

    pub fn derivation(&self, step: StepId) -> Option<Derivation> {
        self.derivations.get(&step).copied()
    }

    pub fn resolve(&self, step: StepId, answer: AnswerToken) -> Result<Edge, EvaluationError> {
        let rule = self.steps.get(&step).ok_or(EvaluationError::UnknownStep {
            topic: self.topic,
            step,
        })?;
        rule.edge(answer).ok_or(EvaluationError::IllegalAnswer { step, answer })
    }
}

pub struct RuleGraphBuilder {
    topic: Topic,
    steps: Vec<RuleStep>,
    main_steps: Vec<StepId>,
    derivations: BTreeMap<StepId, Derivation>,
}

impl RuleGraphBuilder {
    pub fn step(mut self, id: StepId, edges: impl IntoIterator<Item = (AnswerToken, Edge)>) -> Self {
        self.steps.push(RuleStep::new(id, edges));
        self
    }

    pub fn main(mut self, steps: impl IntoIterator<Item = StepId>) -> Self {
        self.main_steps.extend(steps);
        self
    }

    pub fn derive(mut self, step: StepId, derivation: Derivation) -> Self {
        self.derivations.insert(step, derivation);
        self
    }

    pub fn build(self) -> Result<RuleGraph, GraphError> {
        let topic = self.topic;
        let mut steps = BTreeMap::new();
        for step in self.steps {
            if step.edges.is_empty() {
                return Err(GraphError::EmptyStep {
                    topic,
                    step: step.id,
                });
            }
            let id = step.id;
            if steps.insert(id, step).is_some() {
                return Err(GraphError::DuplicateStep { topic, step: id });
            }
        }

        if self.main_steps.is_empty() {
            return Err(GraphError::NoMainSteps { topic });
        }
        for main in &self.main_steps {
            if !steps.contains_key(main) {
                return Err(GraphError::UnknownMainStep { topic, step: *main });
            }
        }

        for step in steps.values() {
            for edge in step.edges.values() {
                if let Edge::NextStep(target) = edge {
                    if !steps.contains_key(target) {
                        return Err(GraphError::UnknownStep {
                            topic,
                            from: step.id,
                            target: *target,
                        });
                    }
                }
            }
        }

        for step in self.derivations.keys() {
            if !self.main_steps.contains(step) {
                return Err(GraphError::DerivationOnBranchStep { topic, step: *step });
            }
        }

        // Every step has an edge and every edge target exists, so an acyclic graph always reaches a
        // terminal from each main step; `EmptyStep` and `Cycle` cover the unresolvable cases.
        let mut checker = AcyclicityCheck::new(topic, &steps);
        for main in &self.main_steps {
            checker.visit(*main)?;
        }
        if let Some(orphan) = steps.keys().find(|id| !checker.finished.contains(id)) {
            return Err(GraphError::Unreachable {
                topic,
                step: *orphan,
            });
        }

        Ok(RuleGraph {
            topic,
            steps,
            main_steps: self.main_steps,
            derivations: self.derivations,
        })
    }
}

/// Depth-first walk that rejects cycles and records every step it reaches.
struct AcyclicityCheck<'a> {
    topic: Topic,
    steps: &'a BTreeMap<StepId, RuleStep>,
    in_progress: BTreeSet<StepId>,
    finished: BTreeSet<StepId>,
}

impl<'a> AcyclicityCheck<'a> {
    fn new(topic: Topic, steps: &'a BTreeMap<StepId, RuleStep>) -> Self {
        Self {
            topic,
            steps,
            in_progress: BTreeSet::new(),
            finished: BTreeSet::new(),
        }
    }

    fn visit(&mut self, id: StepId) -> Result<(), GraphError> {
        if self.finished.contains(&id) {
            return Ok(());
        }
        if !self.in_progress.insert(id) {
            return Err(GraphError::Cycle {
                topic: self.topic,
                step: id,
            });
        }

        let steps = self.steps;
        if let Some(step) = steps.get(&id) {
            for edge in step.edges.values() {
                if let Edge::NextStep(next) = edge {
                    self.visit(*next)?;
                }
            }
        }

        self.in_progress.remove(&id);
        self.finished.insert(id);
        Ok(())
    }
}
