use super::domain::{
    AnswerToken, Answers, Assessment, AssessmentOutcome, JustificationPolicy, Outcome, StepId,
    Topic, TopicEvaluation, Verdict,
};
use super::graph::{Edge, RuleGraph};

/// Invalid caller input detected while evaluating answers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("step {step:?} is not part of the {topic:?} rules")]
    UnknownStep { topic: Topic, step: StepId },
    #[error("{answer:?} is not a legal answer for step {step:?}")]
    IllegalAnswer { step: StepId, answer: AnswerToken },
    #[error("the answer to step {step:?} requires a justification")]
    MissingJustification { step: StepId },
    #[error("step {step:?} is not reachable with the current answers")]
    UnreachableStep { step: StepId },
    #[error("no rules are configured for topic {0:?}")]
    TopicNotConfigured(Topic),
}

/// Walk every main step of `graph` with the given answers.
///
/// Pure and deterministic: the same graph and answers always produce the same evaluation.
/// Every supplied answer must belong to the graph and be a legal token for its step, even when
/// the current answers never reach that step.
pub fn evaluate(graph: &RuleGraph, answers: &Answers) -> Result<TopicEvaluation, EvaluationError> {
    for (step, given) in answers {
        graph.resolve(*step, given.answer)?;
    }

    let assessments = graph
        .main_steps()
        .iter()
        .map(|main| assess_main_step(graph, *main, answers))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TopicEvaluation {
        topic: graph.topic(),
        verdict: Verdict::aggregate(&assessments),
        assessments,
    })
}

fn assess_main_step(
    graph: &RuleGraph,
    main: StepId,
    answers: &Answers,
) -> Result<Assessment, EvaluationError> {
    let main_answer = answers.get(&main);
    let mut assessment = Assessment {
        step: main,
        answer: main_answer.map(|given| given.answer),
        justification: main_answer.and_then(|given| given.justification.clone()),
        outcome: AssessmentOutcome::NotYetDecided,
        path: Vec::new(),
        justification_policy: None,
    };

    let mut current = main;
    loop {
        assessment.path.push(current);
        let Some(given) = answers.get(&current) else {
            break;
        };

        match graph.resolve(current, given.answer)? {
            Edge::NextStep(next) => current = next,
            Edge::Terminal {
                outcome,
                justification,
            } => {
                if justification == JustificationPolicy::Required && !given.has_justification() {
                    return Err(EvaluationError::MissingJustification { step: current });
                }
                assessment.justification_policy = Some(justification);
                assessment.outcome = match outcome {
                    Outcome::Met if given.automatic => AssessmentOutcome::AutomaticallyMet,
                    Outcome::Met => AssessmentOutcome::Met,
                    Outcome::NotMet => AssessmentOutcome::NotMet,
                };
                break;
            }
        }
    }

    Ok(assessment)
}
