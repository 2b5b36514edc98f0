use crate::infra::{
    InMemoryAssessmentRepository, InMemoryBenefitPeriodRepository, InMemoryCaseStatus,
    InMemoryRegistry, InMemoryWindowRepository, TracingAuditSink,
};
use chrono::{Duration, Local, Months, NaiveDate};
use clap::Args;
use std::sync::Arc;
use tilleggsstonad::config::AppConfig;
use tilleggsstonad::error::AppError;
use tilleggsstonad::telemetry;
use tilleggsstonad::workflows::case::{CaseId, PersonId};
use tilleggsstonad::workflows::eligibility::{
    AnswerSubmission, AnswerToken, Answers, EligibilityService, RuleCatalog, StepAnswer, StepId,
    Topic, TopicEvaluation,
};
use tilleggsstonad::workflows::periods::{
    ActivityKind, BenefitPeriodService, EligibilityWindow, PeriodStatus, ProposedBenefitPeriod,
    TargetGroupKind, WindowCategory, WindowDraft,
};

type Eligibility = EligibilityService<InMemoryAssessmentRepository, TracingAuditSink>;
type Periods = BenefitPeriodService<InMemoryWindowRepository, InMemoryBenefitPeriodRepository>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let child = PersonId("demo-child".to_string());
    let birth_date = today.checked_sub_months(Months::new(8 * 12)).unwrap_or(today);

    let catalog = Arc::new(RuleCatalog::standard()?);
    let cases = Arc::new(InMemoryCaseStatus::default());
    let eligibility = EligibilityService::new(
        Arc::new(InMemoryAssessmentRepository::default()),
        Arc::new(TracingAuditSink),
        catalog.clone(),
        Arc::new(InMemoryRegistry::default().with_child(child.clone(), birth_date)),
        cases.clone(),
        config.rules,
    );
    let periods = BenefitPeriodService::new(
        Arc::new(InMemoryWindowRepository::default()),
        Arc::new(InMemoryBenefitPeriodRepository::default()),
        catalog,
        cases.clone(),
    );

    let case_id = CaseId::new();
    println!("Supplementary benefit demo");
    println!("Case {case_id} evaluated {today}");

    run_assessment(&eligibility, &case_id, child, today);
    run_periods(&periods, &case_id, today);

    cases.finalize(case_id);
    match periods.replace_benefit_periods(&case_id, Vec::new()) {
        Ok(_) => println!("\nFinalized case unexpectedly accepted changes"),
        Err(err) => println!("\nAfter finalizing: {err}"),
    }

    Ok(())
}

fn run_assessment(eligibility: &Eligibility, case_id: &CaseId, child: PersonId, today: NaiveDate) {
    println!("\nChild-care assessment");
    match eligibility.open_topic(case_id, Topic::ChildCare, Some(child), today) {
        Ok(evaluation) => render_evaluation("Opened", &evaluation),
        Err(err) => {
            println!("  Unable to open topic: {err}");
            return;
        }
    }

    let answers = [
        (StepId::CostsCoveredByOtherScheme, AnswerToken::No),
        (StepId::OtherParentReceivesSupport, AnswerToken::No),
        (StepId::CostsDocumented, AnswerToken::Yes),
    ];
    for (step, answer) in answers {
        let submission = AnswerSubmission {
            step,
            answer,
            justification: None,
        };
        match eligibility.submit_answer(case_id, Topic::ChildCare, submission) {
            Ok(evaluation) => println!(
                "  {step:?} = {answer:?} -> {}",
                evaluation.verdict.label()
            ),
            Err(err) => println!("  {step:?} = {answer:?} rejected: {err}"),
        }
    }

    match eligibility.get_verdict(case_id, Topic::ChildCare) {
        Ok(evaluation) => render_evaluation("Final", &evaluation),
        Err(err) => println!("  Verdict unavailable: {err}"),
    }
}

fn run_periods(periods: &Periods, case_id: &CaseId, today: NaiveDate) {
    println!("\nEligibility windows");
    let target_group = WindowCategory::TargetGroup(TargetGroupKind::SingleParentTransitionalBenefit);
    let activity = WindowCategory::Activity(ActivityKind::Education);
    let Some(dates) = WindowDates::around(today) else {
        println!("  Evaluation date {today} leaves no room for the demo windows");
        return;
    };

    let recorded = periods.record_system_window(
        case_id,
        window_draft(target_group, dates.month_before, dates.five_months),
    );
    let saved = periods.upsert_eligibility_window(
        case_id,
        window_draft(activity, today, dates.four_months),
    );
    let activity_window = match (recorded, saved) {
        (Ok(_), Ok(outcome)) => outcome.window,
        (Err(err), _) | (_, Err(err)) => {
            println!("  Unable to save windows: {err}");
            return;
        }
    };
    render_windows(periods, case_id);

    println!("\nBenefit periods");
    let covered = proposed(today, dates.four_months);
    let uncovered = proposed(dates.month_before, dates.four_months);
    match periods.replace_benefit_periods(case_id, vec![covered]) {
        Ok(stored) => {
            for period in stored {
                println!("  Accepted {} -> {}", period.start, period.end);
            }
        }
        Err(err) => println!("  Rejected: {err}"),
    }
    match periods.replace_benefit_periods(case_id, vec![uncovered]) {
        Ok(_) => println!("  Uncovered period unexpectedly accepted"),
        Err(err) => println!("  Rejected: {err}"),
    }

    println!("\nShortening the activity window");
    let shortened = WindowDraft {
        id: Some(activity_window.id),
        ..window_draft(activity, today, dates.two_months)
    };
    match periods.upsert_eligibility_window(case_id, shortened) {
        Ok(outcome) if outcome.status == PeriodStatus::Conflict => println!(
            "  Saved with conflict: {}",
            outcome.conflict.unwrap_or_default()
        ),
        Ok(_) => println!("  Saved, benefit periods still reconcile"),
        Err(err) => println!("  Rejected: {err}"),
    }
}

/// Offsets from the evaluation date used for the demo windows and periods.
#[derive(Debug, PartialEq, Eq)]
struct WindowDates {
    month_before: NaiveDate,
    two_months: NaiveDate,
    four_months: NaiveDate,
    five_months: NaiveDate,
}

impl WindowDates {
    fn around(today: NaiveDate) -> Option<Self> {
        let ahead = |days| today.checked_add_signed(Duration::days(days));
        Some(Self {
            month_before: today.checked_sub_signed(Duration::days(30))?,
            two_months: ahead(60)?,
            four_months: ahead(120)?,
            five_months: ahead(150)?,
        })
    }
}

fn render_evaluation(label: &str, evaluation: &TopicEvaluation) {
    println!("  {label} verdict: {}", evaluation.verdict.label());
    for assessment in &evaluation.assessments {
        println!(
            "    - {:?}: {:?}{}",
            assessment.step,
            assessment.outcome,
            assessment
                .justification
                .as_deref()
                .map(|text| format!(" ({text})"))
                .unwrap_or_default()
        );
    }
}

fn render_windows(periods: &Periods, case_id: &CaseId) {
    match periods.list_eligibility_windows(case_id) {
        Ok(windows) => windows.iter().for_each(render_window),
        Err(err) => println!("  Windows unavailable: {err}"),
    }
}

fn render_window(window: &EligibilityWindow) {
    println!(
        "  {:?} {} -> {} [{:?}] {}",
        window.category,
        window.start,
        window.end,
        window.source,
        window.verdict.label()
    );
}

fn window_draft(category: WindowCategory, start: NaiveDate, end: NaiveDate) -> WindowDraft {
    let favorable: &[(StepId, AnswerToken)] = match category {
        WindowCategory::TargetGroup(_) => &[(StepId::MembershipInScheme, AnswerToken::Yes)],
        WindowCategory::Activity(_) => &[
            (StepId::ActivityIsPaid, AnswerToken::No),
            (StepId::ReceivesSickPay, AnswerToken::No),
        ],
    };
    WindowDraft {
        id: None,
        category,
        start,
        end,
        answers: favorable
            .iter()
            .map(|(step, answer)| (*step, StepAnswer::manual(*answer, None)))
            .collect::<Answers>(),
        justification: None,
    }
}

fn proposed(start: NaiveDate, end: NaiveDate) -> ProposedBenefitPeriod {
    ProposedBenefitPeriod {
        start,
        end,
        target_group: TargetGroupKind::SingleParentTransitionalBenefit,
        activity: ActivityKind::Education,
    }
}
