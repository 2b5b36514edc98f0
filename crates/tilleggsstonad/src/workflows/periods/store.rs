use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

use super::domain::{EligibilityWindow, WindowDraft, WindowId, WindowSource};
use super::repository::WindowRepository;
use crate::workflows::case::{CaseId, RepositoryError};
use crate::workflows::eligibility::{
    evaluate, Answers, EvaluationError, RuleCatalog, StepAnswer, Verdict,
};

/// Field of a system-sourced window that may not change after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundField {
    Start,
    End,
    Category,
}

impl fmt::Display for BoundField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BoundField::Start => "start date",
            BoundField::End => "end date",
            BoundField::Category => "category",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot change the {field} of system-sourced window {window_id}")]
pub struct ImmutableBoundsError {
    pub window_id: WindowId,
    pub field: BoundField,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("window ends on {end} before it starts on {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("window {0} not found")]
    NotFound(WindowId),
    #[error("window {window_id} does not belong to case {case_id}")]
    CaseMismatch { window_id: WindowId, case_id: CaseId },
    #[error("window {0} has been deleted")]
    WindowDeleted(WindowId),
    #[error(transparent)]
    ImmutableBounds(#[from] ImmutableBoundsError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Eligibility windows of every case, each verdict snapshotted from its topic graph on save.
pub struct EligibilityPeriodStore<W> {
    windows: Arc<W>,
    catalog: Arc<RuleCatalog>,
}

impl<W> EligibilityPeriodStore<W>
where
    W: WindowRepository + 'static,
{
    pub fn new(windows: Arc<W>, catalog: Arc<RuleCatalog>) -> Self {
        Self { windows, catalog }
    }

    /// Create a window when `draft.id` is empty, otherwise update the existing one.
    ///
    /// `source` only applies to new windows; an update keeps the stored source. System-sourced
    /// windows accept new answers and justification but never new bounds or category.
    pub fn upsert(
        &self,
        case_id: &CaseId,
        draft: WindowDraft,
        source: WindowSource,
    ) -> Result<EligibilityWindow, StoreError> {
        if draft.end < draft.start {
            return Err(StoreError::InvalidRange {
                start: draft.start,
                end: draft.end,
            });
        }
        // Only the initializer derives automatic answers; drafts are always caseworker input.
        let answers: Answers = draft
            .answers
            .iter()
            .map(|(step, given)| {
                (
                    *step,
                    StepAnswer::manual(given.answer, given.justification.clone()),
                )
            })
            .collect();
        let graph = self.catalog.graph(draft.category.topic())?;
        let verdict = evaluate(graph, &answers)?.verdict;
        let justification = normalize(draft.justification.as_deref());

        let Some(window_id) = draft.id else {
            let window = EligibilityWindow {
                id: WindowId::new(),
                case_id: *case_id,
                category: draft.category,
                start: draft.start,
                end: draft.end,
                source,
                verdict,
                answers,
                justification,
                deletion_note: None,
            };
            return Ok(self.windows.insert(window)?);
        };

        let existing = self.editable_window(case_id, window_id)?;
        if existing.source == WindowSource::System {
            ensure_bounds_unchanged(&existing, &draft)?;
        }

        let updated = EligibilityWindow {
            category: draft.category,
            start: draft.start,
            end: draft.end,
            verdict,
            answers,
            justification,
            ..existing
        };
        self.windows.update(updated.clone())?;
        Ok(updated)
    }

    /// Every window of the case, deleted ones included, ordered by start date then category.
    pub fn list_for_case(
        &self,
        case_id: &CaseId,
    ) -> Result<Vec<EligibilityWindow>, RepositoryError> {
        let mut windows = self.windows.for_case(case_id)?;
        windows.sort_by(|left, right| {
            left.start
                .cmp(&right.start)
                .then_with(|| left.category.cmp(&right.category))
        });
        Ok(windows)
    }

    /// Soft-delete a window. It stays listed with a deleted verdict and never authorises payment.
    pub fn mark_deleted(
        &self,
        case_id: &CaseId,
        window_id: WindowId,
        note: Option<String>,
    ) -> Result<EligibilityWindow, StoreError> {
        let existing = self.editable_window(case_id, window_id)?;
        let deleted = EligibilityWindow {
            verdict: Verdict::Deleted,
            deletion_note: normalize(note.as_deref()),
            ..existing
        };
        self.windows.update(deleted.clone())?;
        Ok(deleted)
    }

    fn editable_window(
        &self,
        case_id: &CaseId,
        window_id: WindowId,
    ) -> Result<EligibilityWindow, StoreError> {
        let window = self
            .windows
            .fetch(&window_id)?
            .ok_or(StoreError::NotFound(window_id))?;
        if window.case_id != *case_id {
            return Err(StoreError::CaseMismatch {
                window_id,
                case_id: *case_id,
            });
        }
        if window.is_deleted() {
            return Err(StoreError::WindowDeleted(window_id));
        }
        Ok(window)
    }
}

fn ensure_bounds_unchanged(
    existing: &EligibilityWindow,
    draft: &WindowDraft,
) -> Result<(), ImmutableBoundsError> {
    let changed = if existing.start != draft.start {
        Some(BoundField::Start)
    } else if existing.end != draft.end {
        Some(BoundField::End)
    } else if existing.category != draft.category {
        Some(BoundField::Category)
    } else {
        None
    };
    match changed {
        Some(field) => Err(ImmutableBoundsError {
            window_id: existing.id,
            field,
        }),
        None => Ok(()),
    }
}

fn normalize(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
