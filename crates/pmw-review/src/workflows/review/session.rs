use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::domain::{
    AssignmentId, CriterionId, EvaluationWindow, ProposalRef, ReviewStatus, Rubric, ScoreEntry,
};
use super::scoring::{score_breakdown, ScoreBreakdown};
use super::submission::{prepare_draft, validate_for_submit, ValidationError};
use super::transition::ConfirmationPrompt;

/// Local working copy of a scoring form.
///
/// Edits are refused once the review is submitted, or while a submit is in
/// flight.
#[derive(Debug, Clone)]
pub struct ScoringSession {
    assignment_id: AssignmentId,
    proposal: ProposalRef,
    rubric: Rubric,
    window: Option<EvaluationWindow>,
    entries: BTreeMap<CriterionId, ScoreEntry>,
    status: ReviewStatus,
    submitted_at: Option<DateTime<Utc>>,
    submitting: bool,
    dirty: bool,
    persisted: bool,
}

impl ScoringSession {
    pub fn new(
        assignment_id: AssignmentId,
        proposal: ProposalRef,
        rubric: Rubric,
        saved: Vec<ScoreEntry>,
        status: ReviewStatus,
        submitted_at: Option<DateTime<Utc>>,
    ) -> Self {
        let entries = index_entries(saved);
        let persisted = any_scored(&entries);

        Self {
            assignment_id,
            proposal,
            rubric,
            window: None,
            entries,
            status,
            submitted_at,
            submitting: false,
            dirty: false,
            persisted,
        }
    }

    pub fn with_window(mut self, window: Option<EvaluationWindow>) -> Self {
        self.window = window;
        self
    }

    pub fn assignment_id(&self) -> &AssignmentId {
        &self.assignment_id
    }

    pub fn proposal(&self) -> &ProposalRef {
        &self.proposal
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    pub fn window(&self) -> Option<EvaluationWindow> {
        self.window
    }

    pub fn status(&self) -> ReviewStatus {
        self.status
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn is_locked(&self) -> bool {
        self.status == ReviewStatus::Submitted || self.submitting
    }

    /// True when local edits have not been persisted yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True when the server holds at least one score for this sheet, whether
    /// or not local edits are pending on top of it.
    pub fn has_saved_scores(&self) -> bool {
        self.persisted
    }

    /// One entry per criterion in rubric order; unscored criteria come back unset.
    pub fn entries(&self) -> Vec<ScoreEntry> {
        self.rubric
            .criteria()
            .iter()
            .map(|criterion| {
                self.entries
                    .get(&criterion.id)
                    .cloned()
                    .unwrap_or_else(|| ScoreEntry {
                        criterion: criterion.id.clone(),
                        score: None,
                        note: None,
                    })
            })
            .collect()
    }

    pub fn set_score(
        &mut self,
        criterion: &CriterionId,
        score: Option<u32>,
    ) -> Result<(), SessionError> {
        self.entry_mut(criterion)?.score = score;
        self.dirty = true;
        Ok(())
    }

    pub fn set_note(
        &mut self,
        criterion: &CriterionId,
        note: Option<String>,
    ) -> Result<(), SessionError> {
        self.entry_mut(criterion)?.note = note.filter(|value| !value.trim().is_empty());
        self.dirty = true;
        Ok(())
    }

    fn entry_mut(&mut self, criterion: &CriterionId) -> Result<&mut ScoreEntry, SessionError> {
        if self.is_locked() {
            return Err(SessionError::Locked(self.assignment_id.clone()));
        }
        if self.rubric.criterion(criterion).is_none() {
            return Err(SessionError::UnknownCriterion(criterion.clone()));
        }
        Ok(self
            .entries
            .entry(criterion.clone())
            .or_insert_with(|| ScoreEntry {
                criterion: criterion.clone(),
                score: None,
                note: None,
            }))
    }

    pub fn total(&self) -> f64 {
        self.breakdown().total
    }

    pub fn breakdown(&self) -> ScoreBreakdown {
        score_breakdown(&self.rubric, &self.entries())
    }

    pub fn validate_for_submit(&self) -> Result<(), Vec<ValidationError>> {
        validate_for_submit(&self.rubric, &self.entries())
    }

    /// Payload for a draft save. Refused locally once the sheet is locked.
    pub fn draft_payload(&self) -> Result<Vec<ScoreEntry>, SessionError> {
        if self.is_locked() {
            return Err(SessionError::Locked(self.assignment_id.clone()));
        }
        Ok(prepare_draft(&self.rubric, &self.entries())?)
    }

    /// First phase of a submit: confirms the sheet is complete and builds the prompt.
    pub fn request_submit(&self) -> Result<ConfirmationPrompt, SessionError> {
        if self.is_locked() {
            return Err(SessionError::Locked(self.assignment_id.clone()));
        }
        self.validate_for_submit()
            .map_err(SessionError::Incomplete)?;

        let breakdown = self.breakdown();
        Ok(ConfirmationPrompt {
            title: "Submit penilaian".to_string(),
            message: format!(
                "Submit scores for \"{}\" with a total of {} out of {}? Submitted scores can no longer be changed.",
                self.proposal.title, breakdown.total, breakdown.max_total
            ),
            confirm_label: "Submit",
            destructive: true,
        })
    }

    pub(crate) fn mark_saved(&mut self) {
        self.dirty = false;
        self.persisted = any_scored(&self.entries);
    }

    /// Replaces the local sheet with what the server returned after a save or
    /// submit.
    pub(crate) fn reload(
        &mut self,
        saved: Vec<ScoreEntry>,
        status: ReviewStatus,
        submitted_at: Option<DateTime<Utc>>,
    ) {
        self.entries = index_entries(saved);
        self.persisted = any_scored(&self.entries);
        self.dirty = false;
        self.submitting = false;
        self.status = status;
        self.submitted_at = submitted_at;
    }

    pub(crate) fn begin_submit(&mut self) {
        self.submitting = true;
    }

    pub(crate) fn abort_submit(&mut self) {
        self.submitting = false;
    }

    pub(crate) fn mark_submitted(&mut self, at: DateTime<Utc>) {
        self.submitting = false;
        self.dirty = false;
        self.persisted = any_scored(&self.entries);
        self.status = ReviewStatus::Submitted;
        self.submitted_at = Some(at);
    }
}

fn index_entries(saved: Vec<ScoreEntry>) -> BTreeMap<CriterionId, ScoreEntry> {
    saved
        .into_iter()
        .map(|entry| (entry.criterion.clone(), entry))
        .collect()
}

fn any_scored(entries: &BTreeMap<CriterionId, ScoreEntry>) -> bool {
    entries.values().any(|entry| entry.score.is_some())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("scores for assignment {0} are submitted and can no longer change")]
    Locked(AssignmentId),
    #[error("criterion {0} is not part of this rubric")]
    UnknownCriterion(CriterionId),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("scores are incomplete: {}", join_errors(.0))]
    Incomplete(Vec<ValidationError>),
}

impl SessionError {
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        match self {
            Self::Invalid(error) => vec![error.clone()],
            Self::Incomplete(errors) => errors.clone(),
            Self::Locked(_) | Self::UnknownCriterion(_) => Vec::new(),
        }
    }
}

pub(crate) fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
