use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::catalog::RubricCatalog;
use super::store::{PortalStore, StoreError};
use crate::workflows::review::assignment::{AssignmentAction, RejectionNote, TransitionError};
use crate::workflows::review::domain::{
    Assignment, AssignmentId, AssignmentStatus, PortalRole, ReviewRecord, ReviewStage,
    ReviewStatus, Rubric, ScoreEntry,
};
use crate::workflows::review::gateway::{AssignmentQuery, ReviewHeader, ScoringForm};
use crate::workflows::review::session::join_errors;
use crate::workflows::review::submission::{prepare_draft, validate_for_submit, ValidationError};

/// Server side of the portal API: the same state machine and submission gate
/// the client enforces, applied again against the store.
pub struct PortalService<S> {
    store: Arc<S>,
    catalog: RubricCatalog,
}

impl<S> PortalService<S>
where
    S: PortalStore + 'static,
{
    pub fn new(store: Arc<S>, catalog: RubricCatalog) -> Self {
        Self { store, catalog }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn list(
        &self,
        role: PortalRole,
        query: &AssignmentQuery,
    ) -> Result<Vec<Assignment>, PortalError> {
        Ok(self
            .store
            .list(role)?
            .into_iter()
            .filter(|assignment| query.stage.map_or(true, |stage| assignment.stage == stage))
            .filter(|assignment| {
                query.status.map_or(true, |status| {
                    assignment.status == status || assignment.display_status() == status
                })
            })
            .collect())
    }

    pub fn detail(&self, role: PortalRole, id: &AssignmentId) -> Result<Assignment, PortalError> {
        self.store
            .fetch(role, id)?
            .ok_or_else(|| PortalError::NotFound(id.clone()))
    }

    pub fn accept(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        at: DateTime<Utc>,
    ) -> Result<Assignment, PortalError> {
        let mut assignment = self.detail(role, id)?;
        let expected = assignment.status;
        assignment.accept(at)?;
        self.store.update(role, assignment.clone(), expected)?;
        info!(assignment = %id, %role, "assignment accepted");
        Ok(assignment)
    }

    pub fn reject(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<Assignment, PortalError> {
        let mut assignment = self.detail(role, id)?;
        let expected = assignment.status;
        assignment.ensure_can(AssignmentAction::Reject)?;
        let note = RejectionNote::parse(note)?;
        assignment.reject(note, at)?;
        self.store.update(role, assignment.clone(), expected)?;
        info!(assignment = %id, %role, "assignment rejected");
        Ok(assignment)
    }

    pub fn scoring_form(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<ScoringForm, PortalError> {
        let assignment = self.detail(role, id)?;
        if !assignment.status.is_scoring() && assignment.status != AssignmentStatus::Finalized {
            return Err(TransitionError::InvalidState {
                status: assignment.status,
                action: AssignmentAction::SaveDraft,
            }
            .into());
        }

        let rubric = self.rubric(assignment.stage)?;
        let review = self.store.review(role, id)?;
        let (nilai, penilaian) = match review {
            Some(record) => (
                record.entries,
                Some(ReviewHeader {
                    status: record.status,
                    submitted_at: record.submitted_at,
                }),
            ),
            None => (Vec::new(), None),
        };

        Ok(ScoringForm {
            kriteria: rubric.criteria().to_vec(),
            skala_skor: rubric.scale().clone(),
            nilai,
            penilaian,
            proposal: assignment.proposal,
            tahap: assignment.stage,
            periode: assignment.window,
        })
    }

    /// Replaces the stored draft with the submitted entries.
    pub fn save_draft(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        entries: &[ScoreEntry],
        at: DateTime<Utc>,
    ) -> Result<usize, PortalError> {
        let (mut assignment, mut record, rubric) =
            self.open_review(role, id, AssignmentAction::SaveDraft, at)?;

        let draft = prepare_draft(rubric, entries).map_err(|err| {
            warn!(assignment = %id, error = %err, "draft refused");
            PortalError::Invalid(vec![err])
        })?;

        let expected = assignment.status;
        record.entries = draft;
        let saved = record.scored_entries();
        assignment.saved_scores = u32::try_from(saved).unwrap_or(u32::MAX);

        self.store.commit_review(role, assignment, expected, record)?;
        info!(assignment = %id, %role, saved, "draft stored");
        Ok(saved)
    }

    pub fn submit(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        at: DateTime<Utc>,
    ) -> Result<ReviewRecord, PortalError> {
        let (mut assignment, mut record, rubric) =
            self.open_review(role, id, AssignmentAction::Submit, at)?;

        validate_for_submit(rubric, &record.entries).map_err(|errors| {
            warn!(assignment = %id, missing = errors.len(), "submit refused");
            PortalError::Invalid(errors)
        })?;

        let expected = assignment.status;
        assignment.finalize()?;
        record.status = ReviewStatus::Submitted;
        record.submitted_at = Some(at);

        self.store
            .commit_review(role, assignment, expected, record.clone())?;
        info!(assignment = %id, %role, "review submitted");
        Ok(record)
    }

    fn open_review(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        action: AssignmentAction,
        at: DateTime<Utc>,
    ) -> Result<(Assignment, ReviewRecord, &Rubric), PortalError> {
        let assignment = self.detail(role, id)?;
        assignment.ensure_can(action)?;
        assignment.ensure_window_open(at)?;

        let record = self
            .store
            .review(role, id)?
            .unwrap_or_else(|| ReviewRecord::draft(id.clone()));
        if record.is_submitted() {
            return Err(PortalError::AlreadySubmitted(id.clone()));
        }

        let rubric = self.rubric(assignment.stage)?;
        Ok((assignment, record, rubric))
    }

    fn rubric(&self, stage: ReviewStage) -> Result<&Rubric, PortalError> {
        self.catalog
            .rubric(stage)
            .ok_or(PortalError::MissingRubric(stage))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("assignment {0} not found")]
    NotFound(AssignmentId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("scores for assignment {0} are already submitted")]
    AlreadySubmitted(AssignmentId),
    #[error("{}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
    #[error("no rubric is configured for stage {0}")]
    MissingRubric(ReviewStage),
    #[error(transparent)]
    Store(#[from] StoreError),
}
