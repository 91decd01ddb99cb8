use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{info, warn};

use super::assignment::{AssignmentAction, RejectionNote, TransitionError};
use super::domain::{
    Assignment, AssignmentId, AssignmentStatus, Capabilities, DomainError, PortalRole,
    ReviewStatus, Rubric, ScoreEntry,
};
use super::filter::{filter_assignments, AssignmentFilter};
use super::gateway::{
    Acknowledgement, AssignmentQuery, DraftRequest, GatewayError, PortalGateway, RejectRequest,
};
use super::session::{ScoringSession, SessionError};
use super::transition::{request_transition, ConfirmationPrompt, TransitionKind};

/// Role-parametrised review workflow on top of a [`PortalGateway`].
///
/// Holds no fetched state of its own: every successful mutation is followed by
/// a re-fetch, and callers keep their snapshot untouched when a call fails.
pub struct ReviewWorkflow<G> {
    gateway: Arc<G>,
    role: PortalRole,
    capabilities: Capabilities,
    in_flight: InFlight,
}

impl<G> ReviewWorkflow<G>
where
    G: PortalGateway + 'static,
{
    pub fn new(gateway: Arc<G>, role: PortalRole) -> Self {
        Self {
            gateway,
            role,
            capabilities: role.capabilities(),
            in_flight: InFlight::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn role(&self) -> PortalRole {
        self.role
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether a mutating call for the assignment is outstanding.
    pub fn is_busy(&self, id: &AssignmentId) -> bool {
        self.in_flight.contains(id)
    }

    pub async fn list_assignments(
        &self,
        query: &AssignmentQuery,
    ) -> Result<Vec<Assignment>, WorkflowError> {
        Ok(self.gateway.list_assignments(self.role, query).await?)
    }

    /// Server-side stage/status filtering, then the local search.
    pub async fn search_assignments(
        &self,
        filter: &AssignmentFilter,
    ) -> Result<Vec<Assignment>, WorkflowError> {
        let query = AssignmentQuery {
            stage: filter.stage,
            status: None,
        };
        let list = self.list_assignments(&query).await?;
        Ok(filter_assignments(&list, filter))
    }

    pub async fn assignment(&self, id: &AssignmentId) -> Result<Assignment, WorkflowError> {
        Ok(self.gateway.assignment(self.role, id).await?)
    }

    /// First phase of accept/reject: no network, just the prompt.
    pub fn request_transition(
        &self,
        assignment: &Assignment,
        kind: &TransitionKind,
    ) -> Result<ConfirmationPrompt, WorkflowError> {
        self.ensure_permitted(kind.action())?;
        Ok(request_transition(assignment, kind)?)
    }

    /// Second phase: performs the transition and returns the re-fetched assignment.
    pub async fn commit_transition(
        &self,
        assignment: &Assignment,
        kind: &TransitionKind,
    ) -> Result<Assignment, WorkflowError> {
        let action = kind.action();
        self.ensure_permitted(action)?;
        assignment.ensure_can(action)?;

        let note = match kind {
            TransitionKind::Reject { note } => Some(RejectionNote::parse(note).map_err(|err| {
                warn!(assignment = %assignment.id, error = %err, "rejection note refused locally");
                err
            })?),
            TransitionKind::Accept => None,
        };

        let _guard = self.in_flight.begin(&assignment.id)?;
        let result = match note {
            Some(note) => {
                let request = RejectRequest {
                    catatan: note.into_inner(),
                };
                self.gateway
                    .reject(self.role, &assignment.id, &request)
                    .await
            }
            None => self.gateway.accept(self.role, &assignment.id).await,
        };

        match result {
            Ok(ack) => {
                info!(
                    assignment = %assignment.id,
                    role = %self.role,
                    action = %action,
                    message = ack.message.as_deref().unwrap_or_default(),
                    "assignment transition committed"
                );
            }
            Err(err) => {
                warn!(assignment = %assignment.id, action = %action, error = %err, "assignment transition failed");
                return Err(err.into());
            }
        }

        Ok(self.gateway.assignment(self.role, &assignment.id).await?)
    }

    pub async fn accept(&self, assignment: &Assignment) -> Result<Assignment, WorkflowError> {
        self.commit_transition(assignment, &TransitionKind::Accept)
            .await
    }

    pub async fn reject(
        &self,
        assignment: &Assignment,
        note: &str,
    ) -> Result<Assignment, WorkflowError> {
        let kind = TransitionKind::Reject {
            note: note.to_string(),
        };
        self.commit_transition(assignment, &kind).await
    }

    /// Loads the scoring form into a local session. Finalized assignments open
    /// read-only, since their review header says submitted.
    pub async fn open_scoring(
        &self,
        assignment: &Assignment,
    ) -> Result<ScoringSession, WorkflowError> {
        self.ensure_permitted(AssignmentAction::SaveDraft)?;
        if !assignment.status.is_scoring() && assignment.status != AssignmentStatus::Finalized {
            return Err(TransitionError::InvalidState {
                status: assignment.status,
                action: AssignmentAction::SaveDraft,
            }
            .into());
        }

        let form = self.gateway.scoring_form(self.role, &assignment.id).await?;
        let rubric = Rubric::new(form.tahap, form.kriteria, form.skala_skor)?;
        let (status, submitted_at) = match form.penilaian {
            Some(header) => (header.status, header.submitted_at),
            None => (ReviewStatus::Draft, None),
        };

        Ok(ScoringSession::new(
            assignment.id.clone(),
            form.proposal,
            rubric,
            form.nilai,
            status,
            submitted_at,
        )
        .with_window(form.periode.or(assignment.window)))
    }

    /// Persists the local sheet as a draft, then reloads the session from the
    /// server and returns the re-fetched assignment.
    pub async fn save_draft(
        &self,
        session: &mut ScoringSession,
    ) -> Result<Assignment, WorkflowError> {
        self.ensure_permitted(AssignmentAction::SaveDraft)?;
        let nilai = session.draft_payload().map_err(|err| {
            warn!(assignment = %session.assignment_id(), error = %err, "draft refused locally");
            err
        })?;
        ensure_window_open(session)?;

        let id = session.assignment_id().clone();
        let _guard = self.in_flight.begin(&id)?;
        let saved = nilai.len();
        let ack = self
            .gateway
            .save_draft(self.role, &id, &DraftRequest { nilai })
            .await
            .map_err(|err| {
                warn!(assignment = %id, error = %err, "draft save failed");
                err
            })?;

        session.mark_saved();
        info!(
            assignment = %id,
            role = %self.role,
            saved,
            message = ack.message.as_deref().unwrap_or_default(),
            "draft scores saved"
        );
        Ok(self.refresh(&id, session).await?)
    }

    /// Irreversible submit. Unsaved edits are persisted first; the session stays
    /// locked from the moment the submit starts and unlocks again on failure.
    /// Returns the re-fetched assignment.
    pub async fn submit(
        &self,
        session: &mut ScoringSession,
    ) -> Result<Assignment, WorkflowError> {
        self.ensure_permitted(AssignmentAction::Submit)?;
        session.request_submit()?;
        ensure_window_open(session)?;

        let id = session.assignment_id().clone();
        let _guard = self.in_flight.begin(&id)?;

        let pending_draft = if session.is_dirty() {
            Some(session.draft_payload()?)
        } else {
            None
        };

        session.begin_submit();
        match self.persist_and_submit(&id, pending_draft).await {
            Ok(ack) => {
                session.mark_submitted(Utc::now());
                info!(
                    assignment = %id,
                    role = %self.role,
                    total = session.total(),
                    message = ack.message.as_deref().unwrap_or_default(),
                    "review submitted"
                );
            }
            Err(err) => {
                session.abort_submit();
                warn!(assignment = %id, error = %err, "review submit failed");
                return Err(err.into());
            }
        }

        Ok(self.refresh(&id, session).await?)
    }

    /// Pulls the server's copy of the sheet into the session and returns the
    /// current assignment.
    async fn refresh(
        &self,
        id: &AssignmentId,
        session: &mut ScoringSession,
    ) -> Result<Assignment, GatewayError> {
        let form = self.gateway.scoring_form(self.role, id).await?;
        let (status, submitted_at) = match form.penilaian {
            Some(header) => (header.status, header.submitted_at),
            None => (ReviewStatus::Draft, None),
        };
        session.reload(form.nilai, status, submitted_at);
        self.gateway.assignment(self.role, id).await
    }

    async fn persist_and_submit(
        &self,
        id: &AssignmentId,
        pending_draft: Option<Vec<ScoreEntry>>,
    ) -> Result<Acknowledgement, GatewayError> {
        if let Some(nilai) = pending_draft {
            self.gateway
                .save_draft(self.role, id, &DraftRequest { nilai })
                .await?;
        }
        self.gateway.submit(self.role, id).await
    }

    fn ensure_permitted(&self, action: AssignmentAction) -> Result<(), WorkflowError> {
        if action.permitted_by(self.capabilities) {
            Ok(())
        } else {
            Err(WorkflowError::NotPermitted {
                role: self.role,
                action,
            })
        }
    }

    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }
}

fn ensure_window_open(session: &ScoringSession) -> Result<(), TransitionError> {
    match session.window() {
        Some(window) if !window.contains(Utc::now()) => Err(TransitionError::OutsideWindow(window)),
        _ => Ok(()),
    }
}

/// Per-assignment busy markers gating mutating calls.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    active: Mutex<HashSet<AssignmentId>>,
}

impl InFlight {
    pub(crate) fn begin(&self, id: &AssignmentId) -> Result<InFlightGuard<'_>, WorkflowError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert(id.clone()) {
            return Err(WorkflowError::Busy(id.clone()));
        }
        Ok(InFlightGuard {
            owner: self,
            id: id.clone(),
        })
    }

    fn contains(&self, id: &AssignmentId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}

pub(crate) struct InFlightGuard<'a> {
    owner: &'a InFlight,
    id: AssignmentId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// How a failure should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Inline next to the offending field; nothing was sent.
    Validation,
    /// Dismissible alert carrying the backend's message.
    Rejected,
    /// Generic failure alert.
    Transport,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("scoring form is invalid: {0}")]
    Rubric(#[from] DomainError),
    #[error("a request for assignment {0} is already in progress")]
    Busy(AssignmentId),
    #[error("role {role} may not {action}")]
    NotPermitted {
        role: PortalRole,
        action: AssignmentAction,
    },
}

impl WorkflowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Gateway(GatewayError::Rejected { .. }) => ErrorCategory::Rejected,
            Self::Gateway(_) | Self::Rubric(_) => ErrorCategory::Transport,
            Self::Transition(_) | Self::Session(_) | Self::Busy(_) | Self::NotPermitted { .. } => {
                ErrorCategory::Validation
            }
        }
    }
}
