use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::domain::{Assignment, AssignmentStatus, Capabilities, EvaluationWindow};

/// Minimum length of a rejection note, counted in characters after trimming.
pub const MIN_REJECTION_NOTE_CHARS: usize = 10;

/// Assignee-triggered actions on an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentAction {
    Accept,
    Reject,
    SaveDraft,
    Submit,
}

impl AssignmentAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::SaveDraft => "save draft",
            Self::Submit => "submit",
        }
    }

    pub const fn permitted_by(self, capabilities: Capabilities) -> bool {
        match self {
            Self::Accept => capabilities.can_accept,
            Self::Reject => capabilities.can_reject,
            Self::SaveDraft | Self::Submit => capabilities.can_score,
        }
    }
}

impl fmt::Display for AssignmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trimmed rejection note that satisfies the minimum length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RejectionNote(String);

impl RejectionNote {
    pub fn parse(raw: &str) -> Result<Self, TransitionError> {
        let trimmed = raw.trim();
        let length = trimmed.chars().count();
        if length < MIN_REJECTION_NOTE_CHARS {
            return Err(TransitionError::NoteTooShort {
                length,
                minimum: MIN_REJECTION_NOTE_CHARS,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Which controls of an assignment row are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssignmentActions {
    pub can_accept: bool,
    pub can_reject: bool,
    pub can_score: bool,
    pub can_submit: bool,
}

impl Assignment {
    pub fn ensure_can(&self, action: AssignmentAction) -> Result<(), TransitionError> {
        let allowed = match action {
            AssignmentAction::Accept | AssignmentAction::Reject => {
                self.status == AssignmentStatus::Pending
            }
            AssignmentAction::SaveDraft | AssignmentAction::Submit => self.status.is_scoring(),
        };

        if allowed {
            Ok(())
        } else {
            Err(TransitionError::InvalidState {
                status: self.status,
                action,
            })
        }
    }

    /// Scoring actions are refused outside the evaluation window.
    pub fn ensure_window_open(&self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        match self.window {
            Some(window) if !window.contains(at) => Err(TransitionError::OutsideWindow(window)),
            _ => Ok(()),
        }
    }

    pub fn accept(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_can(AssignmentAction::Accept)?;
        self.status = AssignmentStatus::Accepted;
        self.responded_at = Some(at);
        Ok(())
    }

    pub fn reject(&mut self, note: RejectionNote, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_can(AssignmentAction::Reject)?;
        self.status = AssignmentStatus::Rejected;
        self.responded_at = Some(at);
        self.rejection_note = Some(note.into_inner());
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<(), TransitionError> {
        self.ensure_can(AssignmentAction::Submit)?;
        self.status = AssignmentStatus::Finalized;
        Ok(())
    }

    /// Status to display: an accepted assignment with saved scores reads as Draft.
    pub fn display_status(&self) -> AssignmentStatus {
        match self.status {
            AssignmentStatus::Accepted if self.saved_scores > 0 => AssignmentStatus::Draft,
            other => other,
        }
    }

    pub fn actions(&self, capabilities: Capabilities) -> AssignmentActions {
        let enabled = |action: AssignmentAction| {
            action.permitted_by(capabilities) && self.ensure_can(action).is_ok()
        };
        AssignmentActions {
            can_accept: enabled(AssignmentAction::Accept),
            can_reject: enabled(AssignmentAction::Reject),
            can_score: enabled(AssignmentAction::SaveDraft),
            can_submit: enabled(AssignmentAction::Submit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {action} an assignment that is {status}")]
    InvalidState {
        status: AssignmentStatus,
        action: AssignmentAction,
    },
    #[error("rejection note must be at least {minimum} characters, got {length}")]
    NoteTooShort { length: usize, minimum: usize },
    #[error(
        "evaluation window {} to {} is closed",
        .0.start().format("%Y-%m-%d %H:%M"),
        .0.end().format("%Y-%m-%d %H:%M")
    )]
    OutsideWindow(EvaluationWindow),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::review::domain::{
        AssigneeId, AssignmentId, ProposalId, ProposalRef, ReviewStage,
    };
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn pending() -> Assignment {
        Assignment::pending(
            AssignmentId::new("42"),
            ProposalRef {
                id: ProposalId::new("P-7"),
                title: "Keripik Tempe Organik".to_string(),
            },
            AssigneeId::new("rev-1"),
            ReviewStage::DESK_EVALUATION,
            now() - Duration::days(2),
        )
    }

    #[test]
    fn note_boundary_is_ten_trimmed_characters() {
        let nine = RejectionNote::parse("  123456789  ").expect_err("nine chars fail");
        assert_eq!(
            nine,
            TransitionError::NoteTooShort {
                length: 9,
                minimum: 10
            }
        );

        let ten = RejectionNote::parse("  1234567890 ").expect("ten chars pass");
        assert_eq!(ten.as_str(), "1234567890");
    }

    #[test]
    fn note_length_counts_characters_not_bytes() {
        assert!(RejectionNote::parse("ééééééééé").is_err());
        assert!(RejectionNote::parse("éééééééééé").is_ok());
    }

    #[test]
    fn accept_sets_response_timestamp() {
        let mut assignment = pending();
        assignment.accept(now()).expect("pending accepts");
        assert_eq!(assignment.status, AssignmentStatus::Accepted);
        assert_eq!(assignment.responded_at, Some(now()));
        assert!(assignment.rejection_note.is_none());
    }

    #[test]
    fn reject_records_note_and_timestamp() {
        let mut assignment = pending();
        let note = RejectionNote::parse("terlalu singkat").expect("valid note");
        assignment.reject(note, now()).expect("pending rejects");
        assert_eq!(assignment.status, AssignmentStatus::Rejected);
        assert_eq!(assignment.responded_at, Some(now()));
        assert_eq!(assignment.rejection_note.as_deref(), Some("terlalu singkat"));
    }

    #[test]
    fn accepted_assignment_refuses_accept_and_reject() {
        let mut assignment = pending();
        assignment.accept(now()).expect("accepts once");

        assert_eq!(
            assignment.accept(now()),
            Err(TransitionError::InvalidState {
                status: AssignmentStatus::Accepted,
                action: AssignmentAction::Accept,
            })
        );
        let note = RejectionNote::parse("sudah diterima sebelumnya").expect("valid");
        assert!(matches!(
            assignment.reject(note, now()),
            Err(TransitionError::InvalidState { .. })
        ));
    }

    #[test]
    fn pending_assignment_refuses_submit() {
        let mut assignment = pending();
        assert_eq!(
            assignment.finalize(),
            Err(TransitionError::InvalidState {
                status: AssignmentStatus::Pending,
                action: AssignmentAction::Submit,
            })
        );
    }

    #[test]
    fn finalize_is_irreversible() {
        let mut assignment = pending();
        assignment.accept(now()).expect("accept");
        assignment.finalize().expect("finalize from accepted");
        assert_eq!(assignment.status, AssignmentStatus::Finalized);
        assert!(assignment.finalize().is_err());
        assert!(assignment.ensure_can(AssignmentAction::SaveDraft).is_err());
    }

    #[test]
    fn display_status_derives_draft_from_saved_scores() {
        let mut assignment = pending();
        assignment.accept(now()).expect("accept");
        assert_eq!(assignment.display_status(), AssignmentStatus::Accepted);
        assignment.saved_scores = 2;
        assert_eq!(assignment.display_status(), AssignmentStatus::Draft);
    }

    #[test]
    fn actions_follow_status_and_capabilities() {
        let assignment = pending();
        let actions = assignment.actions(Capabilities::FULL);
        assert!(actions.can_accept && actions.can_reject);
        assert!(!actions.can_score && !actions.can_submit);

        let read_only = assignment.actions(Capabilities::READ_ONLY);
        assert!(!read_only.can_accept && !read_only.can_reject);

        let mut accepted = pending();
        accepted.accept(now()).expect("accept");
        let actions = accepted.actions(Capabilities::FULL);
        assert!(!actions.can_accept && !actions.can_reject);
        assert!(actions.can_score && actions.can_submit);
    }

    #[test]
    fn window_gate_rejects_closed_periods() {
        let window = EvaluationWindow::new(now() - Duration::days(1), now() + Duration::days(1))
            .expect("valid window");
        let assignment = pending().with_window(window);
        assert!(assignment.ensure_window_open(now()).is_ok());
        assert_eq!(
            assignment.ensure_window_open(now() + Duration::days(3)),
            Err(TransitionError::OutsideWindow(window))
        );
    }
}
