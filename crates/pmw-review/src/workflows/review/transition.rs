use serde::Serialize;

use super::assignment::{AssignmentAction, RejectionNote, TransitionError};
use super::domain::Assignment;

/// Assignment transitions that go through a confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKind {
    Accept,
    Reject { note: String },
}

impl TransitionKind {
    pub fn action(&self) -> AssignmentAction {
        match self {
            Self::Accept => AssignmentAction::Accept,
            Self::Reject { .. } => AssignmentAction::Reject,
        }
    }
}

/// What the confirmation dialog should say before a mutation is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationPrompt {
    pub title: String,
    pub message: String,
    pub confirm_label: &'static str,
    pub destructive: bool,
}

/// First phase of a transition. Pure: checks the state machine and the note,
/// never touches the network.
pub fn request_transition(
    assignment: &Assignment,
    kind: &TransitionKind,
) -> Result<ConfirmationPrompt, TransitionError> {
    assignment.ensure_can(kind.action())?;

    let title = &assignment.proposal.title;
    match kind {
        TransitionKind::Accept => Ok(ConfirmationPrompt {
            title: "Terima penugasan".to_string(),
            message: format!(
                "Accept the assignment to review \"{title}\" (tahap {})?",
                assignment.stage
            ),
            confirm_label: "Accept",
            destructive: false,
        }),
        TransitionKind::Reject { note } => {
            let note = RejectionNote::parse(note)?;
            Ok(ConfirmationPrompt {
                title: "Tolak penugasan".to_string(),
                message: format!(
                    "Reject the assignment to review \"{title}\" with the note \"{}\"? This cannot be undone.",
                    note.as_str()
                ),
                confirm_label: "Reject",
                destructive: true,
            })
        }
    }
}
