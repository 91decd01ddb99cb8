//! Assignment life cycle, weighted scoring and the review submission gate.

pub mod assignment;
pub mod domain;
pub mod filter;
pub mod gateway;
pub mod http;
pub mod portal;
pub mod scoring;
pub mod service;
pub mod session;
pub mod submission;
pub mod transition;

#[cfg(test)]
mod tests;

pub use assignment::{
    AssignmentAction, AssignmentActions, RejectionNote, TransitionError,
    MIN_REJECTION_NOTE_CHARS,
};
pub use domain::{
    AssigneeId, Assignment, AssignmentId, AssignmentStatus, Capabilities, Criterion,
    CriterionId, DomainError, EvaluationWindow, PortalRole, ProposalId, ProposalRef,
    ReviewRecord, ReviewStage, ReviewStatus, Rubric, ScoreEntry, ScoreScale, StatusTone,
};
pub use filter::{filter_assignments, summarize, AssignmentFilter, AssignmentSummary};
pub use gateway::{
    Acknowledgement, ApiEnvelope, AssignmentQuery, DraftRequest, GatewayError, PortalGateway,
    RejectRequest, ReviewHeader, ScoringForm,
};
pub use http::ServiceGateway;
pub use scoring::{
    compute_total, compute_weighted_score, score_breakdown, ScoreBreakdown, ScoreLine,
};
pub use service::{ErrorCategory, ReviewWorkflow, WorkflowError};
pub use session::{ScoringSession, SessionError};
pub use submission::{prepare_draft, validate_for_submit, ValidationError};
pub use transition::{request_transition, ConfirmationPrompt, TransitionKind};
