//! Contract between the review workflow and the portal REST API.
//!
//! Every endpoint answers with the same `{success, message?, data?}` envelope.
//! `success: false` is a business rejection whose message is shown to the user
//! verbatim; anything that cannot be read as an envelope is a transport error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Assignment, AssignmentId, AssignmentStatus, Criterion, EvaluationWindow, PortalRole,
    ProposalRef, ReviewStage, ReviewStatus, ScoreEntry, ScoreScale,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Optional server-side filters of the assignment list (`?tahap=&status=`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentQuery {
    #[serde(rename = "tahap", skip_serializing_if = "Option::is_none")]
    pub stage: Option<ReviewStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AssignmentStatus>,
}

impl AssignmentQuery {
    pub fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();
        if let Some(stage) = self.stage {
            pairs.push(format!("tahap={}", stage.ordinal()));
        }
        if let Some(status) = self.status {
            pairs.push(format!("status={}", status.code()));
        }
        if pairs.is_empty() {
            String::new()
        } else {
            format!("?{}", pairs.join("&"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentList {
    pub penugasan: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectRequest {
    pub catatan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub nilai: Vec<ScoreEntry>,
}

/// Header of the review record as embedded in the scoring form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewHeader {
    pub status: ReviewStatus,
    #[serde(
        rename = "tanggal_submit",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Payload of `GET /{role}/penilaian/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringForm {
    pub kriteria: Vec<Criterion>,
    pub skala_skor: ScoreScale,
    #[serde(default)]
    pub nilai: Vec<ScoreEntry>,
    #[serde(default)]
    pub penilaian: Option<ReviewHeader>,
    pub proposal: ProposalRef,
    pub tahap: ReviewStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periode: Option<EvaluationWindow>,
}

/// Message returned by a successful mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// `success: false`; the message is displayed unchanged.
    #[error("{message}")]
    Rejected { message: String },
    #[error("portal request failed: {0}")]
    Transport(String),
    #[error("portal response could not be decoded: {0}")]
    Decode(String),
    #[error("portal response is missing its data payload")]
    MissingData,
}

/// Transport seam for the portal API; one method per endpoint.
#[async_trait]
pub trait PortalGateway: Send + Sync {
    async fn list_assignments(
        &self,
        role: PortalRole,
        query: &AssignmentQuery,
    ) -> Result<Vec<Assignment>, GatewayError>;

    async fn assignment(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<Assignment, GatewayError>;

    async fn accept(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<Acknowledgement, GatewayError>;

    async fn reject(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        request: &RejectRequest,
    ) -> Result<Acknowledgement, GatewayError>;

    async fn scoring_form(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<ScoringForm, GatewayError>;

    async fn save_draft(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        request: &DraftRequest,
    ) -> Result<Acknowledgement, GatewayError>;

    async fn submit(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<Acknowledgement, GatewayError>;
}
