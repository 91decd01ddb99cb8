use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::service::{PortalError, PortalService};
use super::store::{PortalStore, StoreError};
use crate::workflows::review::assignment::TransitionError;
use crate::workflows::review::domain::{
    AssignmentId, AssignmentStatus, PortalRole, ReviewStage,
};
use crate::workflows::review::gateway::{
    ApiEnvelope, AssignmentList, AssignmentQuery, DraftRequest, RejectRequest,
};

/// Portal API routes mounted under `base` (for example `/api`).
pub fn portal_router<S>(service: Arc<PortalService<S>>, base: &str) -> Router
where
    S: PortalStore + 'static,
{
    let routes = Router::new()
        .route("/:role/penugasan", get(list_handler::<S>))
        .route("/:role/penugasan/:id", get(detail_handler::<S>))
        .route("/:role/penugasan/:id/accept", patch(accept_handler::<S>))
        .route("/:role/penugasan/:id/reject", patch(reject_handler::<S>))
        .route(
            "/:role/penilaian/:id",
            get(scoring_form_handler::<S>).post(save_draft_handler::<S>),
        )
        .route("/:role/penilaian/:id/submit", post(submit_handler::<S>))
        .with_state(service);

    let base = base.trim_end_matches('/');
    if base.is_empty() {
        routes
    } else {
        Router::new().nest(base, routes)
    }
}

/// Raw query string; empty values mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListParams {
    tahap: Option<String>,
    status: Option<String>,
}

impl ListParams {
    fn into_query(self) -> Result<AssignmentQuery, String> {
        let stage = match self.tahap.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let ordinal: u8 = raw
                    .parse()
                    .map_err(|_| format!("invalid tahap '{raw}'"))?;
                Some(ReviewStage::try_from(ordinal).map_err(|err| err.to_string())?)
            }
        };
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<AssignmentStatus>()
                    .map_err(|err| err.to_string())?,
            ),
        };
        Ok(AssignmentQuery { stage, status })
    }
}

fn parse_role(raw: &str) -> Result<PortalRole, Response> {
    raw.parse::<PortalRole>()
        .map_err(|err| failure(StatusCode::NOT_FOUND, err.to_string()))
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiEnvelope::<()>::failure(message))).into_response()
}

fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiEnvelope::ok(data))).into_response()
}

fn acknowledged(message: impl Into<String>) -> Response {
    (StatusCode::OK, Json(ApiEnvelope::<()>::message(message))).into_response()
}

pub(crate) fn status_for(error: &PortalError) -> StatusCode {
    match error {
        PortalError::NotFound(_) | PortalError::Store(StoreError::NotFound) => {
            StatusCode::NOT_FOUND
        }
        PortalError::Transition(TransitionError::NoteTooShort { .. })
        | PortalError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PortalError::Transition(_)
        | PortalError::AlreadySubmitted(_)
        | PortalError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        PortalError::MissingRubric(_) | PortalError::Store(StoreError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn portal_failure(error: PortalError) -> Response {
    failure(status_for(&error), error.to_string())
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<PortalService<S>>>,
    Path(role): Path<String>,
    Query(params): Query<ListParams>,
) -> Response
where
    S: PortalStore + 'static,
{
    let role = match parse_role(&role) {
        Ok(role) => role,
        Err(response) => return response,
    };
    let query = match params.into_query() {
        Ok(query) => query,
        Err(message) => return failure(StatusCode::UNPROCESSABLE_ENTITY, message),
    };

    match service.list(role, &query) {
        Ok(penugasan) => success(AssignmentList { penugasan }),
        Err(error) => portal_failure(error),
    }
}

pub(crate) async fn detail_handler<S>(
    State(service): State<Arc<PortalService<S>>>,
    Path((role, id)): Path<(String, String)>,
) -> Response
where
    S: PortalStore + 'static,
{
    let role = match parse_role(&role) {
        Ok(role) => role,
        Err(response) => return response,
    };

    match service.detail(role, &AssignmentId::new(id)) {
        Ok(assignment) => success(assignment),
        Err(error) => portal_failure(error),
    }
}

pub(crate) async fn accept_handler<S>(
    State(service): State<Arc<PortalService<S>>>,
    Path((role, id)): Path<(String, String)>,
) -> Response
where
    S: PortalStore + 'static,
{
    let role = match parse_role(&role) {
        Ok(role) => role,
        Err(response) => return response,
    };

    match service.accept(role, &AssignmentId::new(id), Utc::now()) {
        Ok(_) => acknowledged("Penugasan berhasil diterima"),
        Err(error) => portal_failure(error),
    }
}

pub(crate) async fn reject_handler<S>(
    State(service): State<Arc<PortalService<S>>>,
    Path((role, id)): Path<(String, String)>,
    payload: Result<Json<RejectRequest>, JsonRejection>,
) -> Response
where
    S: PortalStore + 'static,
{
    let role = match parse_role(&role) {
        Ok(role) => role,
        Err(response) => return response,
    };
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return failure(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text()),
    };

    match service.reject(role, &AssignmentId::new(id), &request.catatan, Utc::now()) {
        Ok(_) => acknowledged("Penugasan berhasil ditolak"),
        Err(error) => portal_failure(error),
    }
}

pub(crate) async fn scoring_form_handler<S>(
    State(service): State<Arc<PortalService<S>>>,
    Path((role, id)): Path<(String, String)>,
) -> Response
where
    S: PortalStore + 'static,
{
    let role = match parse_role(&role) {
        Ok(role) => role,
        Err(response) => return response,
    };

    match service.scoring_form(role, &AssignmentId::new(id)) {
        Ok(form) => success(form),
        Err(error) => portal_failure(error),
    }
}

pub(crate) async fn save_draft_handler<S>(
    State(service): State<Arc<PortalService<S>>>,
    Path((role, id)): Path<(String, String)>,
    payload: Result<Json<DraftRequest>, JsonRejection>,
) -> Response
where
    S: PortalStore + 'static,
{
    let role = match parse_role(&role) {
        Ok(role) => role,
        Err(response) => return response,
    };
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return failure(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text()),
    };

    match service.save_draft(role, &AssignmentId::new(id), &request.nilai, Utc::now()) {
        Ok(saved) => acknowledged(format!("Draft penilaian tersimpan ({saved} kriteria)")),
        Err(error) => portal_failure(error),
    }
}

pub(crate) async fn submit_handler<S>(
    State(service): State<Arc<PortalService<S>>>,
    Path((role, id)): Path<(String, String)>,
) -> Response
where
    S: PortalStore + 'static,
{
    let role = match parse_role(&role) {
        Ok(role) => role,
        Err(response) => return response,
    };

    match service.submit(role, &AssignmentId::new(id), Utc::now()) {
        Ok(_) => acknowledged("Penilaian berhasil disubmit"),
        Err(error) => portal_failure(error),
    }
}
