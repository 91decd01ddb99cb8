use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::workflows::review::domain::{
    AssigneeId, Assignment, AssignmentId, AssignmentStatus, Criterion, EvaluationWindow,
    PortalRole, ProposalId, ProposalRef, ReviewStage, Rubric, ScoreScale,
};
use crate::workflows::review::gateway::{
    Acknowledgement, AssignmentQuery, DraftRequest, GatewayError, PortalGateway, RejectRequest,
    ScoringForm,
};
use crate::workflows::review::http::ServiceGateway;
use crate::workflows::review::portal::{
    portal_router, InMemoryPortalStore, PortalService, PortalStore, RubricCatalog,
};
use crate::workflows::review::service::ReviewWorkflow;

pub(super) const BASE: &str = "/api";

pub(super) fn open_window() -> EvaluationWindow {
    let now = Utc::now();
    EvaluationWindow::new(now - Duration::days(30), now + Duration::days(30)).expect("valid")
}

pub(super) fn closed_window() -> EvaluationWindow {
    let now = Utc::now();
    EvaluationWindow::new(now - Duration::days(60), now - Duration::days(30)).expect("valid")
}

pub(super) fn assigned_at() -> DateTime<Utc> {
    Utc::now() - Duration::days(3)
}

pub(super) fn assignment(id: &str, title: &str, stage: ReviewStage) -> Assignment {
    Assignment::pending(
        AssignmentId::new(id),
        ProposalRef {
            id: ProposalId::new(format!("P-{id}")),
            title: title.to_string(),
        },
        AssigneeId::new("rev-1"),
        stage,
        assigned_at(),
    )
    .with_window(open_window())
}

/// Rubric `[A w=2, B w=3]` on the 1/3/5/7 scale.
pub(super) fn two_criteria_catalog() -> RubricCatalog {
    let rubric = Rubric::new(
        ReviewStage::DESK_EVALUATION,
        vec![Criterion::new("A", "A", 2.0, 1), Criterion::new("B", "B", 3.0, 2)],
        ScoreScale::standard(),
    )
    .expect("valid rubric");
    RubricCatalog::new([rubric])
}

pub(super) fn seeded_store() -> Arc<InMemoryPortalStore> {
    let store = Arc::new(InMemoryPortalStore::new());
    let seeds = [
        assignment("1", "Keripik Tempe Organik", ReviewStage::DESK_EVALUATION),
        assignment("42", "Kopi Sachet Rempah", ReviewStage::DESK_EVALUATION),
        assignment("7", "Aplikasi Bank Sampah", ReviewStage::INTERVIEW),
    ];
    for seed in seeds {
        store
            .insert(PortalRole::Reviewer, seed)
            .expect("seed assignment");
    }

    let mut expired = assignment("99", "Sabun Herbal", ReviewStage::DESK_EVALUATION);
    expired.status = AssignmentStatus::Accepted;
    expired.window = Some(closed_window());
    store
        .insert(PortalRole::Reviewer, expired)
        .expect("seed expired");

    store
        .insert(
            PortalRole::Juri,
            assignment("1", "Tenun Ikat Daring", ReviewStage::INTERVIEW),
        )
        .expect("seed juri assignment");
    store
}

pub(super) fn build_router(
    store: Arc<InMemoryPortalStore>,
    catalog: RubricCatalog,
) -> (Router, Arc<PortalService<InMemoryPortalStore>>) {
    let service = Arc::new(PortalService::new(store, catalog));
    (portal_router(service.clone(), BASE), service)
}

pub(super) type LocalGateway = RecordingGateway<ServiceGateway<Router>>;

pub(super) struct Harness {
    pub(super) store: Arc<InMemoryPortalStore>,
    pub(super) gateway: Arc<LocalGateway>,
    pub(super) workflow: ReviewWorkflow<LocalGateway>,
}

pub(super) fn harness() -> Harness {
    harness_with(two_criteria_catalog())
}

pub(super) fn harness_with(catalog: RubricCatalog) -> Harness {
    let store = seeded_store();
    let (router, _) = build_router(store.clone(), catalog);
    let gateway = Arc::new(RecordingGateway::new(ServiceGateway::new(router, BASE)));
    let workflow = ReviewWorkflow::new(gateway.clone(), PortalRole::Reviewer);
    Harness {
        store,
        gateway,
        workflow,
    }
}

/// A mutation that reached the gateway.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Sent {
    Accept(AssignmentId),
    Reject(AssignmentId, RejectRequest),
    SaveDraft(AssignmentId, DraftRequest),
    Submit(AssignmentId),
}

pub(super) struct RecordingGateway<G> {
    inner: G,
    sent: Mutex<Vec<Sent>>,
}

impl<G> RecordingGateway<G> {
    pub(super) fn new(inner: G) -> Self {
        Self {
            inner,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("recording mutex poisoned").clone()
    }

    fn record(&self, call: Sent) {
        self.sent.lock().expect("recording mutex poisoned").push(call);
    }
}

#[async_trait]
impl<G: PortalGateway> PortalGateway for RecordingGateway<G> {
    async fn list_assignments(
        &self,
        role: PortalRole,
        query: &AssignmentQuery,
    ) -> Result<Vec<Assignment>, GatewayError> {
        self.inner.list_assignments(role, query).await
    }

    async fn assignment(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<Assignment, GatewayError> {
        self.inner.assignment(role, id).await
    }

    async fn accept(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<Acknowledgement, GatewayError> {
        self.record(Sent::Accept(id.clone()));
        self.inner.accept(role, id).await
    }

    async fn reject(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        request: &RejectRequest,
    ) -> Result<Acknowledgement, GatewayError> {
        self.record(Sent::Reject(id.clone(), request.clone()));
        self.inner.reject(role, id, request).await
    }

    async fn scoring_form(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<ScoringForm, GatewayError> {
        self.inner.scoring_form(role, id).await
    }

    async fn save_draft(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        request: &DraftRequest,
    ) -> Result<Acknowledgement, GatewayError> {
        self.record(Sent::SaveDraft(id.clone(), request.clone()));
        self.inner.save_draft(role, id, request).await
    }

    async fn submit(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<Acknowledgement, GatewayError> {
        self.record(Sent::Submit(id.clone()));
        self.inner.submit(role, id).await
    }
}

pub(super) fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub(super) fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub(super) async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}
