use std::fmt::Display;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use percent_encoding::{utf8_percent_encode, AsciiSet, PercentEncode, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower::{Service, ServiceExt};
use tracing::debug;

use super::domain::{Assignment, AssignmentId, PortalRole};
use super::gateway::{
    Acknowledgement, ApiEnvelope, AssignmentList, AssignmentQuery, DraftRequest, GatewayError,
    PortalGateway, RejectRequest, ScoringForm,
};

const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Everything outside the RFC 3986 unreserved set is escaped in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn segment(id: &AssignmentId) -> PercentEncode<'_> {
    utf8_percent_encode(id.as_str(), PATH_SEGMENT)
}

/// [`PortalGateway`] speaking JSON over any tower HTTP service.
///
/// An axum `Router` serving the portal API plugs in directly, as does an HTTP
/// client wrapped as a `Service`.
#[derive(Debug, Clone)]
pub struct ServiceGateway<S> {
    service: S,
    base: String,
    body_limit: usize,
}

impl<S> ServiceGateway<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Error: Display,
    S::Future: Send,
{
    pub fn new(service: S, base: impl Into<String>) -> Self {
        Self {
            service,
            base: base.into().trim_end_matches('/').to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    fn uri(&self, role: PortalRole, path: &str) -> String {
        format!("{}/{}/{}", self.base, role.path_segment(), path)
    }

    async fn exchange<T, B>(
        &self,
        method: Method,
        uri: String,
        body: Option<&B>,
    ) -> Result<ApiEnvelope<T>, GatewayError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync,
    {
        debug!(%method, %uri, "portal request");

        let mut builder = Request::builder()
            .method(method)
            .uri(uri.as_str())
            .header(header::ACCEPT, "application/json");
        let body = match body {
            Some(payload) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                let bytes = serde_json::to_vec(payload)
                    .map_err(|err| GatewayError::Transport(err.to_string()))?;
                Body::from(bytes)
            }
            None => Body::empty(),
        };
        let request = builder
            .body(body)
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let response = self
            .service
            .clone()
            .oneshot(request)
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), self.body_limit)
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        match serde_json::from_slice::<ApiEnvelope<T>>(&bytes) {
            Ok(envelope) if !envelope.success => Err(GatewayError::Rejected {
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("request to {uri} failed with status {status}")),
            }),
            Ok(envelope) if status.is_success() => Ok(envelope),
            Ok(_) => Err(GatewayError::Transport(format!(
                "{uri} answered with status {status}"
            ))),
            Err(err) if status.is_success() => Err(GatewayError::Decode(err.to_string())),
            Err(_) => Err(GatewayError::Transport(format!(
                "{uri} answered with status {status}"
            ))),
        }
    }

    async fn fetch<T: DeserializeOwned + Send>(&self, uri: String) -> Result<T, GatewayError> {
        self.exchange::<T, ()>(Method::GET, uri, None)
            .await?
            .data
            .ok_or(GatewayError::MissingData)
    }

    async fn mutate<B: Serialize + Sync>(
        &self,
        method: Method,
        uri: String,
        body: Option<&B>,
    ) -> Result<Acknowledgement, GatewayError> {
        let envelope = self
            .exchange::<serde_json::Value, B>(method, uri, body)
            .await?;
        Ok(Acknowledgement {
            message: envelope.message,
        })
    }
}

#[async_trait]
impl<S> PortalGateway for ServiceGateway<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Error: Display,
    S::Future: Send,
{
    async fn list_assignments(
        &self,
        role: PortalRole,
        query: &AssignmentQuery,
    ) -> Result<Vec<Assignment>, GatewayError> {
        let uri = format!("{}{}", self.uri(role, "penugasan"), query.to_query_string());
        let list: AssignmentList = self.fetch(uri).await?;
        Ok(list.penugasan)
    }

    async fn assignment(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<Assignment, GatewayError> {
        self.fetch(self.uri(role, &format!("penugasan/{}", segment(id)))).await
    }

    async fn accept(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<Acknowledgement, GatewayError> {
        let uri = self.uri(role, &format!("penugasan/{}/accept", segment(id)));
        self.mutate::<()>(Method::PATCH, uri, None).await
    }

    async fn reject(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        request: &RejectRequest,
    ) -> Result<Acknowledgement, GatewayError> {
        let uri = self.uri(role, &format!("penugasan/{}/reject", segment(id)));
        self.mutate(Method::PATCH, uri, Some(request)).await
    }

    async fn scoring_form(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<ScoringForm, GatewayError> {
        self.fetch(self.uri(role, &format!("penilaian/{}", segment(id)))).await
    }

    async fn save_draft(
        &self,
        role: PortalRole,
        id: &AssignmentId,
        request: &DraftRequest,
    ) -> Result<Acknowledgement, GatewayError> {
        let uri = self.uri(role, &format!("penilaian/{}", segment(id)));
        self.mutate(Method::POST, uri, Some(request)).await
    }

    async fn submit(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<Acknowledgement, GatewayError> {
        let uri = self.uri(role, &format!("penilaian/{}/submit", segment(id)));
        self.mutate::<()>(Method::POST, uri, None).await
    }
}
