use chrono::{DateTime, Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use pmw_review::error::AppError;
use pmw_review::workflows::distribution::{DistributedAssignment, DistributionImporter};
use pmw_review::workflows::review::portal::{InMemoryPortalStore, PortalService, RubricCatalog};
use pmw_review::workflows::review::{
    AssigneeId, Assignment, AssignmentId, EvaluationWindow, PortalRole, ProposalId, ProposalRef,
    ReviewStage, WorkflowError,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type LocalPortal = PortalService<InMemoryPortalStore>;

/// Portal service over a fresh in-memory store, seeded from the CSV when given.
pub(crate) fn build_portal(
    distribution_csv: Option<&Path>,
    fallback: Vec<DistributedAssignment>,
) -> Result<(Arc<LocalPortal>, usize), AppError> {
    let store = Arc::new(InMemoryPortalStore::new());
    let seeds = match distribution_csv {
        Some(path) => DistributionImporter::from_path(path)?,
        None => fallback,
    };
    let seeded = DistributionImporter::seed(store.as_ref(), seeds)?;
    let catalog = RubricCatalog::standard().map_err(WorkflowError::from)?;
    Ok((Arc::new(PortalService::new(store, catalog)), seeded))
}

/// Three desk-evaluation assignments for one reviewer, with an open window.
pub(crate) fn demo_assignments(role: PortalRole, now: DateTime<Utc>) -> Vec<DistributedAssignment> {
    let window = EvaluationWindow::new(now - Duration::days(7), now + Duration::days(14)).ok();
    [
        ("101", "P-2025-014", "Keripik Tempe Organik"),
        ("102", "P-2025-027", "Aplikasi Bank Sampah Kampus"),
        ("103", "P-2025-031", "Kopi Sachet Rempah Nusantara"),
    ]
    .into_iter()
    .map(|(id, proposal, title)| {
        let mut assignment = Assignment::pending(
            AssignmentId::new(id),
            ProposalRef {
                id: ProposalId::new(proposal),
                title: title.to_string(),
            },
            AssigneeId::new("reviewer-demo"),
            ReviewStage::DESK_EVALUATION,
            now - Duration::days(2),
        );
        assignment.window = window;
        DistributedAssignment { role, assignment }
    })
    .collect()
}

pub(crate) fn parse_role(raw: &str) -> Result<PortalRole, String> {
    raw.parse::<PortalRole>().map_err(|err| err.to_string())
}

pub(crate) fn parse_stage(raw: &str) -> Result<ReviewStage, String> {
    let ordinal: u8 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a stage number"))?;
    ReviewStage::try_from(ordinal).map_err(|err| err.to_string())
}
