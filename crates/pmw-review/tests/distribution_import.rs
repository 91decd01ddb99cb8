use std::sync::Arc;

use pmw_review::workflows::distribution::{DistributionError, DistributionImporter};
use pmw_review::workflows::review::portal::{
    portal_router, InMemoryPortalStore, PortalService, RubricCatalog,
};
use pmw_review::workflows::review::{
    AssignmentQuery, AssignmentStatus, PortalRole, ReviewStage, ReviewWorkflow, ServiceGateway,
};

#[test]
fn importer_reads_the_bundled_distribution_export() {
    let data = include_bytes!("../distribusi_pmw_2025.csv");
    let imported = DistributionImporter::from_reader(&data[..]).expect("export imports");

    assert_eq!(imported.len(), 7);
    assert!(imported
        .iter()
        .all(|entry| entry.assignment.status == AssignmentStatus::Pending));

    let judges: Vec<_> = imported
        .iter()
        .filter(|entry| entry.role == PortalRole::Juri)
        .collect();
    assert_eq!(judges.len(), 3);
    assert!(judges
        .iter()
        .all(|entry| entry.assignment.stage == ReviewStage::INTERVIEW));
    assert!(judges[2].assignment.window.is_none());
}

#[test]
fn importer_stops_at_the_first_bad_row() {
    let csv = "id_distribusi,id_proposal,judul,id_penilai,role,tahap,tanggal_penugasan,periode_mulai,periode_selesai\n\
1,PMW-1,Keripik,rev-1,reviewer,1,2025-03-01,,\n\
2,,Kopi,rev-1,reviewer,1,2025-03-01,,\n";

    let error = DistributionImporter::from_reader(csv.as_bytes()).expect_err("missing proposal");
    match error {
        DistributionError::Row { line, message } => {
            assert_eq!(line, 3);
            assert_eq!(message, "id_proposal is required");
        }
        other => panic!("expected row error, got {other:?}"),
    }
}

#[tokio::test]
async fn seeded_assignments_are_served_per_role() {
    let data = include_bytes!("../distribusi_pmw_2025.csv");
    let imported = DistributionImporter::from_reader(&data[..]).expect("export imports");

    let store = Arc::new(InMemoryPortalStore::new());
    let stored = DistributionImporter::seed(store.as_ref(), imported).expect("seed");
    assert_eq!(stored, 7);

    let service = Arc::new(PortalService::new(
        store,
        RubricCatalog::standard().expect("standard rubrics"),
    ));
    let gateway = Arc::new(ServiceGateway::new(portal_router(service, "/api"), "/api"));

    let reviewer = ReviewWorkflow::new(gateway.clone(), PortalRole::Reviewer);
    let listed = reviewer
        .list_assignments(&AssignmentQuery::default())
        .await
        .expect("reviewer list");
    let ids: Vec<&str> = listed.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["301", "302", "303", "304"]);

    let judge = ReviewWorkflow::new(gateway, PortalRole::Juri);
    let interviews = judge
        .list_assignments(&AssignmentQuery {
            stage: Some(ReviewStage::INTERVIEW),
            status: Some(AssignmentStatus::Pending),
        })
        .await
        .expect("judge list");
    assert_eq!(interviews.len(), 3);
    assert_eq!(interviews[0].proposal.title, "Keripik Tempe Organik Rasa Rempah");
}
