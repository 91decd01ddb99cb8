use crate::infra::{build_portal, demo_assignments, parse_role};
use chrono::Utc;
use clap::Args;
use pmw_review::config::AppConfig;
use pmw_review::error::AppError;
use pmw_review::workflows::review::portal::portal_router;
use pmw_review::workflows::review::{
    summarize, Assignment, AssignmentQuery, AssignmentStatus, PortalRole, ReviewWorkflow,
    ScoreBreakdown, ServiceGateway, SessionError, TransitionKind, WorkflowError,
};
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_REJECTION_NOTE: &str = "Bidang usaha di luar keahlian saya";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Role whose assignments are reviewed (overrides PORTAL_ROLE)
    #[arg(long, value_parser = parse_role)]
    pub(crate) role: Option<PortalRole>,
    /// Distribution CSV to seed the in-process portal instead of the built-in sample
    #[arg(long)]
    pub(crate) distribution_csv: Option<PathBuf>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let role = args.role.unwrap_or(config.portal.role);
    let distribution_csv = args.distribution_csv.or(config.portal.distribution_csv);
    let api_base = config.portal.api_base;

    let (portal, seeded) = build_portal(
        distribution_csv.as_deref(),
        demo_assignments(role, Utc::now()),
    )?;
    let gateway = ServiceGateway::new(portal_router(portal, &api_base), api_base.as_str());
    let workflow = ReviewWorkflow::new(Arc::new(gateway), role);

    println!("PMW review workflow demo ({} role)", role.label());
    println!("- {seeded} assignments distributed");

    let assignments = workflow
        .list_assignments(&AssignmentQuery::default())
        .await?;
    render_summary(&assignments);

    let mut pending = assignments
        .iter()
        .filter(|assignment| assignment.status == AssignmentStatus::Pending);
    let (Some(to_accept), to_reject) = (pending.next(), pending.next()) else {
        println!("No pending assignment to work on");
        return Ok(());
    };

    let prompt = workflow.request_transition(to_accept, &TransitionKind::Accept)?;
    println!("\n{}: {}", prompt.title, prompt.message);
    let accepted = workflow.accept(to_accept).await?;
    println!(
        "- {} -> {}",
        accepted.proposal.title,
        accepted.display_status().label()
    );

    if let Some(to_reject) = to_reject {
        let kind = TransitionKind::Reject {
            note: DEMO_REJECTION_NOTE.to_string(),
        };
        let prompt = workflow.request_transition(to_reject, &kind)?;
        println!("\n{}: {}", prompt.title, prompt.message);
        let rejected = workflow.reject(to_reject, DEMO_REJECTION_NOTE).await?;
        println!(
            "- {} -> {} ({})",
            rejected.proposal.title,
            rejected.display_status().label(),
            rejected.rejection_note.as_deref().unwrap_or_default()
        );
    }

    let mut session = workflow.open_scoring(&accepted).await?;
    let criteria = session.rubric().criteria().to_vec();
    let scale: Vec<u32> = session.rubric().scale().values().collect();
    println!(
        "\nScoring \"{}\" (tahap {}, scale {})",
        session.proposal().title,
        session.rubric().stage(),
        session.rubric().scale()
    );

    let Some((last, rest)) = criteria.split_last() else {
        println!("Rubric has no criteria");
        return Ok(());
    };
    for (index, criterion) in rest.iter().enumerate() {
        let score = scale[(index + 2) % scale.len()];
        session
            .set_score(&criterion.id, Some(score))
            .map_err(WorkflowError::from)?;
    }

    if let Err(SessionError::Incomplete(errors)) = session.request_submit() {
        println!("- Submit blocked:");
        for error in errors {
            println!("    {error}");
        }
    }
    let drafted = workflow.save_draft(&mut session).await?;
    println!(
        "- Draft saved: {} criteria scored, status {}",
        drafted.saved_scores,
        drafted.display_status().label()
    );

    let top = scale.last().copied();
    session
        .set_score(&last.id, top)
        .map_err(WorkflowError::from)?;
    let prompt = session.request_submit().map_err(WorkflowError::from)?;
    println!("\n{}: {}", prompt.title, prompt.message);
    let submitted = workflow.submit(&mut session).await?;
    println!("- Status: {}", submitted.display_status().label());
    render_breakdown(&session.breakdown());

    let assignments = workflow
        .list_assignments(&AssignmentQuery::default())
        .await?;
    println!();
    render_summary(&assignments);
    Ok(())
}

fn render_summary(assignments: &[Assignment]) {
    let summary = summarize(assignments);
    println!("Assignments: {}", summary.total);
    for (status, count) in &summary.by_status {
        if *count > 0 {
            println!("  - {}: {}", status.label(), count);
        }
    }
}

fn render_breakdown(breakdown: &ScoreBreakdown) {
    println!("Submitted scores:");
    for line in &breakdown.lines {
        println!(
            "  - {} (bobot {}): {} -> {:.1}",
            line.name,
            line.weight,
            line.raw
                .map(|value| value.to_string())
                .unwrap_or_else(|| "-".to_string()),
            line.weighted
        );
    }
    println!(
        "  Total {:.1} / {:.1}",
        breakdown.total, breakdown.max_total
    );
}
