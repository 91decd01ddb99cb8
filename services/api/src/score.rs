use crate::infra::parse_stage;
use clap::Args;
use pmw_review::error::AppError;
use pmw_review::workflows::review::portal::RubricCatalog;
use pmw_review::workflows::review::{
    score_breakdown, validate_for_submit, Criterion, DomainError, ReviewStage, Rubric,
    ScoreBreakdown, ScoreEntry, ScoreScale, ValidationError, WorkflowError,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON sheet: {"tahap": 1, "nilai": [{"id_kriteria": .., "skor": ..}]}
    #[arg(long)]
    pub(crate) sheet: PathBuf,
    /// Override the stage named in the sheet
    #[arg(long, value_parser = parse_stage)]
    pub(crate) stage: Option<ReviewStage>,
    /// Print the breakdown as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

/// Offline scoring input. Custom criteria replace the standard stage rubric.
#[derive(Debug, Deserialize)]
pub(crate) struct ScoreSheet {
    pub(crate) tahap: ReviewStage,
    #[serde(default)]
    pub(crate) kriteria: Option<Vec<Criterion>>,
    #[serde(default)]
    pub(crate) skala_skor: Option<ScoreScale>,
    #[serde(default)]
    pub(crate) nilai: Vec<ScoreEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreReport {
    pub(crate) tahap: ReviewStage,
    pub(crate) breakdown: ScoreBreakdown,
    pub(crate) submittable: bool,
    pub(crate) problems: Vec<String>,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.sheet)?;
    let mut sheet: ScoreSheet = serde_json::from_str(&raw)?;
    if let Some(stage) = args.stage {
        sheet.tahap = stage;
    }

    let report = score_sheet(sheet).map_err(WorkflowError::from)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render_report(&report);
    }
    Ok(())
}

pub(crate) fn score_sheet(sheet: ScoreSheet) -> Result<ScoreReport, DomainError> {
    let ScoreSheet {
        tahap,
        kriteria,
        skala_skor,
        nilai,
    } = sheet;

    let rubric = match kriteria {
        Some(criteria) => Rubric::new(
            tahap,
            criteria,
            skala_skor.unwrap_or_else(ScoreScale::standard),
        )?,
        None => RubricCatalog::standard()?
            .rubric(tahap)
            .cloned()
            .ok_or(DomainError::EmptyRubric(tahap))?,
    };

    let breakdown = score_breakdown(&rubric, &nilai);
    let problems: Vec<String> = match validate_for_submit(&rubric, &nilai) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(ValidationError::to_string).collect(),
    };

    Ok(ScoreReport {
        tahap,
        breakdown,
        submittable: problems.is_empty(),
        problems,
    })
}

fn render_report(report: &ScoreReport) {
    println!("Tahap {} ({})", report.tahap, report.tahap.label());
    for line in &report.breakdown.lines {
        let raw = line
            .raw
            .map(|value| value.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<28} bobot {:>4} skor {:>2} -> {:>5.1}",
            line.name, line.weight, raw, line.weighted
        );
    }
    println!(
        "Total {:.1} / {:.1} ({} of {} scored)",
        report.breakdown.total,
        report.breakdown.max_total,
        report.breakdown.scored,
        report.breakdown.lines.len()
    );
    if report.submittable {
        println!("Sheet is complete and can be submitted");
    } else {
        println!("Sheet cannot be submitted yet:");
        for problem in &report.problems {
            println!("  - {problem}");
        }
    }
}
