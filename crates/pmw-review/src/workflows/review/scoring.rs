use std::collections::HashMap;

use serde::Serialize;

use super::domain::{Criterion, CriterionId, Rubric, ScoreEntry, ScoreScale};

/// `weight × raw` for an in-scale score, `0` when the score is unset.
///
/// Out-of-scale scores never contribute; the submission gate reports them.
pub fn compute_weighted_score(
    criterion: &Criterion,
    entry: Option<&ScoreEntry>,
    scale: &ScoreScale,
) -> f64 {
    match entry.and_then(|entry| entry.score) {
        Some(raw) if scale.contains(raw) => criterion.weight * f64::from(raw),
        _ => 0.0,
    }
}

/// Sum of weighted scores over the criteria, in rubric order ("TOTAL NILAI").
pub fn compute_total(criteria: &[Criterion], entries: &[ScoreEntry], scale: &ScoreScale) -> f64 {
    let index = index_entries(entries);
    criteria
        .iter()
        .map(|criterion| {
            compute_weighted_score(criterion, index.get(&criterion.id).copied(), scale)
        })
        .sum()
}

/// Later entries for the same criterion replace earlier ones.
pub(crate) fn index_entries(entries: &[ScoreEntry]) -> HashMap<&CriterionId, &ScoreEntry> {
    entries.iter().map(|entry| (&entry.criterion, entry)).collect()
}

/// Per-criterion contribution shown next to each scoring row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreLine {
    pub criterion_id: CriterionId,
    pub name: String,
    pub weight: f64,
    pub raw: Option<u32>,
    pub weighted: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub lines: Vec<ScoreLine>,
    pub total: f64,
    pub max_total: f64,
    pub scored: usize,
}

impl ScoreBreakdown {
    pub fn is_complete(&self) -> bool {
        self.scored == self.lines.len()
    }
}

pub fn score_breakdown(rubric: &Rubric, entries: &[ScoreEntry]) -> ScoreBreakdown {
    let index = index_entries(entries);
    let scale = rubric.scale();

    let lines: Vec<ScoreLine> = rubric
        .criteria()
        .iter()
        .map(|criterion| {
            let entry = index.get(&criterion.id).copied();
            ScoreLine {
                criterion_id: criterion.id.clone(),
                name: criterion.name.clone(),
                weight: criterion.weight,
                raw: entry.and_then(|entry| entry.score),
                weighted: compute_weighted_score(criterion, entry, scale),
            }
        })
        .collect();

    let total = lines.iter().map(|line| line.weighted).sum();
    let scored = lines.iter().filter(|line| line.raw.is_some()).count();

    ScoreBreakdown {
        lines,
        total,
        max_total: rubric.max_total(),
        scored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::review::domain::ReviewStage;

    fn criteria() -> Vec<Criterion> {
        vec![Criterion::new("A", "A", 2.0, 1), Criterion::new("B", "B", 3.0, 2)]
    }

    #[test]
    fn empty_entries_total_zero() {
        let scale = ScoreScale::standard();
        assert_eq!(compute_total(&criteria(), &[], &scale), 0.0);
        assert_eq!(compute_total(&[], &[], &scale), 0.0);
    }

    #[test]
    fn weighted_score_is_weight_times_raw() {
        let scale = ScoreScale::standard();
        let criterion = Criterion::new("inovasi", "Inovasi", 2.5, 1);
        for raw in scale.values() {
            let entry = ScoreEntry::scored("inovasi", raw);
            assert_eq!(
                compute_weighted_score(&criterion, Some(&entry), &scale),
                2.5 * f64::from(raw)
            );
        }
        let unset = ScoreEntry::unset("inovasi");
        assert_eq!(compute_weighted_score(&criterion, Some(&unset), &scale), 0.0);
        assert_eq!(compute_weighted_score(&criterion, None, &scale), 0.0);
    }

    #[test]
    fn total_matches_scenario_and_is_order_independent() {
        let scale = ScoreScale::standard();
        let entries = vec![ScoreEntry::scored("A", 5), ScoreEntry::scored("B", 3)];
        assert_eq!(compute_total(&criteria(), &entries, &scale), 19.0);

        let mut reversed = criteria();
        reversed.reverse();
        let mut entries_reversed = entries.clone();
        entries_reversed.reverse();
        assert_eq!(compute_total(&reversed, &entries_reversed, &scale), 19.0);
    }

    #[test]
    fn out_of_scale_scores_contribute_nothing() {
        let scale = ScoreScale::standard();
        let entries = vec![ScoreEntry::scored("A", 4), ScoreEntry::scored("B", 7)];
        assert_eq!(compute_total(&criteria(), &entries, &scale), 21.0);
    }

    #[test]
    fn breakdown_lists_every_criterion_in_rubric_order() {
        let rubric = Rubric::new(
            ReviewStage::DESK_EVALUATION,
            vec![Criterion::new("B", "B", 3.0, 2), Criterion::new("A", "A", 2.0, 1)],
            ScoreScale::standard(),
        )
        .expect("valid rubric");

        let breakdown = score_breakdown(&rubric, &[ScoreEntry::scored("A", 5)]);
        let names: Vec<&str> = breakdown.lines.iter().map(|line| line.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(breakdown.total, 10.0);
        assert_eq!(breakdown.max_total, 35.0);
        assert_eq!(breakdown.scored, 1);
        assert!(!breakdown.is_complete());
        assert_eq!(breakdown.lines[1].raw, None);
    }
}
