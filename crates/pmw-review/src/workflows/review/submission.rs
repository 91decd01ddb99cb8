use super::domain::{CriterionId, Rubric, ScoreEntry};
use super::scoring::index_entries;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("criterion '{criterion}' has not been scored")]
    MissingScore { criterion: String },
    #[error("criterion '{criterion}' has score {value}, expected one of {allowed}")]
    OutOfScale {
        criterion: String,
        value: u32,
        allowed: String,
    },
    #[error("score refers to unknown criterion {0}")]
    UnknownCriterion(CriterionId),
    #[error("a draft needs at least one score")]
    EmptyDraft,
}

impl ValidationError {
    /// Name of the criterion the error belongs to, when there is one.
    pub fn criterion(&self) -> Option<&str> {
        match self {
            Self::MissingScore { criterion } | Self::OutOfScale { criterion, .. } => {
                Some(criterion)
            }
            Self::UnknownCriterion(id) => Some(id.as_str()),
            Self::EmptyDraft => None,
        }
    }
}

/// Every criterion scored, every score in scale. Reports all failures.
pub fn validate_for_submit(
    rubric: &Rubric,
    entries: &[ScoreEntry],
) -> Result<(), Vec<ValidationError>> {
    let index = index_entries(entries);
    let mut errors = Vec::new();

    for entry in entries {
        if rubric.criterion(&entry.criterion).is_none() {
            errors.push(ValidationError::UnknownCriterion(entry.criterion.clone()));
        }
    }

    for criterion in rubric.criteria() {
        match index.get(&criterion.id).and_then(|entry| entry.score) {
            None => errors.push(ValidationError::MissingScore {
                criterion: criterion.name.clone(),
            }),
            Some(value) if !rubric.scale().contains(value) => {
                errors.push(ValidationError::OutOfScale {
                    criterion: criterion.name.clone(),
                    value,
                    allowed: rubric.scale().to_string(),
                })
            }
            Some(_) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Entries to persist for a draft save, in rubric order.
///
/// Unset entries are dropped; the first out-of-scale or unknown entry fails the
/// whole draft.
pub fn prepare_draft(
    rubric: &Rubric,
    entries: &[ScoreEntry],
) -> Result<Vec<ScoreEntry>, ValidationError> {
    for entry in entries {
        let criterion = rubric
            .criterion(&entry.criterion)
            .ok_or_else(|| ValidationError::UnknownCriterion(entry.criterion.clone()))?;
        if let Some(value) = entry.score {
            if !rubric.scale().contains(value) {
                return Err(ValidationError::OutOfScale {
                    criterion: criterion.name.clone(),
                    value,
                    allowed: rubric.scale().to_string(),
                });
            }
        }
    }

    let index = index_entries(entries);
    let draft: Vec<ScoreEntry> = rubric
        .criteria()
        .iter()
        .filter_map(|criterion| index.get(&criterion.id).copied())
        .filter(|entry| entry.score.is_some())
        .cloned()
        .collect();

    if draft.is_empty() {
        return Err(ValidationError::EmptyDraft);
    }

    Ok(draft)
}
