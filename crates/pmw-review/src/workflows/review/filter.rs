use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Assignment, AssignmentStatus, ReviewStage};

/// Search and filter inputs of an assignment list view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: Option<AssignmentStatus>,
    #[serde(default)]
    pub stage: Option<ReviewStage>,
}

impl AssignmentFilter {
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn status(mut self, status: AssignmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn stage(mut self, stage: ReviewStage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn matches(&self, assignment: &Assignment) -> bool {
        if let Some(status) = self.status {
            if assignment.display_status() != status && assignment.status != status {
                return false;
            }
        }

        if let Some(stage) = self.stage {
            if assignment.stage != stage {
                return false;
            }
        }

        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        [
            assignment.proposal.title.as_str(),
            assignment.proposal.id.as_str(),
            assignment.id.as_str(),
        ]
        .iter()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
    }
}

/// Pure filter over a fetched snapshot; keeps the input order.
pub fn filter_assignments(list: &[Assignment], filter: &AssignmentFilter) -> Vec<Assignment> {
    list.iter()
        .filter(|assignment| filter.matches(assignment))
        .cloned()
        .collect()
}

/// Dashboard counters per displayed status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentSummary {
    pub total: usize,
    pub by_status: BTreeMap<AssignmentStatus, usize>,
}

impl AssignmentSummary {
    pub fn count(&self, status: AssignmentStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

pub fn summarize(list: &[Assignment]) -> AssignmentSummary {
    let mut summary = AssignmentSummary {
        total: list.len(),
        by_status: AssignmentStatus::ordered()
            .into_iter()
            .map(|status| (status, 0))
            .collect(),
    };

    for assignment in list {
        *summary
            .by_status
            .entry(assignment.display_status())
            .or_default() += 1;
    }

    summary
}
