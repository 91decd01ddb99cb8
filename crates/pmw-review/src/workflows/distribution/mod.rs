//! Seeding of assignments from a distribution export.
//!
//! Assignments are created by the distribution process outside the review
//! portal; every imported row starts out Pending.

mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::workflows::review::domain::{
    AssigneeId, Assignment, AssignmentId, DomainError, EvaluationWindow, PortalRole, ProposalId,
    ProposalRef, ReviewStage,
};
use crate::workflows::review::portal::{PortalStore, StoreError};

use parser::{parse_timestamp, parse_window_end, DistributionRecord};

/// An imported assignment together with the role it was distributed to.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributedAssignment {
    pub role: PortalRole,
    pub assignment: Assignment,
}

#[derive(Debug)]
pub enum DistributionError {
    Io(std::io::Error),
    Csv(csv::Error),
    Row { line: usize, message: String },
    Duplicate { line: usize, id: AssignmentId },
    Store(StoreError),
}

impl std::fmt::Display for DistributionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionError::Io(err) => write!(f, "failed to read distribution export: {}", err),
            DistributionError::Csv(err) => write!(f, "invalid distribution CSV data: {}", err),
            DistributionError::Row { line, message } => {
                write!(f, "distribution row {}: {}", line, message)
            }
            DistributionError::Duplicate { line, id } => write!(
                f,
                "distribution row {}: assignment {} is listed twice for the same role",
                line, id
            ),
            DistributionError::Store(err) => {
                write!(f, "could not store distributed assignments: {}", err)
            }
        }
    }
}

impl std::error::Error for DistributionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DistributionError::Io(err) => Some(err),
            DistributionError::Csv(err) => Some(err),
            DistributionError::Store(err) => Some(err),
            DistributionError::Row { .. } | DistributionError::Duplicate { .. } => None,
        }
    }
}

impl From<std::io::Error> for DistributionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for DistributionError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<StoreError> for DistributionError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

pub struct DistributionImporter;

impl DistributionImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<DistributedAssignment>, DistributionError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parses every row; the first invalid row aborts the import.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<DistributedAssignment>, DistributionError> {
        let mut seen = HashSet::new();
        let mut imported = Vec::new();

        for record in parser::parse_records(reader)? {
            let line = record.line;
            let distributed = convert(record)?;
            if !seen.insert((distributed.role, distributed.assignment.id.clone())) {
                return Err(DistributionError::Duplicate {
                    line,
                    id: distributed.assignment.id,
                });
            }
            imported.push(distributed);
        }

        Ok(imported)
    }

    /// Inserts the imported assignments, returning how many were stored.
    pub fn seed<S: PortalStore + ?Sized>(
        store: &S,
        assignments: Vec<DistributedAssignment>,
    ) -> Result<usize, DistributionError> {
        let mut stored = 0;
        for DistributedAssignment { role, assignment } in assignments {
            store.insert(role, assignment)?;
            stored += 1;
        }
        Ok(stored)
    }
}

fn convert(record: DistributionRecord) -> Result<DistributedAssignment, DistributionError> {
    let DistributionRecord { line, row } = record;
    let invalid = |message: String| DistributionError::Row { line, message };

    let id = required("id_distribusi", &row.id_distribusi).map_err(&invalid)?;
    let proposal = required("id_proposal", &row.id_proposal).map_err(&invalid)?;
    let assignee = required("id_penilai", &row.id_penilai).map_err(&invalid)?;

    let role: PortalRole = row
        .role
        .parse()
        .map_err(|err: DomainError| invalid(err.to_string()))?;

    let ordinal: u8 = row
        .tahap
        .trim()
        .parse()
        .map_err(|_| invalid(format!("invalid tahap '{}'", row.tahap)))?;
    let stage = ReviewStage::try_from(ordinal).map_err(|err| invalid(err.to_string()))?;

    let assigned_at = parse_timestamp(&row.tanggal_penugasan).ok_or_else(|| {
        invalid(format!(
            "invalid tanggal_penugasan '{}'",
            row.tanggal_penugasan
        ))
    })?;

    let window = match (row.periode_mulai.as_deref(), row.periode_selesai.as_deref()) {
        (None, None) => None,
        (Some(start), Some(end)) => {
            let start = parse_timestamp(start)
                .ok_or_else(|| invalid(format!("invalid periode_mulai '{start}'")))?;
            let end = parse_window_end(end)
                .ok_or_else(|| invalid(format!("invalid periode_selesai '{end}'")))?;
            Some(EvaluationWindow::new(start, end).map_err(|err| invalid(err.to_string()))?)
        }
        _ => {
            return Err(invalid(
                "periode_mulai and periode_selesai must be given together".to_string(),
            ))
        }
    };

    let mut assignment = Assignment::pending(
        AssignmentId::new(id),
        ProposalRef {
            id: ProposalId::new(proposal),
            title: row.judul,
        },
        AssigneeId::new(assignee),
        stage,
        assigned_at,
    );
    assignment.window = window;

    Ok(DistributedAssignment { role, assignment })
}

fn required(column: &str, value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{column} is required"))
    } else {
        Ok(trimmed.to_string())
    }
}
