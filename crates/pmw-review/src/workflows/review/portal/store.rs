use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::workflows::review::domain::{
    Assignment, AssignmentId, AssignmentStatus, PortalRole, ReviewRecord,
};

/// Storage behind the reference portal.
///
/// Assignments are partitioned by role: a reviewer never sees a juri's
/// assignment under the same identifier.
pub trait PortalStore: Send + Sync {
    fn insert(&self, role: PortalRole, assignment: Assignment) -> Result<Assignment, StoreError>;
    fn fetch(&self, role: PortalRole, id: &AssignmentId) -> Result<Option<Assignment>, StoreError>;
    fn list(&self, role: PortalRole) -> Result<Vec<Assignment>, StoreError>;
    /// Replaces the assignment only while its stored status is still `expected`.
    fn update(
        &self,
        role: PortalRole,
        assignment: Assignment,
        expected: AssignmentStatus,
    ) -> Result<(), StoreError>;
    fn review(&self, role: PortalRole, id: &AssignmentId)
        -> Result<Option<ReviewRecord>, StoreError>;
    /// Stores a review record. A submitted record is never replaced.
    fn save_review(&self, role: PortalRole, record: ReviewRecord) -> Result<(), StoreError>;
    /// Writes the assignment and its review record together, provided the
    /// assignment status is still `expected` and the stored review is not
    /// submitted.
    fn commit_review(
        &self,
        role: PortalRole,
        assignment: Assignment,
        expected: AssignmentStatus,
        record: ReviewRecord,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record conflicts with its stored state")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

type Key = (PortalRole, AssignmentId);

#[derive(Debug, Default)]
struct Tables {
    assignments: HashMap<Key, Assignment>,
    order: Vec<Key>,
    reviews: HashMap<Key, ReviewRecord>,
}

/// Process-local store; list order follows insertion order.
#[derive(Debug, Default)]
pub struct InMemoryPortalStore {
    tables: Mutex<Tables>,
}

impl InMemoryPortalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("portal store mutex poisoned".to_string()))
    }
}

impl PortalStore for InMemoryPortalStore {
    fn insert(&self, role: PortalRole, assignment: Assignment) -> Result<Assignment, StoreError> {
        let mut tables = self.lock()?;
        let key = (role, assignment.id.clone());
        if tables.assignments.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        tables.order.push(key.clone());
        tables.assignments.insert(key, assignment.clone());
        Ok(assignment)
    }

    fn fetch(&self, role: PortalRole, id: &AssignmentId) -> Result<Option<Assignment>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.assignments.get(&(role, id.clone())).cloned())
    }

    fn list(&self, role: PortalRole) -> Result<Vec<Assignment>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .order
            .iter()
            .filter(|(owner, _)| *owner == role)
            .filter_map(|key| tables.assignments.get(key).cloned())
            .collect())
    }

    fn update(
        &self,
        role: PortalRole,
        assignment: Assignment,
        expected: AssignmentStatus,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let key = (role, assignment.id.clone());
        match tables.assignments.get_mut(&key) {
            None => Err(StoreError::NotFound),
            Some(current) if current.status != expected => Err(StoreError::Conflict),
            Some(current) => {
                *current = assignment;
                Ok(())
            }
        }
    }

    fn review(
        &self,
        role: PortalRole,
        id: &AssignmentId,
    ) -> Result<Option<ReviewRecord>, StoreError> {
        let tables = self.lock()?;
        Ok(tables.reviews.get(&(role, id.clone())).cloned())
    }

    fn save_review(&self, role: PortalRole, record: ReviewRecord) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let key = (role, record.assignment_id.clone());
        if !tables.assignments.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        tables.replace_review(key, record)
    }

    fn commit_review(
        &self,
        role: PortalRole,
        assignment: Assignment,
        expected: AssignmentStatus,
        record: ReviewRecord,
    ) -> Result<(), StoreError> {
        if record.assignment_id != assignment.id {
            return Err(StoreError::Conflict);
        }
        let mut tables = self.lock()?;
        let key = (role, assignment.id.clone());
        match tables.assignments.get(&key) {
            None => return Err(StoreError::NotFound),
            Some(current) if current.status != expected => return Err(StoreError::Conflict),
            Some(_) => {}
        }
        tables.replace_review(key.clone(), record)?;
        tables.assignments.insert(key, assignment);
        Ok(())
    }
}

impl Tables {
    fn replace_review(&mut self, key: Key, record: ReviewRecord) -> Result<(), StoreError> {
        if self
            .reviews
            .get(&key)
            .is_some_and(|stored| stored.is_submitted())
        {
            return Err(StoreError::Conflict);
        }
        self.reviews.insert(key, record);
        Ok(())
    }
}
