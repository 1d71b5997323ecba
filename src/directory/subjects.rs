//! Subject catalog lookups

use crate::error::Result;
use crate::types::{Subject, SubjectId};
use async_trait::async_trait;
use std::collections::HashMap;

/// Trait for resolving subject ids against the quiz catalog
#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    /// Look up a subject; `Ok(None)` means the id is unknown
    async fn get_subject(&self, subject_id: &str) -> Result<Option<Subject>>;
}

/// Fixed in-memory catalog
///
/// Used in tests and in deployments where the catalog is small enough to
/// load at startup.
#[derive(Debug, Default)]
pub struct StaticSubjectDirectory {
    subjects: HashMap<SubjectId, Subject>,
}

impl StaticSubjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, id: &str, name: &str) -> Self {
        self.subjects.insert(
            id.to_string(),
            Subject {
                id: id.to_string(),
                name: name.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl SubjectDirectory for StaticSubjectDirectory {
    async fn get_subject(&self, subject_id: &str) -> Result<Option<Subject>> {
        Ok(self.subjects.get(subject_id).cloned())
    }
}
