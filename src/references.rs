//! Student to course linkage by course name.

use crate::config::CoursePolicy;
use crate::model::{COURSES, STUDENTS};
use crate::store::{DocumentStore, StoreError};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("no course named {0:?}")]
    Dangling(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingStudent {
    pub id: String,
    pub name: String,
    pub course: String,
}

fn course_names(store: &dyn DocumentStore) -> Result<HashSet<String>, StoreError> {
    Ok(store
        .read_all(COURSES)?
        .iter()
        .filter_map(|c| c.get_str("name"))
        .map(|n| n.trim().to_string())
        .collect())
}

/// Under `Enforce`, fails unless some course carries `course_name`.
pub fn check_course(
    store: &dyn DocumentStore,
    course_name: &str,
    policy: CoursePolicy,
) -> Result<(), ReferenceError> {
    if policy == CoursePolicy::Tolerate {
        return Ok(());
    }
    if course_names(store)?.contains(course_name.trim()) {
        Ok(())
    } else {
        Err(ReferenceError::Dangling(course_name.to_string()))
    }
}

/// Students whose course name matches no course.
pub fn dangling_students(store: &dyn DocumentStore) -> Result<Vec<DanglingStudent>, StoreError> {
    let names = course_names(store)?;
    Ok(store
        .read_all(STUDENTS)?
        .into_iter()
        .filter_map(|s| {
            let course = s.get_str("course").unwrap_or("").trim().to_string();
            if names.contains(&course) {
                return None;
            }
            Some(DanglingStudent {
                name: s.get_str("name").unwrap_or("").to_string(),
                id: s.id,
                course,
            })
        })
        .collect())
}
