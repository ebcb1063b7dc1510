//! Matching engine: class grouping, peer matching and shared-course detail.
//!
//! Everything here is a pure function of what the store returns. Course codes
//! are derived from event summaries at query time rather than stored per event.

mod classes;
mod detail;
mod peers;
mod types;

pub use classes::{group_classes, DEFAULT_MIN_GROUP_SIZE};
pub use detail::resolve_shared_detail;
pub use peers::find_matches;
pub use types::*;

use regex::Regex;
use std::sync::LazyLock;

use crate::db::{DbEvent, StudentSummary};
use crate::error::ServiceError;

static COURSE_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{3}\d{3}[HY]\d\b").unwrap());

/// Read access the matching engine needs from the persistence store.
pub trait MatchStore {
    fn student_id_by_email(&self, email: &str) -> rusqlite::Result<Option<String>>;

    fn student_exists(&self, student_id: &str) -> rusqlite::Result<bool>;

    fn course_codes_for_student(&self, student_id: &str) -> rusqlite::Result<Vec<String>>;

    /// Every (student, course code) pair for students other than `student_id`
    /// enrolled in one of `course_codes`.
    fn students_sharing_courses(
        &self,
        student_id: &str,
        course_codes: &[String],
    ) -> rusqlite::Result<Vec<(StudentSummary, String)>>;

    fn events_for_student(&self, student_id: &str) -> rusqlite::Result<Vec<DbEvent>>;

    /// All events joined with the student owning them.
    fn events_with_students(&self) -> rusqlite::Result<Vec<(DbEvent, StudentSummary)>>;
}

/// Extracts the course code (e.g. `CSC108H5`) embedded in an event summary.
pub fn extract_course_code(summary: &str) -> Option<&str> {
    COURSE_CODE_REGEX.find(summary).map(|m| m.as_str())
}

/// Resolves a student reference to a stored student id.
pub fn resolve_student<S>(store: &S, student: &StudentRef) -> Result<String, ServiceError>
where
    S: MatchStore + ?Sized,
{
    match student {
        StudentRef::Id(id) => {
            if store.student_exists(id)? {
                Ok(id.clone())
            } else {
                Err(ServiceError::not_found(format!("No student with id {id}")))
            }
        }
        StudentRef::Email(email) => resolve_email(store, email),
    }
}

pub(crate) fn resolve_email<S>(store: &S, email: &str) -> Result<String, ServiceError>
where
    S: MatchStore + ?Sized,
{
    store
        .student_id_by_email(email)?
        .ok_or_else(|| ServiceError::not_found(format!("No student with email {email}")))
}
