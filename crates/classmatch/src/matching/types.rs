/// Types produced by the matching engine
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::db::{DbEvent, StudentSummary};
use crate::error::ServiceError;

/// How two students are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Shared course catalogue codes
    #[default]
    Courses,
    /// Shared exact meeting times for a shared course
    Classes,
}

impl FromStr for MatchMode {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "courses" => Ok(MatchMode::Courses),
            "classes" => Ok(MatchMode::Classes),
            other => Err(ServiceError::validation(format!(
                "Invalid mode '{other}', expected 'courses' or 'classes'"
            ))),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Courses => write!(f, "courses"),
            MatchMode::Classes => write!(f, "classes"),
        }
    }
}

/// Identifies the subject of a match query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentRef {
    Id(String),
    Email(String),
}

/// Students sitting in the same physical class section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassGroup {
    pub course_code: String,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub size: usize,
    pub students: Vec<StudentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub student: StudentSummary,
    #[serde(rename = "sharedCourses")]
    pub shared_courses: Vec<String>,
}

/// The fields of an event shown when comparing two schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub summary: String,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&DbEvent> for EventSummary {
    fn from(e: &DbEvent) -> Self {
        Self {
            summary: e.summary.clone(),
            location: e.location.clone(),
            start_time: e.start_time,
            end_time: e.end_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseDetail {
    pub course_code: String,
    #[serde(rename = "myEvents")]
    pub my_events: Vec<EventSummary>,
    #[serde(rename = "otherEvents")]
    pub other_events: Vec<EventSummary>,
}
