/// Database row types for students, their courses and their calendar events
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStudent {
    pub id: String,
    pub name: String,
    pub email: String,
    pub year: String,
    pub campus: Option<String>,
}

/// The public part of a student, as shown in groups, matches and the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub year: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbEvent {
    pub event_id: i64,
    pub student_id: String,
    pub uid: String,
    pub summary: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub rrule: Option<String>,
    pub exdates: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbRateLimit {
    pub key: String,
    pub count: i64,
    pub window_start: DateTime<Utc>,
}
