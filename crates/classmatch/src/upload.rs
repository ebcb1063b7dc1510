//! Upload path: validate a submission, parse its calendar and store it.

use regex::Regex;
use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::info;

use crate::calendar::parse_ics;
use crate::db::{DbStudent, MatcherDb};
use crate::error::ServiceError;
use crate::matching::MatchStore;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const MIN_ICS_LEN: usize = 10;

const DUPLICATE_EMAIL: &str = "This email already exists. Updates are not supported yet.";

/// Year of study.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Year {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
}

impl FromStr for Year {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(Year::First),
            "second" => Ok(Year::Second),
            "third" => Ok(Year::Third),
            "fourth" => Ok(Year::Fourth),
            "fifth" => Ok(Year::Fifth),
            other => Err(ServiceError::validation(format!(
                "Invalid year '{other}', expected one of first, second, third, fourth, fifth"
            ))),
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Year::First => "first",
            Year::Second => "second",
            Year::Third => "third",
            Year::Fourth => "fourth",
            Year::Fifth => "fifth",
        };
        write!(f, "{s}")
    }
}

/// Body of `POST /upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub ics: String,
    pub campus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub student_id: String,
    pub courses: usize,
    pub events: usize,
}

/// Validates the submission, parses its calendar and stores the new student.
///
/// An email that is already registered is rejected with
/// [`ServiceError::Conflict`]; existing students are never updated.
pub fn upload_calendar(db: &MatcherDb, request: UploadRequest) -> Result<UploadSummary, ServiceError> {
    let year = validate(&request)?;
    let parsed = parse_ics(&request.ics)?;

    if db.student_id_by_email(&request.email)?.is_some() {
        return Err(ServiceError::Conflict {
            message: DUPLICATE_EMAIL.to_string(),
        });
    }

    let student = DbStudent {
        id: uuid::Uuid::new_v4().to_string(),
        name: request.name,
        email: request.email,
        year: year.to_string(),
        campus: request.campus.filter(|c| !c.trim().is_empty()),
    };

    db.insert_upload(&student, &request.ics, &parsed)
        .map_err(|e| match e.sqlite_error_code() {
            // Lost a race against another upload with the same email
            Some(ErrorCode::ConstraintViolation) => ServiceError::Conflict {
                message: DUPLICATE_EMAIL.to_string(),
            },
            _ => ServiceError::Dependency(e),
        })?;

    info!(
        "Stored student {} with {} courses and {} events",
        student.id,
        parsed.courses.len(),
        parsed.events.len()
    );

    Ok(UploadSummary {
        student_id: student.id,
        courses: parsed.courses.len(),
        events: parsed.events.len(),
    })
}

fn validate(request: &UploadRequest) -> Result<Year, ServiceError> {
    if request.name.is_empty() {
        return Err(ServiceError::validation("name is required"));
    }
    if !EMAIL_REGEX.is_match(&request.email) {
        return Err(ServiceError::validation("email must be a valid email address"));
    }
    let year = request.year.parse()?;
    if request.ics.chars().count() < MIN_ICS_LEN {
        return Err(ServiceError::validation("ics must contain a calendar"));
    }
    Ok(year)
}
