/// Database module for students, their enrolled courses and calendar events

mod types;

pub use types::{DbEvent, DbRateLimit, DbStudent, StudentSummary};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Result, Row, Transaction};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::calendar::{CalendarParseResult, ParsedEvent};
use crate::matching::MatchStore;

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_matcher.sql");

const EVENT_COLUMNS: &str = "e.event_id, e.student_id, e.uid, e.summary, e.location, e.description,
     e.start_time, e.end_time, e.rrule, e.exdates";

pub struct MatcherDb {
    db: Mutex<Connection>,
}

impl MatcherDb {
    /// Opens (or creates) the database at `db_path` and initializes the schema
    pub fn open(db_path: &str) -> Result<Self> {
        Self::init(Connection::open(db_path)?)
    }

    /// Opens a private in-memory database, used by tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    // A panic while holding the lock leaves the connection itself usable.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a newly uploaded student together with their raw calendar, their
    /// courses and their events, all in one transaction.
    pub fn insert_upload(
        &self,
        student: &DbStudent,
        raw_ics: &str,
        parsed: &CalendarParseResult,
    ) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        let now = Utc::now();

        tx.execute(
            "INSERT INTO students (id, name, email, year, campus, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                &student.id,
                &student.name,
                &student.email,
                &student.year,
                &student.campus,
                now,
            ),
        )?;

        tx.execute(
            "INSERT INTO calendars (student_id, raw_ics, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(student_id) DO UPDATE SET raw_ics = excluded.raw_ics,
                                                   created_at = excluded.created_at",
            (&student.id, raw_ics, now),
        )?;

        for course in &parsed.courses {
            tx.execute(
                "INSERT INTO student_courses (student_id, course_code, section)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(student_id, course_code) DO UPDATE SET section = excluded.section",
                (&student.id, &course.course_code, &course.section),
            )?;
        }

        replace_events(&tx, &student.id, &parsed.events)?;

        tx.commit()
    }

    /// Lists students ordered by name, optionally filtered by a case-insensitive
    /// substring of their name or email
    pub fn list_students(&self, query: Option<&str>) -> Result<Vec<StudentSummary>> {
        let db = self.conn();
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q.to_lowercase()));

        let mut stmt = db.prepare(
            "SELECT id, name, email, year FROM students
             WHERE ?1 IS NULL OR lower(name) LIKE ?1 OR lower(email) LIKE ?1
             ORDER BY name, id",
        )?;

        let students = stmt.query_map([pattern], summary_from_row)?;
        students.collect()
    }

    /// Gets the vote count for a feature, 0 if nobody voted yet
    pub fn feature_votes(&self, feature_key: &str) -> Result<i64> {
        let db = self.conn();
        let count = db
            .query_row(
                "SELECT count FROM feature_votes WHERE feature_key = ?",
                [feature_key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(count.unwrap_or(0))
    }

    /// Adds one vote to a feature and returns the new count
    pub fn increment_feature_votes(&self, feature_key: &str) -> Result<i64> {
        let db = self.conn();
        db.query_row(
            "INSERT INTO feature_votes (feature_key, count) VALUES (?1, 1)
             ON CONFLICT(feature_key) DO UPDATE SET count = count + 1
             RETURNING count",
            [feature_key],
            |row| row.get(0),
        )
    }

    pub fn rate_limit(&self, key: &str) -> Result<Option<DbRateLimit>> {
        let db = self.conn();
        db.query_row(
            "SELECT key, count, window_start FROM rate_limits WHERE key = ?",
            [key],
            |row| {
                Ok(DbRateLimit {
                    key: row.get(0)?,
                    count: row.get(1)?,
                    window_start: row.get(2)?,
                })
            },
        )
        .optional()
    }

    /// Starts a fresh window for `key` with a count of 1
    pub fn start_rate_limit_window(&self, key: &str, now: DateTime<Utc>) -> Result<()> {
        let db = self.conn();
        db.execute(
            "INSERT INTO rate_limits (key, count, window_start) VALUES (?1, 1, ?2)
             ON CONFLICT(key) DO UPDATE SET count = 1, window_start = excluded.window_start",
            (key, now),
        )?;
        Ok(())
    }

    pub fn set_rate_limit_count(&self, key: &str, count: i64) -> Result<()> {
        let db = self.conn();
        db.execute(
            "UPDATE rate_limits SET count = ?2 WHERE key = ?1",
            (key, count),
        )?;
        Ok(())
    }
}

impl MatchStore for MatcherDb {
    fn student_id_by_email(&self, email: &str) -> Result<Option<String>> {
        let db = self.conn();
        db.query_row("SELECT id FROM students WHERE email = ?", [email], |row| {
            row.get(0)
        })
        .optional()
    }

    fn student_exists(&self, student_id: &str) -> Result<bool> {
        let db = self.conn();
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM students WHERE id = ?",
            [student_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn course_codes_for_student(&self, student_id: &str) -> Result<Vec<String>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT course_code FROM student_courses WHERE student_id = ? ORDER BY course_code",
        )?;

        let codes = stmt.query_map([student_id], |row| row.get(0))?;
        codes.collect()
    }

    fn students_sharing_courses(
        &self,
        student_id: &str,
        course_codes: &[String],
    ) -> Result<Vec<(StudentSummary, String)>> {
        if course_codes.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..course_codes.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");

        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT s.id, s.name, s.email, s.year, sc.course_code
             FROM student_courses sc
             JOIN students s ON s.id = sc.student_id
             WHERE sc.student_id != ?1 AND sc.course_code IN ({placeholders})
             ORDER BY s.name, s.id, sc.course_code"
        ))?;

        let params = std::iter::once(student_id).chain(course_codes.iter().map(String::as_str));
        let rows = stmt.query_map(params_from_iter(params), |row| {
            Ok((summary_from_row(row)?, row.get(4)?))
        })?;

        rows.collect()
    }

    fn events_for_student(&self, student_id: &str) -> Result<Vec<DbEvent>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {EVENT_COLUMNS}
             FROM events e
             WHERE e.student_id = ?
             ORDER BY e.start_time, e.event_id"
        ))?;

        let events = stmt.query_map([student_id], event_from_row)?;
        events.collect()
    }

    fn events_with_students(&self) -> Result<Vec<(DbEvent, StudentSummary)>> {
        let db = self.conn();
        let mut stmt = db.prepare(&format!(
            "SELECT {EVENT_COLUMNS}, s.id, s.name, s.email, s.year
             FROM events e
             JOIN students s ON s.id = e.student_id
             ORDER BY e.start_time, e.event_id"
        ))?;

        let rows = stmt.query_map([], |row| {
            let event = event_from_row(row)?;
            let student = StudentSummary {
                id: row.get(10)?,
                name: row.get(11)?,
                email: row.get(12)?,
                year: row.get(13)?,
            };
            Ok((event, student))
        })?;

        rows.collect()
    }
}

/// Deletes every event of a student and inserts the given ones in their place
fn replace_events(tx: &Transaction<'_>, student_id: &str, events: &[ParsedEvent]) -> Result<()> {
    tx.execute("DELETE FROM events WHERE student_id = ?", [student_id])?;

    let mut stmt = tx.prepare(
        "INSERT INTO events (
            student_id, uid, summary, location, description,
            start_time, end_time, rrule, exdates
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    for event in events {
        let exdates_json = serde_json::to_string(&event.exdates)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        stmt.execute((
            student_id,
            &event.uid,
            &event.summary,
            &event.location,
            &event.description,
            event.start,
            event.end,
            &event.rrule,
            exdates_json,
        ))?;
    }

    Ok(())
}

fn summary_from_row(row: &Row<'_>) -> Result<StudentSummary> {
    Ok(StudentSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        year: row.get(3)?,
    })
}

fn event_from_row(row: &Row<'_>) -> Result<DbEvent> {
    let exdates_json: String = row.get(9)?;
    let exdates = serde_json::from_str(&exdates_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

    Ok(DbEvent {
        event_id: row.get(0)?,
        student_id: row.get(1)?,
        uid: row.get(2)?,
        summary: row.get(3)?,
        location: row.get(4)?,
        description: row.get(5)?,
        start_time: row.get(6)?,
        end_time: row.get(7)?,
        rrule: row.get(8)?,
        exdates,
    })
}
