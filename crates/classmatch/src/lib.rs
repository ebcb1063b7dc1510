//! Find classmates from an uploaded class schedule.
//!
//! Students upload the ICS calendar exported from their timetable. The
//! service stores the courses and events it contains and answers three
//! questions about them:
//!
//! - which students sit in the same class section ([`matching::group_classes`]),
//! - which students share a course, or an exact meeting time, with a given
//!   student ([`matching::find_matches`]),
//! - what two students' schedules look like for the courses they share
//!   ([`matching::resolve_shared_detail`]).
//!
//! All state lives in the SQLite database behind [`db::MatcherDb`]; every
//! request reads it fresh.

pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod matching;
pub mod rate_limit;
pub mod server;
pub mod types;
pub mod upload;
