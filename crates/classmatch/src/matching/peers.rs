//! Peer matching: which other students share courses (or exact class times)
//! with a given student.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

use super::types::{Match, MatchMode, StudentRef};
use super::{extract_course_code, resolve_student, MatchStore};
use crate::db::{DbEvent, StudentSummary};
use crate::error::ServiceError;

/// A course code at an exact meeting time.
type ClassKey = (String, DateTime<Utc>, DateTime<Utc>);

/// What happened when a candidate was checked for shared class times.
#[derive(Debug)]
enum CandidateOutcome {
    Matched(Match),
    NoSharedTimes,
    /// The candidate's events could not be loaded; they are left out
    Skipped {
        student_id: String,
        reason: rusqlite::Error,
    },
}

/// Finds every other student sharing at least one course with `subject`.
///
/// In [`MatchMode::Classes`] a candidate is kept only if they meet at exactly
/// the same time as the subject for some shared course, and `shared_courses`
/// lists only those courses. A candidate whose events cannot be read is
/// skipped rather than failing the whole list.
///
/// Matches are ordered by student name, then id.
pub fn find_matches<S>(
    store: &S,
    subject: &StudentRef,
    mode: MatchMode,
) -> Result<Vec<Match>, ServiceError>
where
    S: MatchStore + ?Sized,
{
    let student_id = resolve_student(store, subject)?;

    let codes: BTreeSet<String> = store
        .course_codes_for_student(&student_id)?
        .into_iter()
        .collect();
    if codes.is_empty() {
        return Ok(Vec::new());
    }

    let code_list: Vec<String> = codes.iter().cloned().collect();
    let rows = store.students_sharing_courses(&student_id, &code_list)?;

    let mut by_student: BTreeMap<String, (StudentSummary, BTreeSet<String>)> = BTreeMap::new();
    for (student, course_code) in rows {
        by_student
            .entry(student.id.clone())
            .or_insert_with(|| (student, BTreeSet::new()))
            .1
            .insert(course_code);
    }

    let candidates = by_student.into_values().map(|(student, shared)| Match {
        student,
        shared_courses: shared.into_iter().collect(),
    });

    let mut matches: Vec<Match> = match mode {
        MatchMode::Courses => candidates.collect(),
        MatchMode::Classes => {
            let own_keys = class_keys(&store.events_for_student(&student_id)?, &codes);

            candidates
                .map(|candidate| check_shared_times(store, candidate, &own_keys))
                .filter_map(|outcome| match outcome {
                    CandidateOutcome::Matched(m) => Some(m),
                    CandidateOutcome::NoSharedTimes => None,
                    CandidateOutcome::Skipped { student_id, reason } => {
                        warn!("Skipping match candidate {student_id}: {reason}");
                        None
                    }
                })
                .collect()
        }
    };

    matches.sort_by(|a, b| {
        a.student
            .name
            .cmp(&b.student.name)
            .then_with(|| a.student.id.cmp(&b.student.id))
    });

    debug!(
        "Found {} {} matches for student {}",
        matches.len(),
        mode,
        student_id
    );

    Ok(matches)
}

fn check_shared_times<S>(store: &S, candidate: Match, own_keys: &HashSet<ClassKey>) -> CandidateOutcome
where
    S: MatchStore + ?Sized,
{
    let events = match store.events_for_student(&candidate.student.id) {
        Ok(events) => events,
        Err(reason) => {
            return CandidateOutcome::Skipped {
                student_id: candidate.student.id,
                reason,
            }
        }
    };

    let allowed: BTreeSet<String> = candidate.shared_courses.iter().cloned().collect();
    let timed: BTreeSet<String> = class_keys(&events, &allowed)
        .intersection(own_keys)
        .map(|(code, _, _)| code.clone())
        .collect();

    if timed.is_empty() {
        CandidateOutcome::NoSharedTimes
    } else {
        CandidateOutcome::Matched(Match {
            student: candidate.student,
            shared_courses: timed.into_iter().collect(),
        })
    }
}

/// Class keys for the events whose course code is in `courses`.
fn class_keys(events: &[DbEvent], courses: &BTreeSet<String>) -> HashSet<ClassKey> {
    events
        .iter()
        .filter_map(|e| {
            let code = extract_course_code(&e.summary)?;
            courses
                .contains(code)
                .then(|| (code.to_string(), e.start_time, e.end_time))
        })
        .collect()
}
