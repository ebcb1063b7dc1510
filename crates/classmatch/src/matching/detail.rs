//! Side-by-side detail of the courses two students share.

use std::collections::{BTreeSet, HashSet};

use super::types::{CourseDetail, EventSummary, MatchMode};
use super::{resolve_email, MatchStore};
use crate::db::DbEvent;
use crate::error::ServiceError;

/// Lists, per shared course, the events each of the two students has for it.
///
/// An event belongs to a course when its summary contains the course code
/// anywhere, which is looser than the extraction used for grouping and
/// matching. In [`MatchMode::Classes`] both sides are narrowed to the time
/// slots they have in common, and courses left without events on either side
/// are dropped.
///
/// # Arguments
/// * `subject_email` - Email of the student asking
/// * `other_id` - Id of the student being compared against
/// * `mode` - Whether to narrow to common meeting times
pub fn resolve_shared_detail<S>(
    store: &S,
    subject_email: &str,
    other_id: &str,
    mode: MatchMode,
) -> Result<Vec<CourseDetail>, ServiceError>
where
    S: MatchStore + ?Sized,
{
    let my_id = resolve_email(store, subject_email)?;

    let my_codes: BTreeSet<String> = store
        .course_codes_for_student(&my_id)?
        .into_iter()
        .collect();
    let other_codes: BTreeSet<String> = store
        .course_codes_for_student(other_id)?
        .into_iter()
        .collect();

    let shared: Vec<&String> = my_codes.intersection(&other_codes).collect();
    if shared.is_empty() {
        return Ok(Vec::new());
    }

    let my_events = store.events_for_student(&my_id)?;
    let other_events = store.events_for_student(other_id)?;

    let details = shared
        .into_iter()
        .filter_map(|code| {
            let mut mine = events_mentioning(&my_events, code);
            let mut theirs = events_mentioning(&other_events, code);

            if mode == MatchMode::Classes {
                let their_slots: HashSet<_> =
                    theirs.iter().map(|e| (e.start_time, e.end_time)).collect();
                let common: HashSet<_> = mine
                    .iter()
                    .map(|e| (e.start_time, e.end_time))
                    .filter(|slot| their_slots.contains(slot))
                    .collect();

                mine.retain(|e| common.contains(&(e.start_time, e.end_time)));
                theirs.retain(|e| common.contains(&(e.start_time, e.end_time)));

                if mine.is_empty() || theirs.is_empty() {
                    return None;
                }
            }

            Some(CourseDetail {
                course_code: code.clone(),
                my_events: mine,
                other_events: theirs,
            })
        })
        .collect();

    Ok(details)
}

fn events_mentioning(events: &[DbEvent], course_code: &str) -> Vec<EventSummary> {
    events
        .iter()
        .filter(|e| e.summary.contains(course_code))
        .map(EventSummary::from)
        .collect()
}
