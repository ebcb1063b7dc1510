//! Grouping of every stored event into physical class sections.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use super::types::ClassGroup;
use super::{extract_course_code, MatchStore};
use crate::error::ServiceError;

pub const DEFAULT_MIN_GROUP_SIZE: usize = 2;

/// Course code, start, end and location all have to be equal.
type GroupKey = (String, DateTime<Utc>, DateTime<Utc>, Option<String>);

/// Groups students sharing the same course code, meeting time and room.
///
/// # Arguments
/// * `course_filter` - Optional case-insensitive substring the course code must contain
/// * `min_size` - Smallest group size to report (at least 1)
///
/// # Returns
/// Groups ordered by size (largest first), then course code, then start time.
pub fn group_classes<S>(
    store: &S,
    course_filter: Option<&str>,
    min_size: usize,
) -> Result<Vec<ClassGroup>, ServiceError>
where
    S: MatchStore + ?Sized,
{
    let min_size = min_size.max(1);
    let filter = course_filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_lowercase);

    let rows = store.events_with_students()?;

    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<ClassGroup> = Vec::new();

    for (event, student) in rows {
        let Some(course_code) = extract_course_code(&event.summary) else {
            continue;
        };

        let key = (
            course_code.to_string(),
            event.start_time,
            event.end_time,
            event.location.clone(),
        );

        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(ClassGroup {
                course_code: course_code.to_string(),
                location: event.location.clone(),
                start_time: event.start_time,
                end_time: event.end_time,
                size: 0,
                students: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        if !group.students.iter().any(|s| s.id == student.id) {
            group.students.push(student);
            group.size = group.students.len();
        }
    }

    let total = groups.len();
    let mut classes: Vec<ClassGroup> = groups
        .into_iter()
        .filter(|g| g.size >= min_size)
        .filter(|g| match &filter {
            Some(f) => g.course_code.to_lowercase().contains(f.as_str()),
            None => true,
        })
        .collect();

    classes.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.course_code.cmp(&b.course_code))
            .then_with(|| a.start_time.cmp(&b.start_time))
            .then_with(|| a.end_time.cmp(&b.end_time))
            .then_with(|| a.location.cmp(&b.location))
    });

    debug!(
        "Grouped events into {} classes, {} kept (min_size={})",
        total,
        classes.len(),
        min_size
    );

    Ok(classes)
}
