//! Decoding of uploaded ICS calendars into courses and events.
//!
//! The heavy lifting is done by `icalendar`; this module only picks the
//! properties the matcher stores and derives the course list from event
//! summaries (e.g. `CSC108H5 LEC0101`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{Calendar, CalendarComponent, Component, Event, Property};

use crate::error::ServiceError;
use crate::matching::extract_course_code;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCourse {
    pub course_code: String,
    /// e.g. `LEC0106`, `TUT0101`
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    pub uid: String,
    pub summary: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub rrule: Option<String>,
    pub exdates: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarParseResult {
    pub courses: Vec<ParsedCourse>,
    pub events: Vec<ParsedEvent>,
}

/// Parses raw ICS text into the courses and events it contains.
///
/// Events without a usable `DTSTART` are dropped, but their summary still
/// contributes to the course list.
pub fn parse_ics(raw_ics: &str) -> Result<CalendarParseResult, ServiceError> {
    let calendar: Calendar = raw_ics
        .parse()
        .map_err(|e| ServiceError::Calendar {
            message: format!("{e}"),
        })?;

    let mut result = CalendarParseResult::default();

    for component in &calendar.components {
        let CalendarComponent::Event(ev) = component else {
            continue;
        };

        let summary = ev.get_summary().unwrap_or_default().to_string();

        if let Some(code) = extract_course_code(&summary) {
            if !result.courses.iter().any(|c| c.course_code == code) {
                result.courses.push(ParsedCourse {
                    course_code: code.to_string(),
                    section: section_from_summary(&summary, code),
                });
            }
        }

        if let Some(event) = parse_event(ev, summary) {
            result.events.push(event);
        }
    }

    Ok(result)
}

fn parse_event(ev: &Event, summary: String) -> Option<ParsedEvent> {
    let start = ev.properties().get("DTSTART").and_then(parse_date_prop)?;
    let end = ev
        .properties()
        .get("DTEND")
        .and_then(parse_date_prop)
        .unwrap_or(start);

    let location = ev
        .properties()
        .get("LOCATION")
        .map(|p| p.value().to_string())
        .filter(|s| !s.is_empty());
    let description = ev.get_description().map(str::to_string);
    let rrule = ev.properties().get("RRULE").map(|p| p.value().to_string());

    let mut exdates = Vec::new();
    let single = ev.properties().get("EXDATE").into_iter();
    let multi = ev
        .multi_properties()
        .get("EXDATE")
        .into_iter()
        .flat_map(|props| props.iter());
    for prop in single.chain(multi) {
        let zone = prop_zone(prop);
        // Invalid entries are ignored.
        exdates.extend(
            prop.value()
                .split(',')
                .filter_map(|v| parse_date_value(v.trim(), zone)),
        );
    }
    exdates.sort();
    exdates.dedup();

    let uid = ev
        .get_uid()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}-{}", summary, start.to_rfc3339()));

    Some(ParsedEvent {
        uid,
        summary,
        location,
        description,
        start,
        end,
        rrule,
        exdates,
    })
}

/// The first word left in the summary once the course code is removed.
fn section_from_summary(summary: &str, course_code: &str) -> Option<String> {
    summary
        .replacen(course_code, "", 1)
        .split_whitespace()
        .next()
        .map(str::to_string)
}

fn parse_date_prop(prop: &Property) -> Option<DateTime<Utc>> {
    parse_date_value(prop.value().trim(), prop_zone(prop))
}

/// The zone named by the property's `TZID` parameter, if it is a known IANA zone.
fn prop_zone(prop: &Property) -> Option<Tz> {
    let tzid = prop.params().get("TZID")?.value();
    tzid.trim_matches('"').parse::<Tz>().ok()
}

/// UTC values (`...Z`) are taken as is and local values are resolved in
/// `zone`. Floating times, and local times that do not exist in `zone`, are
/// read as wall-clock UTC. Date-only values are midnight UTC.
fn parse_date_value(val: &str, zone: Option<Tz>) -> Option<DateTime<Utc>> {
    if val.len() == 8 {
        return NaiveDate::parse_from_str(val, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc());
    }

    if val.ends_with('Z') {
        return NaiveDateTime::parse_from_str(val, "%Y%m%dT%H%M%SZ")
            .ok()
            .map(|d| d.and_utc());
    }

    let local = NaiveDateTime::parse_from_str(val, "%Y%m%dT%H%M%S").ok()?;
    zone.and_then(|tz| tz.from_local_datetime(&local).earliest())
        .map(|d| d.with_timezone(&Utc))
        .or_else(|| Some(Utc.from_utc_datetime(&local)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
PRODID:-//Acorn//Timetable//EN\r
BEGIN:VEVENT\r
UID:evt-1@acorn\r
SUMMARY:CSC108H5 LEC0101\r
LOCATION:DH 2060\r
DESCRIPTION:Introduction to Computer Programming\r
DTSTART:20250106T140000Z\r
DTEND:20250106T150000Z\r
RRULE:FREQ=WEEKLY;UNTIL=20250404T000000Z\r
EXDATE:20250217T140000Z,20250224T140000Z\r
END:VEVENT\r
BEGIN:VEVENT\r
SUMMARY:CSC108H5 TUT0105\r
DTSTART;TZID=America/Toronto:20250108T090000\r
DTEND;TZID=America/Toronto:20250108T100000\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:evt-3@acorn\r
SUMMARY:MAT102H5\r
DTSTART;VALUE=DATE:20250107\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:evt-4@acorn\r
SUMMARY:Reading week\r
DTSTART:20250217T000000Z\r
DTEND:20250222T000000Z\r
END:VEVENT\r
END:VCALENDAR\r
";

    #[test]
    fn test_parse_events() {
        let parsed = parse_ics(SAMPLE).unwrap();
        assert_eq!(parsed.events.len(), 4);

        let lec = &parsed.events[0];
        assert_eq!(lec.uid, "evt-1@acorn");
        assert_eq!(lec.location.as_deref(), Some("DH 2060"));
        assert_eq!(
            lec.description.as_deref(),
            Some("Introduction to Computer Programming")
        );
        assert_eq!(lec.start, Utc.with_ymd_and_hms(2025, 1, 6, 14, 0, 0).unwrap());
        assert_eq!(lec.end, Utc.with_ymd_and_hms(2025, 1, 6, 15, 0, 0).unwrap());
        assert_eq!(
            lec.rrule.as_deref(),
            Some("FREQ=WEEKLY;UNTIL=20250404T000000Z")
        );
        assert_eq!(lec.exdates.len(), 2);
    }

    #[test]
    fn test_missing_uid_and_end_get_defaults() {
        let parsed = parse_ics(SAMPLE).unwrap();

        let tut = &parsed.events[1];
        let start = Utc.with_ymd_and_hms(2025, 1, 8, 14, 0, 0).unwrap();
        assert_eq!(tut.start, start);
        assert_eq!(tut.end, Utc.with_ymd_and_hms(2025, 1, 8, 15, 0, 0).unwrap());
        assert_eq!(tut.uid, format!("CSC108H5 TUT0105-{}", start.to_rfc3339()));
        assert_eq!(tut.location, None);

        let all_day = &parsed.events[2];
        assert_eq!(all_day.start, Utc.with_ymd_and_hms(2025, 1, 7, 0, 0, 0).unwrap());
        assert_eq!(all_day.end, all_day.start);
    }

    #[test]
    fn test_courses_are_deduplicated_with_first_section() {
        let parsed = parse_ics(SAMPLE).unwrap();
        assert_eq!(
            parsed.courses,
            vec![
                ParsedCourse {
                    course_code: "CSC108H5".to_string(),
                    section: Some("LEC0101".to_string()),
                },
                ParsedCourse {
                    course_code: "MAT102H5".to_string(),
                    section: None,
                },
            ]
        );
    }

    #[test]
    fn test_section_from_summary() {
        assert_eq!(
            section_from_summary("CSC108H5 LEC0101 (In person)", "CSC108H5"),
            Some("LEC0101".to_string())
        );
        assert_eq!(section_from_summary("CSC108H5", "CSC108H5"), None);
    }

    #[test]
    fn test_parse_date_value() {
        assert!(parse_date_value("20250106T140000Z", None).is_some());
        assert!(parse_date_value("20250106", None).is_some());
        assert!(parse_date_value("not a date", None).is_none());

        // Floating time is read as wall clock
        assert_eq!(
            parse_date_value("20250108T090000", None),
            Some(Utc.with_ymd_and_hms(2025, 1, 8, 9, 0, 0).unwrap())
        );
        // Summer time in Toronto is UTC-4
        assert_eq!(
            parse_date_value("20250708T090000", Some(chrono_tz::America::Toronto)),
            Some(Utc.with_ymd_and_hms(2025, 7, 8, 13, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_tzid_and_utc_exports_agree() {
        let tzid = "BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
UID:a\r
SUMMARY:CSC108H5 LEC0101\r
DTSTART;TZID=America/Toronto:20250108T090000\r
DTEND;TZID=America/Toronto:20250108T100000\r
EXDATE;TZID=America/Toronto:20250115T090000\r
END:VEVENT\r
END:VCALENDAR\r
";
        let utc = "BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
UID:a\r
SUMMARY:CSC108H5 LEC0101\r
DTSTART:20250108T140000Z\r
DTEND:20250108T150000Z\r
EXDATE:20250115T140000Z\r
END:VEVENT\r
END:VCALENDAR\r
";
        let from_tzid = parse_ics(tzid).unwrap();
        let from_utc = parse_ics(utc).unwrap();
        assert_eq!(from_tzid.events, from_utc.events);

        // Unknown zones fall back to wall clock
        let unknown = tzid.replace("America/Toronto", "Campus/Local");
        let parsed = parse_ics(&unknown).unwrap();
        assert_eq!(
            parsed.events[0].start,
            Utc.with_ymd_and_hms(2025, 1, 8, 9, 0, 0).unwrap()
        );
    }
}
