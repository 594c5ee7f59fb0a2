use crate::dates;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    InProgress,
    Completed,
    Upcoming,
}

impl CourseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseStatus::InProgress => "in_progress",
            CourseStatus::Completed => "completed",
            CourseStatus::Upcoming => "upcoming",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseStatusCounts {
    pub in_progress: usize,
    pub completed: usize,
    pub upcoming: usize,
}

impl CourseStatusCounts {
    #[cfg(test)]
    pub fn total(&self) -> usize {
        self.in_progress + self.completed + self.upcoming
    }
}

/// Enrollment counts per calendar month, index 0 = January.
///
/// Dates that are missing or unparsable are skipped. Years are not
/// separated: March 2023 and March 2024 land in the same bucket.
pub fn enrollment_by_month<'a, I>(enrolled_dates: I) -> [u32; 12]
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    enrollment_filtered(enrolled_dates, None)
}

/// Same as [`enrollment_by_month`] but only counts one calendar year.
pub fn enrollment_by_month_for_year<'a, I>(enrolled_dates: I, year: i32) -> [u32; 12]
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    enrollment_filtered(enrolled_dates, Some(year))
}

fn enrollment_filtered<'a, I>(enrolled_dates: I, year: Option<i32>) -> [u32; 12]
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut buckets = [0u32; 12];
    for d in enrolled_dates
        .into_iter()
        .flatten()
        .filter_map(dates::parse_naive)
    {
        if year.is_some_and(|y| d.year() != y) {
            continue;
        }
        buckets[d.month0() as usize] += 1;
    }
    buckets
}

/// Classifies one course against `now`.
///
/// Returns `None` when either date is missing or unparsable. A course whose
/// start is after its end is not rejected; it falls through the comparisons
/// like any other.
pub fn classify(
    start: Option<&str>,
    end: Option<&str>,
    now: DateTime<Utc>,
) -> Option<CourseStatus> {
    let start = dates::parse_instant(start?)?;
    let end = dates::parse_instant(end?)?;
    Some(if start <= now && now <= end {
        CourseStatus::InProgress
    } else if now > end {
        CourseStatus::Completed
    } else {
        CourseStatus::Upcoming
    })
}

pub fn course_status_counts<'a, I>(spans: I, now: DateTime<Utc>) -> CourseStatusCounts
where
    I: IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>,
{
    let mut counts = CourseStatusCounts::default();
    for (start, end) in spans {
        match classify(start, end, now) {
            Some(CourseStatus::InProgress) => counts.in_progress += 1,
            Some(CourseStatus::Completed) => counts.completed += 1,
            Some(CourseStatus::Upcoming) => counts.upcoming += 1,
            None => {}
        }
    }
    counts
}

/// Course length in 30-day months, rounded.
pub fn duration_months(start: Option<&str>, end: Option<&str>) -> Option<i64> {
    let start = dates::parse_instant(start?)?;
    let end = dates::parse_instant(end?)?;
    let days = (end - start).num_seconds() as f64 / 86_400.0;
    Some((days / 30.0).round() as i64)
}
