use crate::analytics;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{now_param, open_store};
use crate::ipc::types::{AppState, Request};
use crate::model::{COURSES, MONTH_LABELS, STUDENTS};
use crate::query::Condition;
use crate::store::{self, DocumentStore, StoreError};
use chrono::{DateTime, Utc};
use serde_json::json;

fn year_param(req: &Request) -> Result<Option<i32>, serde_json::Value> {
    match req.params.get("year") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .and_then(|y| i32::try_from(y).ok())
            .map(Some)
            .ok_or_else(|| err(&req.id, "bad_params", "year must be an integer", None)),
    }
}

fn enrollment(
    store: &dyn DocumentStore,
    year: Option<i32>,
) -> Result<serde_json::Value, StoreError> {
    let students = store.read_all(STUDENTS)?;
    let dates = students.iter().map(|s| s.get_str("enrolledDate"));
    let counts = match year {
        Some(y) => analytics::enrollment_by_month_for_year(dates, y),
        None => analytics::enrollment_by_month(dates),
    };
    Ok(json!({
        "labels": MONTH_LABELS,
        "counts": counts,
        "year": year,
    }))
}

fn course_status(
    store: &dyn DocumentStore,
    now: DateTime<Utc>,
) -> Result<serde_json::Value, StoreError> {
    let courses = store.read_all(COURSES)?;
    let counts = analytics::course_status_counts(
        courses
            .iter()
            .map(|c| (c.get_str("startDate"), c.get_str("endDate"))),
        now,
    );
    Ok(json!(counts))
}

fn summary(
    store: &dyn DocumentStore,
    now: DateTime<Utc>,
    year: Option<i32>,
) -> Result<serde_json::Value, StoreError> {
    Ok(json!({
        "studentCount": store::count(store, STUDENTS, &[])?,
        "courseCount": store::count(store, COURSES, &[])?,
        "activeStudents": store::count(store, STUDENTS, &[Condition::equals("status", "active")])?,
        "enrollment": enrollment(store, year)?,
        "courseStatus": course_status(store, now)?,
        "now": now.to_rfc3339(),
    }))
}

fn handle_dashboard_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let now = match now_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let year = match year_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match summary(&store, now, year) {
        Ok(v) => ok(&req.id, v),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_dashboard_enrollment(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let year = match year_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match enrollment(&store, year) {
        Ok(v) => ok(&req.id, v),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_dashboard_course_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let now = match now_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match course_status(&store, now) {
        Ok(v) => ok(&req.id, v),
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.summary" => Some(handle_dashboard_summary(state, req)),
        "dashboard.enrollment" => Some(handle_dashboard_enrollment(state, req)),
        "dashboard.courseStatus" => Some(handle_dashboard_course_status(state, req)),
        _ => None,
    }
}
