use crate::analytics::{self, CourseStatus};
use crate::forms::{self, failure_notification};
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{
    delete_record, form_fail, now_param, open_store, optional_str, record_param, required_str,
    saved_json, sort_dir,
};
use crate::ipc::types::{AppState, Request};
use crate::listing::{self, SortBy};
use crate::model::{RecordKind, COURSES};
use crate::store::{Document, DocumentStore};
use serde_json::json;

fn parse_status(raw: &str) -> Option<CourseStatus> {
    match raw {
        "in_progress" | "inProgress" => Some(CourseStatus::InProgress),
        "completed" => Some(CourseStatus::Completed),
        "upcoming" => Some(CourseStatus::Upcoming),
        _ => None,
    }
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let now = match now_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let sort_by = match optional_str(req, "sortBy") {
        None => None,
        Some("name") => Some(SortBy::Name),
        Some("startDate") => Some(SortBy::Date("startDate")),
        Some(other) => {
            return err(
                &req.id,
                "bad_params",
                format!("cannot sort courses by {}", other),
                Some(json!({ "allowed": ["name", "startDate"] })),
            )
        }
    };
    let dir = match sort_dir(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let status_filter = match optional_str(req, "status") {
        None => None,
        Some(raw) => match parse_status(raw) {
            Some(s) => Some(s),
            None => return err(&req.id, "bad_params", format!("unknown status: {}", raw), None),
        },
    };

    let all = match store.read_all(COURSES) {
        Ok(v) => v,
        Err(e) => return fail(&req.id, &e),
    };
    let total = all.len();
    let status_counts = analytics::course_status_counts(
        all.iter().map(|c| (c.get_str("startDate"), c.get_str("endDate"))),
        now,
    );

    let search = optional_str(req, "search");
    let mut rows: Vec<Document> = all
        .into_iter()
        .filter(|d| search.map_or(true, |s| listing::matches_search(d, s)))
        .collect();
    if let Some(by) = sort_by {
        listing::sort_documents(&mut rows, by, dir);
    }

    let courses: Vec<serde_json::Value> = rows
        .into_iter()
        .filter_map(|doc| {
            let (start, end) = (doc.get_str("startDate"), doc.get_str("endDate"));
            let status = analytics::classify(start, end, now);
            if status_filter.is_some() && status != status_filter {
                return None;
            }
            let duration = analytics::duration_months(start, end);
            let mut out = doc.into_json();
            out["status"] = json!(status.map(CourseStatus::as_str));
            out["durationMonths"] = json!(duration);
            Some(out)
        })
        .collect();

    ok(
        &req.id,
        json!({
            "courses": courses,
            "total": total,
            "statusCounts": status_counts,
        }),
    )
}

fn handle_courses_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.get(COURSES, &id) {
        Ok(Some(doc)) => ok(&req.id, json!({ "course": doc.into_json() })),
        Ok(None) => err(&req.id, "not_found", "course not found", None),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_courses_save(state: &mut AppState, req: &Request, update: bool) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = if update {
        match required_str(req, "id") {
            Ok(v) => Some(v),
            Err(e) => return e,
        }
    } else {
        None
    };
    let record = match record_param(req, "course") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match forms::save_record(&store, &state.config, RecordKind::Course, id.as_deref(), &record) {
        Ok(saved) => ok(&req.id, saved_json(&saved)),
        Err(e) => form_fail(req, &e, failure_notification(&e, update).as_ref()),
    }
}

// Students naming this course are left alone.
fn handle_courses_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    delete_record(req, &store, COURSES, &id)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_courses_list(state, req)),
        "courses.get" => Some(handle_courses_get(state, req)),
        "courses.create" => Some(handle_courses_save(state, req, false)),
        "courses.update" => Some(handle_courses_save(state, req, true)),
        "courses.delete" => Some(handle_courses_delete(state, req)),
        _ => None,
    }
}
