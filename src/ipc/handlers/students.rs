use crate::forms::{self, failure_notification};
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{
    delete_record, form_fail, open_store, optional_str, record_param, required_str, saved_json,
    sort_dir,
};
use crate::ipc::types::{AppState, Request};
use crate::listing::{self, SortBy};
use crate::model::{RecordKind, StudentStatus, STUDENTS};
use crate::query::Condition;
use crate::references;
use crate::store::{self, Document, DocumentStore};
use serde::Deserialize;
use serde_json::json;

fn status_of(doc: &Document) -> Option<StudentStatus> {
    doc.get("status")
        .and_then(|v| StudentStatus::deserialize(v).ok())
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let status_filter = match optional_str(req, "status") {
        None => None,
        Some(raw) => match raw.parse::<StudentStatus>() {
            Ok(s) => Some(s),
            Err(e) => return err(&req.id, "bad_params", e, None),
        },
    };
    let sort_by = match optional_str(req, "sortBy") {
        None => None,
        Some("name") => Some(SortBy::Name),
        Some("enrolledDate") => Some(SortBy::Date("enrolledDate")),
        Some(other) => {
            return err(
                &req.id,
                "bad_params",
                format!("cannot sort students by {}", other),
                Some(json!({ "allowed": ["name", "enrolledDate"] })),
            )
        }
    };
    let dir = match sort_dir(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let all = match store.read_all(STUDENTS) {
        Ok(v) => v,
        Err(e) => return fail(&req.id, &e),
    };
    let total = all.len();
    let active = [Condition::equals("status", "active")];
    let active_count = match store::count(&store, STUDENTS, &active) {
        Ok(v) => v,
        Err(e) => return fail(&req.id, &e),
    };

    let search = optional_str(req, "search");
    let course = optional_str(req, "course");
    let mut rows: Vec<Document> = all
        .into_iter()
        .filter(|d| search.map_or(true, |s| listing::matches_search(d, s)))
        .filter(|d| course.map_or(true, |c| listing::field_equals(d, "course", c)))
        .filter(|d| status_filter.map_or(true, |s| status_of(d) == Some(s)))
        .collect();
    if let Some(by) = sort_by {
        listing::sort_documents(&mut rows, by, dir);
    }

    ok(
        &req.id,
        json!({
            "students": rows.into_iter().map(Document::into_json).collect::<Vec<_>>(),
            "total": total,
            "activeCount": active_count,
        }),
    )
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.get(STUDENTS, &id) {
        Ok(Some(doc)) => ok(&req.id, json!({ "student": doc.into_json() })),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_students_save(state: &mut AppState, req: &Request, update: bool) -> serde_json::Value {
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
    let record = match record_param(req, "student") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match forms::save_record(&store, &state.config, RecordKind::Student, id.as_deref(), &record) {
        Ok(saved) => ok(&req.id, saved_json(&saved)),
        Err(e) => form_fail(req, &e, failure_notification(&e, update).as_ref()),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    delete_record(req, &store, STUDENTS, &id)
}

fn handle_students_dangling(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match references::dangling_students(&store) {
        Ok(list) => ok(&req.id, json!({ "students": list })),
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_save(state, req, false)),
        "students.update" => Some(handle_students_save(state, req, true)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.danglingCourses" => Some(handle_students_dangling(state, req)),
        _ => None,
    }
}
