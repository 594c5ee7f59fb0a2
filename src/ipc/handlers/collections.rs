use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{conditions, optional_str, record_param, required_str, open_store};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, Document, DocumentStore};
use serde_json::json;
use uuid::Uuid;

fn documents_json(docs: Vec<Document>) -> serde_json::Value {
    json!(docs.into_iter().map(Document::into_json).collect::<Vec<_>>())
}

fn handle_read_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let collection = match required_str(req, "collection") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.read_all(&collection) {
        Ok(docs) => ok(&req.id, json!({ "documents": documents_json(docs) })),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_read_filtered(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let collection = match required_str(req, "collection") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conditions = match conditions(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.read_filtered(&collection, &conditions) {
        Ok(docs) => ok(&req.id, json!({ "documents": documents_json(docs) })),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let collection = match required_str(req, "collection") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.get(&collection, &id) {
        Ok(Some(doc)) => ok(&req.id, json!({ "document": doc.into_json() })),
        Ok(None) => err(
            &req.id,
            "not_found",
            "document not found",
            Some(json!({ "collection": collection, "id": id })),
        ),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_write(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let collection = match required_str(req, "collection") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let record = match record_param(req, "record") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = optional_str(req, "id")
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match store.write(&collection, &id, record) {
        Ok(doc) => ok(&req.id, json!({ "id": doc.id, "document": doc.to_json() })),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let collection = match required_str(req, "collection") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };
    // A missing id still counts as deleted; `existed` tells them apart.
    match store.delete(&collection, &id) {
        Ok(existed) => ok(&req.id, json!({ "deleted": true, "existed": existed })),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_count(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let collection = match required_str(req, "collection") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conditions = match conditions(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::count(&store, &collection, &conditions) {
        Ok(count) => ok(&req.id, json!({ "count": count })),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let store = match open_store(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store.collections() {
        Ok(list) => {
            let collections: Vec<_> = list
                .into_iter()
                .map(|(name, count)| json!({ "name": name, "count": count }))
                .collect();
            ok(&req.id, json!({ "collections": collections }))
        }
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "collections.readAll" => Some(handle_read_all(state, req)),
        "collections.readFiltered" => Some(handle_read_filtered(state, req)),
        "collections.get" => Some(handle_get(state, req)),
        "collections.write" => Some(handle_write(state, req)),
        "collections.delete" => Some(handle_delete(state, req)),
        "collections.count" => Some(handle_count(state, req)),
        "collections.list" => Some(handle_list(state, req)),
        _ => None,
    }
}
