//! Search and sort over already-loaded documents.

use crate::dates;
use crate::store::Document;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascend" | "ascending" => Some(SortDir::Asc),
            "desc" | "descend" | "descending" => Some(SortDir::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    /// Case-insensitive by `name`.
    Name,
    /// By a date field; missing or unparsable dates go last in either direction.
    Date(&'static str),
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Null | Value::Object(_) => None,
    }
}

/// True when any field value contains `needle`, ignoring case.
pub fn matches_search(doc: &Document, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    doc.data
        .values()
        .filter_map(scalar_text)
        .any(|t| t.to_lowercase().contains(&needle))
}

pub fn field_equals(doc: &Document, field: &str, expected: &str) -> bool {
    doc.get_str(field).map(str::trim) == Some(expected.trim())
}

pub fn sort_documents(docs: &mut [Document], by: SortBy, dir: SortDir) {
    match by {
        SortBy::Name => docs.sort_by(|a, b| {
            let ka = a.get_str("name").unwrap_or("").to_lowercase();
            let kb = b.get_str("name").unwrap_or("").to_lowercase();
            let ord = ka.cmp(&kb);
            if dir == SortDir::Desc {
                ord.reverse()
            } else {
                ord
            }
        }),
        SortBy::Date(field) => docs.sort_by(|a, b| {
            let da = a.get_str(field).and_then(dates::parse_instant);
            let db = b.get_str(field).and_then(dates::parse_instant);
            match (da, db) {
                (Some(x), Some(y)) => {
                    if dir == SortDir::Desc {
                        y.cmp(&x)
                    } else {
                        x.cmp(&y)
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }),
    }
}
