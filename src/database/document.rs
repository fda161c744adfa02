use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A stored document. Every document carries `_id` (UUID string) and `createdAt` (RFC 3339).
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Resolve a dotted path (`location.state`) inside a document
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

pub fn id_of(doc: &Document) -> Option<Uuid> {
    reference(doc, ID_FIELD)
}

/// Read a UUID stored in a reference field (`bootcamp`, `user`)
pub fn reference(doc: &Document, field: &str) -> Option<Uuid> {
    doc.get(field)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Assign `_id` and `createdAt` when absent
pub fn with_identity(mut doc: Document) -> Document {
    if id_of(&doc).is_none() {
        doc.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    if !doc.contains_key(CREATED_AT_FIELD) {
        doc.insert(CREATED_AT_FIELD.to_string(), Value::String(timestamp_now()));
    }
    doc
}

/// Merge a patch into a document; `null` values unset the field
pub fn apply_patch(doc: &mut Document, patch: &Document) {
    for (key, value) in patch {
        if key == ID_FIELD {
            continue;
        }
        if value.is_null() {
            doc.remove(key);
        } else {
            doc.insert(key.clone(), value.clone());
        }
    }
}

/// Keep only the selected top-level fields (plus `_id`)
pub fn project(doc: &Document, fields: &[String]) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in fields {
        let top = field.split('.').next().unwrap_or(field);
        if let Some(value) = doc.get(top) {
            out.insert(top.to_string(), value.clone());
        }
    }
    out
}
