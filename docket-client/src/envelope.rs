//! Response envelope unpacking.
//!
//! The back-office API is not consistent about how it wraps payloads. List
//! endpoints answer with any of
//!
//! - a bare array: `[...]`
//! - `{"data": [...]}`
//! - `{"data": {"data": [...], "total": 40, ...}}` (paginated)
//! - `{"data": {"items": [...]}}` or `{"items": [...]}`
//!
//! and detail endpoints with a bare object, `{"data": {...}}`, or
//! `{"data": {"data": {...}}}`.

use docket_core::EnvelopeError;
use serde_json::{Map, Value};

/// Name of a JSON value's type, for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extract the record list from a list response.
pub fn unwrap_list(body: Value) -> Result<Vec<Value>, EnvelopeError> {
    let found = json_kind(&body);
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut outer) => match outer.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Object(mut inner)) => match take_array(&mut inner, &["data", "items"]) {
                Some(items) => Ok(items),
                None => Err(EnvelopeError::NoList { found: "object" }),
            },
            Some(other) => Err(EnvelopeError::NoList {
                found: json_kind(&other),
            }),
            None => take_array(&mut outer, &["items"]).ok_or(EnvelopeError::NoList { found }),
        },
        _ => Err(EnvelopeError::NoList { found }),
    }
}

/// Extract the record object from a detail response.
pub fn unwrap_item(body: Value) -> Result<Map<String, Value>, EnvelopeError> {
    let mut current = match body {
        Value::Object(map) => map,
        other => {
            return Err(EnvelopeError::NoItem {
                found: json_kind(&other),
            })
        }
    };

    // At most two levels of `data` wrapping.
    for _ in 0..2 {
        let wrapped = match current.get("data") {
            Some(Value::Object(_)) => true,
            Some(Value::Array(_)) => return Err(EnvelopeError::NoItem { found: "array" }),
            _ => false,
        };
        if !wrapped {
            break;
        }
        if let Some(Value::Object(inner)) = current.remove("data") {
            current = inner;
        }
    }
    Ok(current)
}

/// A list response together with its pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedList {
    pub items: Vec<Value>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub last_page: u32,
}

/// Extract records and pagination metadata from a list response.
///
/// Metadata is read from the outer object, its `meta` object, the `data`
/// object, or `data.meta`, whichever carries it. Missing values describe a
/// single page holding every returned record.
pub fn unwrap_page(body: Value) -> Result<PagedList, EnvelopeError> {
    let (total, page, per_page, last_page) = {
        let meta = collect_meta(&body);
        (
            meta.get_u64(&["total", "total_count", "count"]),
            meta.get_u64(&["current_page", "page"]),
            meta.get_u64(&["per_page", "limit", "page_size"]),
            meta.get_u64(&["last_page", "total_pages", "pages"]),
        )
    };
    let items = unwrap_list(body)?;

    let count = items.len() as u64;
    let total = total.unwrap_or(count);
    let page = page.map(clamp_u32).unwrap_or(1).max(1);
    let per_page = per_page
        .map(clamp_u32)
        .unwrap_or_else(|| clamp_u32(count))
        .max(1);
    let last_page = last_page
        .map(clamp_u32)
        .unwrap_or_else(|| clamp_u32(total.div_ceil(per_page as u64)))
        .max(1);

    Ok(PagedList {
        items,
        total,
        page,
        per_page,
        last_page,
    })
}

fn take_array(map: &mut Map<String, Value>, keys: &[&str]) -> Option<Vec<Value>> {
    for key in keys {
        if matches!(map.get(*key), Some(Value::Array(_))) {
            if let Some(Value::Array(items)) = map.remove(*key) {
                return Some(items);
            }
        }
    }
    None
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Objects that may carry pagination fields, most specific first.
struct MetaSources<'a>(Vec<&'a Map<String, Value>>);

impl MetaSources<'_> {
    fn get_u64(&self, names: &[&str]) -> Option<u64> {
        self.0.iter().find_map(|map| {
            names
                .iter()
                .find_map(|name| map.get(*name).and_then(as_count))
        })
    }
}

fn collect_meta(body: &Value) -> MetaSources<'_> {
    let mut sources = Vec::new();
    if let Value::Object(outer) = body {
        if let Some(Value::Object(data)) = outer.get("data") {
            if let Some(Value::Object(meta)) = data.get("meta") {
                sources.push(meta);
            }
            sources.push(data);
        }
        if let Some(Value::Object(meta)) = outer.get("meta") {
            sources.push(meta);
        }
        sources.push(outer);
    }
    MetaSources(sources)
}

/// Counts sometimes arrive as strings.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
