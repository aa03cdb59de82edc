//! Back-office records.
//!
//! The API schema belongs to the server, so records keep every field as JSON
//! and only require an `id`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use docket_core::{EnvelopeError, RecordId};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::envelope::{json_kind, PagedList};

/// Field names tried, in order, by [`Record::display_name`].
const NAME_FIELDS: [&str; 5] = ["name", "full_name", "title", "case_number", "slug"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn from_json(value: Value) -> Result<Self, EnvelopeError> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(EnvelopeError::InvalidRecord {
                reason: format!("expected object, found {}", json_kind(&other)),
            }),
        }
    }

    pub fn from_map(mut fields: Map<String, Value>) -> Result<Self, EnvelopeError> {
        let id = fields
            .remove("id")
            .as_ref()
            .and_then(RecordId::from_json)
            .ok_or(EnvelopeError::MissingId)?;
        Ok(Self { id, fields })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Timestamp field, accepting RFC 3339, `YYYY-MM-DD HH:MM:SS`, and plain
    /// dates (midnight UTC).
    pub fn datetime(&self, name: &str) -> Option<DateTime<Utc>> {
        let raw = self.str_field(name)?.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// Human-readable label, falling back to the id.
    pub fn display_name(&self) -> String {
        NAME_FIELDS
            .iter()
            .find_map(|field| self.str_field(field).filter(|s| !s.trim().is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", self.id))
    }

    pub fn into_json(self) -> Value {
        let mut map = self.fields;
        let id = serde_json::to_value(&self.id).unwrap_or(Value::Null);
        map.insert("id".to_string(), id);
        Value::Object(map)
    }
}

pub fn records_from_list(items: Vec<Value>) -> Result<Vec<Record>, EnvelopeError> {
    items.into_iter().map(Record::from_json).collect()
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.last_page
    }
}

impl Page<Record> {
    pub fn from_paged(paged: PagedList) -> Result<Self, EnvelopeError> {
        Ok(Self {
            items: records_from_list(paged.items)?,
            total: paged.total,
            page: paged.page,
            per_page: paged.per_page,
            last_page: paged.last_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn session() -> Record {
        Record::from_json(json!({
            "id": 31,
            "case_number": "2026/114",
            "starts_at": "2026-11-02 09:30:00",
            "filed_on": "2026-10-01",
            "updated_at": "2026-10-19T08:00:00+03:00",
            "court": {"id": 4, "name": "Court of Appeal"}
        }))
        .unwrap()
    }

    #[test]
    fn test_from_json_extracts_id() {
        let record = session();
        assert_eq!(record.id, RecordId::Int(31));
        assert!(record.field("id").is_none());
        assert_eq!(record.str_field("case_number"), Some("2026/114"));
    }

    #[test]
    fn test_from_json_requires_id() {
        assert_eq!(
            Record::from_json(json!({"name": "no id"})),
            Err(EnvelopeError::MissingId)
        );
        assert_eq!(
            Record::from_json(json!({"id": null})),
            Err(EnvelopeError::MissingId)
        );
        assert!(matches!(
            Record::from_json(json!(["x"])),
            Err(EnvelopeError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_datetime_formats() {
        let record = session();

        let starts = record.datetime("starts_at").unwrap();
        assert_eq!((starts.hour(), starts.minute()), (9, 30));

        let filed = record.datetime("filed_on").unwrap();
        assert_eq!((filed.year(), filed.month(), filed.day()), (2026, 10, 1));

        let updated = record.datetime("updated_at").unwrap();
        assert_eq!(updated.hour(), 5);

        assert!(record.datetime("court").is_none());
        assert!(record.datetime("missing").is_none());
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(session().display_name(), "2026/114");

        let raw = json!({"id": "c-9", "name": "Amal Haddad"});
        let client = Record::from_json(raw).unwrap();
        assert_eq!(client.display_name(), "Amal Haddad");

        let bare = Record::from_json(json!({"id": 3, "name": " "})).unwrap();
        assert_eq!(bare.display_name(), "#3");
    }

    #[test]
    fn test_into_json_restores_id() {
        let value = session().into_json();
        assert_eq!(value["id"], json!(31));
        assert_eq!(value["court"]["name"], json!("Court of Appeal"));
    }

    #[test]
    fn test_serialize_flattens_fields() {
        let raw = json!({"id": 1, "name": "Cairo Court"});
        let record = Record::from_json(raw.clone()).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, raw);
    }

    #[test]
    fn test_page_has_next() {
        let page = Page::<Record> {
            items: Vec::new(),
            total: 30,
            page: 2,
            per_page: 10,
            last_page: 3,
        };
        assert!(page.has_next());
        assert!(!Page { page: 3, ..page }.has_next());
    }
}
