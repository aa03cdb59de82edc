//! Resource kinds and record identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Back-office resources exposed by the REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Case,
    Client,
    Session,
    Procedure,
    Court,
    Lawyer,
    /// Published website content (pages, articles, banners).
    Content,
    User,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Case,
        ResourceKind::Client,
        ResourceKind::Session,
        ResourceKind::Procedure,
        ResourceKind::Court,
        ResourceKind::Lawyer,
        ResourceKind::Content,
        ResourceKind::User,
    ];

    /// Path segment under the API base url.
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResourceKind::Case => "cases",
            ResourceKind::Client => "clients",
            ResourceKind::Session => "sessions",
            ResourceKind::Procedure => "procedures",
            ResourceKind::Court => "courts",
            ResourceKind::Lawyer => "lawyers",
            ResourceKind::Content => "contents",
            ResourceKind::User => "users",
        }
    }

    /// First segment of every cache key for this resource.
    pub fn cache_prefix(&self) -> &'static str {
        self.path_segment()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown resource: {0}")]
pub struct ParseResourceError(pub String);

impl FromStr for ResourceKind {
    type Err = ParseResourceError;

    /// Accepts singular or plural names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| {
                let plural = kind.path_segment();
                lower == plural || lower == plural[..plural.len() - 1]
            })
            .ok_or_else(|| ParseResourceError(s.to_string()))
    }
}

/// Record identifier as sent by the backend.
///
/// Most records carry numeric ids; a few (website content slugs, imported
/// clients) use strings. Both forms are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Read an id out of a JSON value, accepting numbers and non-empty strings.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(RecordId::Int),
            serde_json::Value::String(s) if !s.trim().is_empty() => {
                Some(RecordId::Text(s.clone()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        match id.parse::<i64>() {
            Ok(n) => RecordId::Int(n),
            Err(_) => RecordId::Text(id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_singular_and_plural() {
        assert_eq!("cases".parse::<ResourceKind>(), Ok(ResourceKind::Case));
        assert_eq!("Case".parse::<ResourceKind>(), Ok(ResourceKind::Case));
        assert_eq!(
            " lawyers ".parse::<ResourceKind>(),
            Ok(ResourceKind::Lawyer)
        );
        assert_eq!("content".parse::<ResourceKind>(), Ok(ResourceKind::Content));
        assert!("invoices".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_cache_prefixes_are_distinct() {
        let mut prefixes: Vec<_> = ResourceKind::ALL.iter().map(|k| k.cache_prefix()).collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), ResourceKind::ALL.len());
    }

    #[test]
    fn test_record_id_from_json() {
        assert_eq!(RecordId::from_json(&json!(42)), Some(RecordId::Int(42)));
        assert_eq!(
            RecordId::from_json(&json!("about-us")),
            Some(RecordId::Text("about-us".to_string()))
        );
        assert_eq!(RecordId::from_json(&json!("")), None);
        assert_eq!(RecordId::from_json(&json!(null)), None);
        assert_eq!(RecordId::from_json(&json!(1.5)), None);
    }

    #[test]
    fn test_record_id_from_str_prefers_numbers() {
        assert_eq!(RecordId::from("17"), RecordId::Int(17));
        assert_eq!(RecordId::from("c-17"), RecordId::Text("c-17".to_string()));
        assert_eq!(RecordId::from("17").to_string(), "17");
    }

    #[test]
    fn test_record_id_serde_untagged() {
        let ids: Vec<RecordId> = serde_json::from_value(json!([3, "x"])).unwrap();
        assert_eq!(ids, vec![RecordId::Int(3), RecordId::Text("x".to_string())]);
    }
}
