//! Request/response shapes exchanged with a remote row source.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::error::TransportError;
use crate::pagination::PageSize;
use crate::row::Row;
use crate::sort::SortDirective;

/// Keys owned by the grid; request extensions never overwrite them.
pub const RESERVED_KEYS: [&str; 4] = ["current", "resultCount", "sort", "searchPhrase"];

/// Outgoing page request.
///
/// ```json
/// { "current": 2, "resultCount": 10, "sort": { "name": "desc" }, "searchPhrase": "" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRequest {
    pub current: usize,
    #[serde(alias = "rowCount")]
    pub result_count: PageSize,
    #[serde(default)]
    pub sort: SortDirective,
    #[serde(default)]
    pub search_phrase: String,
    /// Static extensions from the `post` option.
    #[serde(flatten)]
    pub extensions: Map<String, Json>,
}

impl GridRequest {
    pub fn new(current: usize, result_count: PageSize, sort: SortDirective, search_phrase: impl Into<String>) -> Self {
        Self {
            current,
            result_count,
            sort,
            search_phrase: search_phrase.into(),
            extensions: Map::new(),
        }
    }

    /// Merges extension keys, skipping the reserved ones.
    pub fn with_extensions(mut self, extensions: &Map<String, Json>) -> Self {
        for (key, value) in extensions {
            if RESERVED_KEYS.contains(&key.as_str()) {
                log::debug!("Ignoring reserved request extension '{key}'");
                continue;
            }
            match (self.extensions.get_mut(key), value) {
                (Some(Json::Object(existing)), Json::Object(incoming)) => deep_merge(existing, incoming),
                _ => {
                    self.extensions.insert(key.clone(), value.clone());
                }
            }
        }
        self
    }

    /// JSON form handed to the request hook and the transport.
    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }
}

fn deep_merge(target: &mut Map<String, Json>, source: &Map<String, Json>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Json::Object(existing)), Json::Object(incoming)) => deep_merge(existing, incoming),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Incoming page of rows.
///
/// ```json
/// { "current": 2, "rows": [{ "id": 11 }], "totals": 42 }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridResponse {
    /// Page the server actually returned; the requested page when absent.
    #[serde(default)]
    pub current: Option<usize>,
    #[serde(default)]
    pub rows: Vec<Row>,
    /// Total row count across all pages; `rows.len()` when absent.
    #[serde(default, alias = "total")]
    pub totals: Option<usize>,
}

impl GridResponse {
    pub fn new(current: usize, rows: Vec<Row>, totals: usize) -> Self {
        Self {
            current: Some(current),
            rows,
            totals: Some(totals),
        }
    }

    /// Parses a response payload.
    ///
    /// A payload that is itself a JSON string is decoded once more, since
    /// some endpoints double-encode.
    pub fn from_json(payload: Json) -> Result<Self, TransportError> {
        let payload = match payload {
            Json::String(text) => serde_json::from_str(&text)
                .map_err(|e| TransportError::parse_with_body(e.to_string(), text))?,
            other => other,
        };
        serde_json::from_value(payload).map_err(|e| TransportError::Parse {
            message: e.to_string(),
            body: None,
        })
    }

    pub fn total_rows(&self) -> usize {
        self.totals.unwrap_or(self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = GridRequest::new(2, PageSize::All, SortDirective::desc("name"), "ab");
        assert_eq!(
            request.to_json(),
            json!({"current": 2, "resultCount": -1, "sort": {"name": "desc"}, "searchPhrase": "ab"})
        );
    }

    #[test]
    fn test_extensions_skip_reserved_keys() {
        let post = json!({"current": 99, "sort": {}, "tenant": "acme", "filter": {"a": 1}});
        let post = post.as_object().cloned().unwrap();
        let request = GridRequest::new(1, PageSize::Rows(10), SortDirective::new(), "").with_extensions(&post);
        let wire = request.to_json();
        assert_eq!(wire["current"], json!(1));
        assert_eq!(wire["tenant"], json!("acme"));
        assert_eq!(wire["filter"], json!({"a": 1}));
    }

    #[test]
    fn test_extensions_deep_merge() {
        let first = json!({"filter": {"a": 1, "nested": {"x": 1}}});
        let second = json!({"filter": {"b": 2, "nested": {"y": 2}}});
        let request = GridRequest::new(1, PageSize::Rows(10), SortDirective::new(), "")
            .with_extensions(first.as_object().unwrap())
            .with_extensions(second.as_object().unwrap());
        assert_eq!(
            request.extensions["filter"],
            json!({"a": 1, "b": 2, "nested": {"x": 1, "y": 2}})
        );
    }

    #[test]
    fn test_request_accepts_row_count_alias() {
        let request: GridRequest =
            serde_json::from_value(json!({"current": 1, "rowCount": 25, "sort": {}, "searchPhrase": ""})).unwrap();
        assert_eq!(request.result_count, PageSize::Rows(25));
        assert!(request.extensions.is_empty());
    }

    #[test]
    fn test_response_parse_and_fallbacks() {
        let response = GridResponse::from_json(json!({"rows": [{"id": 1}, {"id": 2}]})).unwrap();
        assert_eq!(response.current, None);
        assert_eq!(response.total_rows(), 2);

        let response = GridResponse::from_json(json!({"current": 3, "rows": [], "total": 40})).unwrap();
        assert_eq!(response.total_rows(), 40);
    }

    #[test]
    fn test_response_double_encoded() {
        let payload = Json::String(r#"{"current": 1, "rows": [], "totals": 0}"#.into());
        assert_eq!(GridResponse::from_json(payload).unwrap(), GridResponse::new(1, vec![], 0));
    }

    #[test]
    fn test_response_bad_shape() {
        let err = GridResponse::from_json(json!({"rows": 5})).unwrap_err();
        assert!(matches!(err, TransportError::Parse { .. }));
    }
}
