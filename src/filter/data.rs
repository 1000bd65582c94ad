//! The request snapshot exchanged with filters.
//!
//! ```text
//! { "headers": { "<name>": ["<value>", ...] }, "body": { ... }, "status": <int> }
//! ```

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Header name to ordered values.
pub type HeaderValues = BTreeMap<String, Vec<String>>;

/// Snapshot of a request as sent to a filter, and the verdict it returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterData {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: HeaderValues,

    #[serde(skip_serializing_if = "Map::is_empty")]
    pub body: Map<String, Value>,

    /// Only meaningful on replies, where it is set from the HTTP status.
    #[serde(skip_serializing_if = "is_zero")]
    pub status: u16,
}

impl FilterData {
    pub fn new(headers: HeaderValues, body: Map<String, Value>) -> Self {
        Self {
            headers,
            body,
            status: 0,
        }
    }

    /// Fold an accepting reply into this snapshot. Empty fields in the reply
    /// leave the current value untouched.
    pub fn apply(&mut self, reply: FilterData) {
        if !reply.headers.is_empty() {
            self.headers = reply.headers;
        }
        if !reply.body.is_empty() {
            self.body = reply.body;
        }
    }
}

/// Body of an accepting filter reply.
///
/// A `status` member, if present, is ignored whatever its type: the verdict
/// always comes from the HTTP status line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilterReply {
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HeaderValues,

    #[serde(default, deserialize_with = "null_as_default")]
    pub body: Map<String, Value>,
}

impl FilterReply {
    /// Attach the HTTP status the reply arrived with.
    pub fn into_data(self, status: u16) -> FilterData {
        FilterData {
            headers: self.headers,
            body: self.body,
            status,
        }
    }
}

fn is_zero(status: &u16) -> bool {
    *status == 0
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Copy an HTTP header map into snapshot form.
///
/// Fails on the first value that is not valid UTF-8, since it could not be
/// represented in the JSON snapshot without altering it.
pub fn headers_to_values(headers: &HeaderMap) -> Result<HeaderValues, InvalidHeader> {
    let mut values = HeaderValues::new();
    for (name, value) in headers {
        let value = value
            .to_str()
            .map_err(|_| InvalidHeader(name.as_str().to_string()))?;
        values
            .entry(name.as_str().to_string())
            .or_default()
            .push(value.to_string());
    }
    Ok(values)
}

/// Convert snapshot headers back into an HTTP header map.
pub fn values_to_headers(values: &HeaderValues) -> Result<HeaderMap, InvalidHeader> {
    let mut headers = HeaderMap::new();
    for (name, list) in values {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| InvalidHeader(name.clone()))?;
        for value in list {
            let header_value =
                HeaderValue::from_str(value).map_err(|_| InvalidHeader(name.clone()))?;
            headers.append(header_name.clone(), header_value);
        }
    }
    Ok(headers)
}

/// A header name or value in a snapshot that cannot go on the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid header {0:?}")]
pub struct InvalidHeader(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_empty_fields() {
        let data = FilterData::default();
        assert_eq!(serde_json::to_string(&data).unwrap(), "{}");

        let mut headers = HeaderValues::new();
        headers.insert("x-user".into(), vec!["a".into(), "b".into()]);
        let body = json!({"x": 0}).as_object().cloned().unwrap();
        let data = FilterData::new(headers, body);
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"headers": {"x-user": ["a", "b"]}, "body": {"x": 0}})
        );
    }

    #[test]
    fn test_reply_tolerates_nulls() {
        let reply: FilterReply =
            serde_json::from_str(r#"{"headers": null, "body": null}"#).unwrap();
        assert!(reply.headers.is_empty());
        assert!(reply.body.is_empty());
    }

    #[test]
    fn test_reply_ignores_status_member() {
        for raw in [
            r#"{"body": {"x": 1}, "status": null}"#,
            r#"{"body": {"x": 1}, "status": "200"}"#,
            r#"{"body": {"x": 1}, "status": 70000}"#,
            r#"{"body": {"x": 1}, "status": 403}"#,
        ] {
            let reply: FilterReply = serde_json::from_str(raw).unwrap();
            let data = reply.into_data(200);
            assert_eq!(data.status, 200, "{raw}");
            assert_eq!(data.body["x"], 1, "{raw}");
        }
    }

    #[test]
    fn test_reply_rejects_wrong_shapes() {
        assert!(serde_json::from_str::<FilterReply>("[1]").is_err());
        assert!(serde_json::from_str::<FilterReply>(r#"{"body": [1]}"#).is_err());
        assert!(serde_json::from_str::<FilterReply>(r#"{"headers": {"a": "b"}}"#).is_err());
    }

    #[test]
    fn test_apply_keeps_values_on_empty_reply() {
        let mut headers = HeaderValues::new();
        headers.insert("accept".into(), vec!["*/*".into()]);
        let body = json!({"x": 0}).as_object().cloned().unwrap();
        let mut current = FilterData::new(headers.clone(), body.clone());

        current.apply(FilterData::default());
        assert_eq!(current.headers, headers);
        assert_eq!(current.body, body);

        let new_body = json!({"x": 1}).as_object().cloned().unwrap();
        current.apply(FilterData::new(HeaderValues::new(), new_body.clone()));
        assert_eq!(current.headers, headers);
        assert_eq!(current.body, new_body);
    }

    #[test]
    fn test_header_conversion() {
        let mut map = HeaderMap::new();
        map.append("x-multi", HeaderValue::from_static("1"));
        map.append("x-multi", HeaderValue::from_static("2"));
        map.insert("content-type", HeaderValue::from_static("application/json"));

        let values = headers_to_values(&map).unwrap();
        assert_eq!(values["x-multi"], vec!["1", "2"]);

        let back = values_to_headers(&values).unwrap();
        assert_eq!(back.get_all("x-multi").iter().count(), 2);
        assert_eq!(back["content-type"], "application/json");
    }

    #[test]
    fn test_invalid_header_from_filter() {
        let mut values = HeaderValues::new();
        values.insert("bad header".into(), vec!["v".into()]);
        assert_eq!(values_to_headers(&values), Err(InvalidHeader("bad header".into())));
    }

    #[test]
    fn test_non_utf8_header_rejected() {
        let mut map = HeaderMap::new();
        map.insert("accept", HeaderValue::from_static("*/*"));
        map.insert("x-raw", HeaderValue::from_bytes(&[0x66, 0xff, 0x6f]).unwrap());
        assert_eq!(headers_to_values(&map), Err(InvalidHeader("x-raw".into())));
    }
}
