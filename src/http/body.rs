//! Body dispatch by content-type (spec §4.3 "body dispatch").

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::binary::BinaryData;
use crate::error::{MapRuntimeError, PerformError, Result};
use crate::value::Variable;

/// The dispatched request body, ready for the fetch adapter.
#[derive(Clone)]
pub enum FetchBody {
    Json(String),
    FormUrlEncoded(String),
    Multipart(Vec<MultipartPart>),
    Binary(Arc<BinaryData>),
    Raw(Bytes),
    Text(String),
}

#[derive(Clone)]
pub enum MultipartPart {
    Field { name: String, value: String },
    File { name: String, data: Arc<BinaryData> },
}

fn is_binary_mime(content_type: &str) -> bool {
    let base = content_type.split(';').next().unwrap_or("").trim();
    base.starts_with("image/")
        || base.starts_with("audio/")
        || base.starts_with("video/")
        || base == "application/octet-stream"
}

/// Dispatch `body` according to `content_type` (spec §4.3): JSON, form
/// urlencoded, multipart, binary MIME types, or stringified fallback. A
/// present content-type with an absent body, or an absent content-type with
/// a present body, is an error.
pub fn dispatch_body(content_type: Option<&str>, body: &Variable) -> Result<Option<FetchBody>> {
    match (content_type, body.is_none()) {
        (None, true) => return Ok(None),
        (None, false) => {
            return Err(MapRuntimeError::Perform(PerformError::interpreter(
                "request body present without a content-type header",
                Default::default(),
            )))
        }
        (Some(_), true) => return Ok(None),
        (Some(_), false) => {}
    }
    let content_type = content_type.unwrap();
    let base = content_type.split(';').next().unwrap_or("").trim();

    if base == "application/json" {
        let json: serde_json::Value = body.clone().into();
        return Ok(Some(FetchBody::Json(serde_json::to_string(&json)?)));
    }

    if base == "application/x-www-form-urlencoded" {
        let map = body.as_object().ok_or_else(|| {
            MapRuntimeError::Perform(PerformError::interpreter(
                "x-www-form-urlencoded body must be an object",
                Default::default(),
            ))
        })?;
        let mut pairs = Vec::new();
        for (k, v) in map {
            for s in v.to_http_strings()? {
                pairs.push(format!(
                    "{}={}",
                    urlencoding::encode(k),
                    urlencoding::encode(&s)
                ));
            }
        }
        return Ok(Some(FetchBody::FormUrlEncoded(pairs.join("&"))));
    }

    if base == "multipart/form-data" {
        let map = body.as_object().ok_or_else(|| {
            MapRuntimeError::Perform(PerformError::interpreter(
                "multipart/form-data body must be an object",
                Default::default(),
            ))
        })?;
        let mut parts = Vec::new();
        for (k, v) in map {
            match v {
                Variable::Binary(data) => parts.push(MultipartPart::File {
                    name: k.clone(),
                    data: data.clone(),
                }),
                other => parts.push(MultipartPart::Field {
                    name: k.clone(),
                    value: other.to_http_string()?,
                }),
            }
        }
        return Ok(Some(FetchBody::Multipart(parts)));
    }

    if is_binary_mime(base) {
        return match body {
            Variable::Binary(data) => Ok(Some(FetchBody::Binary(data.clone()))),
            // spec §4.3: "Any binary MIME ... -> Binary handle or raw
            // buffer; non-binary values are stringified."
            other => Ok(Some(FetchBody::Text(other.to_http_string()?))),
        };
    }

    // Fallback: stringify whatever was given (spec §4.3 "non-binary stringified").
    Ok(Some(FetchBody::Text(body.to_http_string()?)))
}

/// Build a flat query-parameter list from an object, repeating keys for
/// array values (spec §4.3, shared with URL query assembly).
pub fn flatten_query_parameters(params: &BTreeMap<String, Variable>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for (k, v) in params {
        for s in v.to_http_strings()? {
            out.push((k.clone(), s));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: impl IntoIterator<Item = (&'static str, Variable)>) -> Variable {
        Variable::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[test]
    fn json_body_is_stringified() {
        let body = obj([("a", Variable::Number(1.0))]);
        let dispatched = dispatch_body(Some("application/json"), &body).unwrap().unwrap();
        match dispatched {
            FetchBody::Json(s) => {
                let parsed: serde_json::Value = serde_json::from_str(&s).unwrap();
                assert_eq!(parsed, serde_json::json!({"a": 1.0}));
            }
            _ => panic!("expected json"),
        }
    }

    #[test]
    fn form_urlencoded_coerces_and_joins() {
        let body = obj([("name", Variable::string("a b"))]);
        let dispatched = dispatch_body(Some("application/x-www-form-urlencoded"), &body)
            .unwrap()
            .unwrap();
        match dispatched {
            FetchBody::FormUrlEncoded(s) => assert_eq!(s, "name=a%20b"),
            _ => panic!("expected form body"),
        }
    }

    #[test]
    fn absent_content_type_with_body_is_error() {
        let body = obj([("a", Variable::Number(1.0))]);
        assert!(dispatch_body(None, &body).is_err());
    }

    #[test]
    fn content_type_with_absent_body_is_none() {
        let result = dispatch_body(Some("application/json"), &Variable::Null).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn binary_mime_stringifies_a_non_binary_value() {
        let dispatched = dispatch_body(Some("application/octet-stream"), &Variable::string("raw"))
            .unwrap()
            .unwrap();
        match dispatched {
            FetchBody::Text(s) => assert_eq!(s, "raw"),
            _ => panic!("expected stringified fallback"),
        }
    }

    #[test]
    fn binary_mime_with_a_binary_value_is_carried_as_binary() {
        let data = Arc::new(BinaryData::from_bytes(Bytes::from_static(b"abc"), None, None));
        let dispatched = dispatch_body(Some("application/octet-stream"), &Variable::Binary(data))
            .unwrap()
            .unwrap();
        assert!(matches!(dispatched, FetchBody::Binary(_)));
    }

    #[test]
    fn unknown_content_type_falls_back_to_stringify() {
        let dispatched = dispatch_body(Some("text/plain"), &Variable::string("hi"))
            .unwrap()
            .unwrap();
        match dispatched {
            FetchBody::Text(s) => assert_eq!(s, "hi"),
            _ => panic!("expected text fallback"),
        }
    }
}
