//! Body encoding and decoding.

use serde::de::{self, DeserializeOwned, Deserializer, Visitor, value::Error as ValueError};
use serde::{Serialize, forward_to_deserialize_any};

use crate::{ClientError, Result};

/// Content type of JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Content type of raw XML request bodies.
pub const XML_CONTENT_TYPE: &str = "text/xml";
/// Content type of form posts.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// Content type of uploaded file parts.
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// Hands the raw body to targets that ask for a string and rejects the rest.
struct RawText<'a>(&'a str);

impl<'de> Deserializer<'de> for RawText<'_> {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(
        self,
        _visitor: V,
    ) -> std::result::Result<V::Value, ValueError> {
        Err(de::Error::custom("target does not take plain text"))
    }

    fn deserialize_str<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> std::result::Result<V::Value, ValueError> {
        visitor.visit_str(self.0)
    }

    fn deserialize_string<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> std::result::Result<V::Value, ValueError> {
        visitor.visit_str(self.0)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char bytes byte_buf
        option unit unit_struct newtype_struct seq tuple tuple_struct map struct
        enum identifier ignored_any
    }
}

/// Decode a response body into `T`.
///
/// String targets (`String`, `Box<str>`) receive the raw text untouched, JSON
/// string literals included. Everything else is read as JSON. A blank body
/// that is not JSON decodes to `None`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<Option<T>> {
    if let Ok(value) = T::deserialize(RawText(text)) {
        return Ok(Some(value));
    }

    match serde_json::from_str(text) {
        Ok(value) => Ok(Some(value)),
        Err(_) if text.trim().is_empty() => Ok(None),
        Err(e) => Err(ClientError::Decode(e.to_string())),
    }
}

/// Encode a value as a JSON request body.
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ClientError::Encode(e.to_string()))
}

/// Encode key/value pairs as an URL-encoded form, keeping their order.
pub fn encode_form<K, V>(pairs: &[(K, V)]) -> Result<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let pairs: Vec<(&str, &str)> = pairs
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .collect();
    serde_urlencoded::to_string(pairs).map_err(|e| ClientError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        answer: String,
    }

    #[test]
    fn test_decode_json_struct() {
        let answer: Option<Answer> = decode(r#"{"answer":"Trance Music"}"#).unwrap();
        assert_eq!(answer.unwrap().answer, "Trance Music");
    }

    #[test]
    fn test_decode_string_keeps_raw_text() {
        let text: Option<String> = decode(r#"{"answer":"Trance Music"}"#).unwrap();
        assert_eq!(text.as_deref(), Some(r#"{"answer":"Trance Music"}"#));

        let text: Option<String> = decode("plain text").unwrap();
        assert_eq!(text.as_deref(), Some("plain text"));

        let text: Option<String> = decode("42").unwrap();
        assert_eq!(text.as_deref(), Some("42"));
    }

    #[test]
    fn test_decode_string_keeps_json_string_literal() {
        let text: Option<String> = decode(r#""Trance Music""#).unwrap();
        assert_eq!(text.as_deref(), Some(r#""Trance Music""#));

        let text: Option<String> = decode("  \"x\"\n").unwrap();
        assert_eq!(text.as_deref(), Some("  \"x\"\n"));
    }

    #[test]
    fn test_decode_unit_enum_from_json() {
        #[derive(Debug, Deserialize, PartialEq)]
        enum Genre {
            Trance,
        }

        let genre: Option<Genre> = decode(r#""Trance""#).unwrap();
        assert_eq!(genre, Some(Genre::Trance));
    }

    #[test]
    fn test_decode_primitives() {
        let number: Option<i64> = decode("42").unwrap();
        assert_eq!(number, Some(42));

        let flag: Option<bool> = decode("true").unwrap();
        assert_eq!(flag, Some(true));
    }

    #[test]
    fn test_decode_json_value() {
        let value: Option<serde_json::Value> = decode(r#"{"a":1}"#).unwrap();
        assert_eq!(value.unwrap()["a"], 1);
    }

    #[test]
    fn test_decode_blank_body() {
        let answer: Option<Answer> = decode("  ").unwrap();
        assert!(answer.is_none());
    }

    #[test]
    fn test_decode_failure() {
        let err = decode::<Answer>("<html>").unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_encode_form_keeps_order() {
        let body = encode_form(&[("b", "2"), ("a", "x y")]).unwrap();
        assert_eq!(body, "b=2&a=x+y");
    }

    #[test]
    fn test_encode_json() {
        let body = encode_json(&serde_json::json!({"data": 1})).unwrap();
        assert_eq!(body, r#"{"data":1}"#);
    }

    #[test]
    fn test_encode_failure_is_caller_error() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(vec![1u8], 1);
        let err = encode_json(&map).unwrap_err();
        assert!(matches!(err, ClientError::Encode(_)));
        assert!(err.is_configuration());
    }
}
