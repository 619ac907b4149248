//! request body and its encoding
use crate::{
    error::{EncodeErr, Error},
    response::Headers,
};
use serde::Serialize;
use serde_json::{Map, Value};
use url::form_urlencoded;

pub const JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

///Payload of a request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    ///String or buffer, sent as given.
    Raw(Vec<u8>),
    ///Mapping of field names to values, encoded according to the content type.
    Fields(Map<String, Value>),
}

///Encoding selected by the `Content-Type` header of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    FormUrlEncoded,
    Unknown,
}

impl Encoding {
    ///Selects encoding from a `Content-Type` value. Parameters such as
    ///`charset` are ignored and the media type is matched case-insensitively.
    pub fn from_content_type(content_type: Option<&str>) -> Encoding {
        let essence = match content_type {
            Some(ct) => ct.split(';').next().unwrap_or("").trim(),
            None => return Encoding::Unknown,
        };

        if essence.eq_ignore_ascii_case(JSON) {
            Encoding::Json
        } else if essence.eq_ignore_ascii_case(FORM_URLENCODED) {
            Encoding::FormUrlEncoded
        } else {
            Encoding::Unknown
        }
    }

    pub fn from_headers(headers: &Headers) -> Encoding {
        Encoding::from_content_type(headers.get("Content-Type").map(String::as_str))
    }
}

impl Body {
    ///Creates a `Fields` body from any value serializing to a JSON object.
    pub fn fields<T: Serialize + ?Sized>(value: &T) -> Result<Body, Error> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Body::Fields(map)),
            _ => Err(EncodeErr::NotFields.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Raw(b) => b.is_empty(),
            Body::Fields(_) => false,
        }
    }

    ///Encodes this body into bytes to transmit.
    ///
    ///`Raw` and `Empty` bodies pass through unchanged whatever the content type.
    ///`Fields` are serialized as JSON or form-urlencoded; with any other
    ///content type they have no byte form and encoding fails.
    pub fn encode(&self, headers: &Headers) -> Result<Vec<u8>, EncodeErr> {
        match self {
            Body::Empty => Ok(Vec::new()),
            Body::Raw(b) => Ok(b.clone()),
            Body::Fields(map) => match Encoding::from_headers(headers) {
                Encoding::Json => Ok(serde_json::to_vec(map)?),
                Encoding::FormUrlEncoded => Ok(encode_form(map).into_bytes()),
                Encoding::Unknown => Err(EncodeErr::Unencodable(
                    headers.get("Content-Type").cloned(),
                )),
            },
        }
    }
}

///Serializes fields as `application/x-www-form-urlencoded`.
///
///Strings, numbers and booleans become their textual form, `null` and nested
///objects an empty value, and arrays repeat the key once per element.
pub fn encode_form(map: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    serializer.append_pair(key, &form_value(item));
                }
            }
            other => {
                serializer.append_pair(key, &form_value(other));
            }
        }
    }

    serializer.finish()
}

fn form_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Body {
        Body::Raw(s.as_bytes().to_vec())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Body {
        Body::Raw(s.into_bytes())
    }
}

impl From<&[u8]> for Body {
    fn from(b: &[u8]) -> Body {
        Body::Raw(b.to_vec())
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Body {
        Body::Raw(b)
    }
}

impl From<Map<String, Value>> for Body {
    fn from(map: Map<String, Value>) -> Body {
        Body::Fields(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Body
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Body {
        Body::Fields(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn headers_with(content_type: &str) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type", content_type);
        headers
    }

    #[test]
    fn encoding_from_content_type() {
        assert_eq!(Encoding::from_content_type(Some(JSON)), Encoding::Json);
        assert_eq!(
            Encoding::from_content_type(Some("Application/JSON; charset=utf-8")),
            Encoding::Json
        );
        assert_eq!(
            Encoding::from_content_type(Some(FORM_URLENCODED)),
            Encoding::FormUrlEncoded
        );
        assert_eq!(
            Encoding::from_content_type(Some("text/plain")),
            Encoding::Unknown
        );
        assert_eq!(Encoding::from_content_type(None), Encoding::Unknown);
    }

    #[test]
    fn encoding_from_headers_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("content-type", JSON);

        assert_eq!(Encoding::from_headers(&headers), Encoding::Json);
    }

    #[test]
    fn json_round_trip() {
        let body: Body = vec![
            ("name", json!("James Jay")),
            ("age", json!(31)),
            ("tags", json!(["a", "b"])),
            ("nested", json!({"x": null})),
        ]
        .into_iter()
        .collect();

        let encoded = body.encode(&headers_with(JSON)).unwrap();
        let decoded: Value = serde_json::from_slice(&encoded).unwrap();

        match body {
            Body::Fields(map) => assert_eq!(decoded, Value::Object(map)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn form_round_trip() {
        let body: Body = vec![
            ("name", json!("James Jay")),
            ("symbols", json!("a&b=c/d")),
            ("count", json!(7)),
            ("flag", json!(true)),
        ]
        .into_iter()
        .collect();

        let encoded = body.encode(&headers_with(FORM_URLENCODED)).unwrap();
        let mut decoded: Vec<(String, String)> = form_urlencoded::parse(&encoded)
            .into_owned()
            .collect();
        decoded.sort();

        assert_eq!(
            decoded,
            vec![
                ("count".to_string(), "7".to_string()),
                ("flag".to_string(), "true".to_string()),
                ("name".to_string(), "James Jay".to_string()),
                ("symbols".to_string(), "a&b=c/d".to_string()),
            ]
        );
    }

    #[test]
    fn form_arrays_and_nulls() {
        let body: Body = vec![("id", json!([1, 2]))].into_iter().collect();
        let encoded = body.encode(&headers_with(FORM_URLENCODED)).unwrap();
        assert_eq!(encoded, b"id=1&id=2");

        let body: Body = vec![("empty", Value::Null)].into_iter().collect();
        let encoded = body.encode(&headers_with(FORM_URLENCODED)).unwrap();
        assert_eq!(encoded, b"empty=");
    }

    #[test]
    fn raw_passes_through() {
        let raw = Body::from("field1=value1&field2=value2");

        for ct in [JSON, FORM_URLENCODED, "text/plain"] {
            assert_eq!(
                raw.encode(&headers_with(ct)).unwrap(),
                b"field1=value1&field2=value2"
            );
        }
        assert_eq!(
            raw.encode(&Headers::new()).unwrap(),
            b"field1=value1&field2=value2"
        );
    }

    #[test]
    fn empty_encodes_to_nothing() {
        assert!(Body::Empty.encode(&headers_with(JSON)).unwrap().is_empty());
        assert!(Body::default().is_empty());
    }

    #[test]
    fn fields_need_known_type() {
        let body: Body = vec![("a", json!(1))].into_iter().collect();

        assert!(matches!(
            body.encode(&Headers::new()),
            Err(EncodeErr::Unencodable(None))
        ));
        assert!(matches!(
            body.encode(&headers_with("text/plain")),
            Err(EncodeErr::Unencodable(Some(_)))
        ));
    }

    #[test]
    fn fields_from_serialize() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Login {
            user: String,
            remember: bool,
        }

        let login = Login {
            user: "foo".to_string(),
            remember: true,
        };
        let body = Body::fields(&login).unwrap();
        let encoded = body.encode(&headers_with(JSON)).unwrap();

        assert_eq!(serde_json::from_slice::<Login>(&encoded).unwrap(), login);
        assert!(matches!(
            Body::fields(&vec![1, 2, 3]),
            Err(Error::Encode(EncodeErr::NotFields))
        ));
    }
}
