//! HTML form bodies: `application/x-www-form-urlencoded` and
//! `multipart/form-data`.
//!
//! Both decode to a JSON object of text fields. A name sent once maps to a
//! string, a repeated name to an array in request order. The request model
//! keeps the individual fields and uploaded files (see
//! [`Request::get_form_field`](crate::server::Request::get_form_field)).

use super::codec::{CodecError, Decoder, Encoder};
use crate::server::UploadedFile;
use futures::executor::block_on;
use serde_json::{Map, Value};
use std::convert::Infallible;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Text fields and files of one multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<UploadedFile>,
}

fn fields_to_value<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Value {
    let mut object = Map::new();
    for (name, value) in fields {
        let value = Value::String(value.to_string());
        match object.get_mut(name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                object.insert(name.to_string(), value);
            }
        }
    }
    Value::Object(object)
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `application/x-www-form-urlencoded` via `url::form_urlencoded`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

impl Encoder for FormCodec {
    fn encode(&self, sink: &mut Vec<u8>, value: &Value) -> Result<(), CodecError> {
        let Value::Object(object) = value else {
            return Err(CodecError::Encode("form bodies must be objects".into()));
        };
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in object {
            match value {
                Value::Array(items) => {
                    for item in items {
                        serializer.append_pair(name, &scalar(item));
                    }
                }
                Value::Null => {}
                other => {
                    serializer.append_pair(name, &scalar(other));
                }
            }
        }
        sink.extend_from_slice(serializer.finish().as_bytes());
        Ok(())
    }
}

impl Decoder for FormCodec {
    fn decode(&self, source: &[u8]) -> Result<Value, CodecError> {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(source)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(fields_to_value(
            pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        ))
    }
}

/// `multipart/form-data` via `multer`. Decoding needs the boundary from the
/// `Content-Type` header, so only [`Decoder::decode_as`] succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipartCodec;

impl Decoder for MultipartCodec {
    fn decode(&self, _source: &[u8]) -> Result<Value, CodecError> {
        Err(CodecError::Decode("multipart body without a boundary".into()))
    }

    fn decode_as(&self, content_type: &str, source: &[u8]) -> Result<Value, CodecError> {
        let form = parse_multipart(content_type, source)?;
        Ok(fields_to_value(
            form.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        ))
    }
}

/// Split a multipart body into text fields and files.
///
/// A part with a file name, or whose bytes are not UTF-8, is a file.
pub fn parse_multipart(content_type: &str, source: &[u8]) -> Result<MultipartForm, CodecError> {
    let boundary =
        multer::parse_boundary(content_type).map_err(|e| CodecError::Decode(e.to_string()))?;
    let body = source.to_vec();
    let stream = futures::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    block_on(async {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| CodecError::Decode(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let part_type = field.content_type().map(ToString::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| CodecError::Decode(e.to_string()))?
                .to_vec();
            match (file_name, String::from_utf8(data)) {
                (None, Ok(text)) => form.fields.push((name, text)),
                (file_name, data) => {
                    let data = data.map_or_else(|e| e.into_bytes(), String::into_bytes);
                    let mut file = UploadedFile::new(name, data);
                    file.file_name = file_name;
                    file.content_type = part_type;
                    form.files.push(file);
                }
            }
        }
        Ok::<_, CodecError>(form)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BOUNDARY_TYPE: &str = "multipart/form-data; boundary=X-PET";

    fn multipart_body() -> Vec<u8> {
        [
            "--X-PET\r\n",
            "Content-Disposition: form-data; name=\"name\"\r\n\r\n",
            "Rex\r\n",
            "--X-PET\r\n",
            "Content-Disposition: form-data; name=\"avatar\"; filename=\"rex.png\"\r\n",
            "Content-Type: image/png\r\n\r\n",
            "PNGDATA\r\n",
            "--X-PET--\r\n",
        ]
        .concat()
        .into_bytes()
    }

    #[test]
    fn test_form_decode_groups_repeated_names() {
        let value = FormCodec.decode(b"name=Rex&tag=dog&tag=good+boy").unwrap();
        assert_eq!(value, json!({"name": "Rex", "tag": ["dog", "good boy"]}));
    }

    #[test]
    fn test_form_encode() {
        let mut buf = Vec::new();
        FormCodec
            .encode(&mut buf, &json!({"name": "Rex Jr", "tag": ["a", "b"]}))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "name=Rex+Jr&tag=a&tag=b");
        assert!(FormCodec.encode(&mut Vec::new(), &json!([1])).is_err());
    }

    #[test]
    fn test_multipart_splits_fields_and_files() {
        let form = parse_multipart(BOUNDARY_TYPE, &multipart_body()).unwrap();
        assert_eq!(form.fields, vec![("name".to_string(), "Rex".to_string())]);
        assert_eq!(form.files.len(), 1);
        let file = &form.files[0];
        assert_eq!(file.field, "avatar");
        assert_eq!(file.file_name.as_deref(), Some("rex.png"));
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert_eq!(file.data, b"PNGDATA");
    }

    #[test]
    fn test_multipart_needs_boundary() {
        assert!(MultipartCodec.decode(&multipart_body()).is_err());
        assert!(parse_multipart(MULTIPART_FORM_DATA, &multipart_body()).is_err());
        assert_eq!(
            MultipartCodec
                .decode_as(BOUNDARY_TYPE, &multipart_body())
                .unwrap(),
            json!({"name": "Rex"})
        );
    }
}
