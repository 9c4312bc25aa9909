use crate::content::{parse_multipart, FORM_URLENCODED, MULTIPART_FORM_DATA};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum inline headers/cookies before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Maximum inline path/query/form parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Header and cookie storage. Names are `Arc<str>` so repeated names clone in O(1).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Path, query and form parameter storage.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A file uploaded as part of a form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was submitted under
    pub field: String,
    /// Client-side file name, if sent
    pub file_name: Option<String>,
    /// Declared media type of the part, if sent
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(field: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            field: field.into(),
            file_name: None,
            content_type: None,
            data: data.into(),
        }
    }

    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// The raw inbound request as seen by a method pipeline.
///
/// Server adapters fill this in (see [`Request::from_http`]); the router
/// stores matched path segments in `path_params` before dispatch. User
/// operations never read it directly, they go through [`crate::input::Input`].
#[derive(Debug, Clone)]
pub struct Request {
    pub request_id: RequestId,
    pub method: Method,
    /// Path without the query string
    pub path: String,
    pub headers: HeaderVec,
    pub cookies: HeaderVec,
    pub query_params: ParamVec,
    /// Segments captured by the router
    pub path_params: ParamVec,
    pub form_fields: ParamVec,
    pub files: Vec<UploadedFile>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Create a request. A query string in `target` is split off and parsed.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query_params) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query_params(query)),
            None => (target.to_string(), ParamVec::new()),
        };
        Self {
            request_id: RequestId::new(),
            method,
            path,
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            query_params,
            path_params: ParamVec::new(),
            form_fields: ParamVec::new(),
            files: Vec::new(),
            body: None,
        }
    }

    /// Convert an `http` request. Headers, cookies, the query string and
    /// form bodies (url-encoded or multipart) are parsed; the raw bytes are
    /// kept either way.
    #[must_use]
    pub fn from_http(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        let mut request = Request::new(parts.method, &target);
        for (name, value) in &parts.headers {
            match value.to_str() {
                Ok(v) => request.push_header(name.as_str(), v),
                Err(_) => debug!(header = %name, "Skipping non-UTF-8 header value"),
            }
        }
        request.request_id = RequestId::from_header_or_new(request.get_header(REQUEST_ID_HEADER));
        if !body.is_empty() {
            request.body = Some(body);
            request.parse_form_body();
        }
        request
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.push_header(name, &value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self.parse_form_body();
        self
    }

    #[must_use]
    pub fn with_form_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.form_fields.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    #[must_use]
    pub fn with_path_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.path_params.push((Arc::from(name), value.into()));
        self
    }

    fn push_header(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if name == "cookie" {
            self.cookies.extend(parse_cookies(value));
        }
        self.headers.push((Arc::from(name.as_str()), value.to_string()));
    }

    fn parse_form_body(&mut self) {
        let Some(content_type) = self.get_header("content-type").map(str::to_string) else {
            return;
        };
        let Some(body) = &self.body else {
            return;
        };
        let media = content_type.split(';').next().unwrap_or_default().trim();
        if media.eq_ignore_ascii_case(FORM_URLENCODED) {
            let fields: ParamVec = url::form_urlencoded::parse(body)
                .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
                .collect();
            self.form_fields.extend(fields);
        } else if media.eq_ignore_ascii_case(MULTIPART_FORM_DATA) {
            match parse_multipart(&content_type, body) {
                Ok(form) => {
                    self.form_fields
                        .extend(form.fields.into_iter().map(|(k, v)| (Arc::from(k.as_str()), v)));
                    self.files.extend(form.files);
                }
                Err(e) => warn!(request_id = %self.request_id, error = %e, "Malformed multipart body"),
            }
        }
    }

    /// A request carries a body when it has at least one byte of payload.
    #[inline]
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different path depths, returns the deepest one.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        last_value(&self.path_params, name)
    }

    /// Get a query parameter by name (last occurrence wins).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        last_value(&self.query_params, name)
    }

    /// All values of a repeated query parameter, in request order.
    #[must_use]
    pub fn get_query_params(&self, name: &str) -> Vec<&str> {
        all_values(&self.query_params, name)
    }

    #[inline]
    #[must_use]
    pub fn get_form_field(&self, name: &str) -> Option<&str> {
        last_value(&self.form_fields, name)
    }

    #[must_use]
    pub fn get_form_fields(&self, name: &str) -> Vec<&str> {
        all_values(&self.form_fields, name)
    }

    #[must_use]
    pub fn get_file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }

    #[must_use]
    pub fn get_files(&self, field: &str) -> Vec<&UploadedFile> {
        self.files.iter().filter(|f| f.field == field).collect()
    }
}

fn last_value<'a>(params: &'a ParamVec, name: &str) -> Option<&'a str> {
    params
        .iter()
        .rfind(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.as_str())
}

fn all_values<'a>(params: &'a ParamVec, name: &str) -> Vec<&'a str> {
    params
        .iter()
        .filter(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.as_str())
        .collect()
}

/// Parse a `Cookie` header value into name/value pairs.
#[must_use]
pub fn parse_cookies(header: &str) -> HeaderVec {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().to_string();
            Some((Arc::from(name), value))
        })
        .collect()
}

/// Parse a query string (without the leading `?`), URL-decoding names and values.
#[must_use]
pub fn parse_query_params(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}
