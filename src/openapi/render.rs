use super::describe::{json_schema, TypeDescriptor};
use crate::content::{FORM_URLENCODED, MULTIPART_FORM_DATA};
use crate::params::{ParamKind, Parameter};
use crate::pipeline::ResourceMethod;
use crate::resource::Resource;
use crate::response::{Response, ResponseBody};
use crate::security::{SchemeKind, SecurityScheme};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

pub const OPENAPI_VERSION: &str = "3.1.0";

/// The `info` block of a rendered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Default for DocInfo {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            version: "0.1.0".to_string(),
            description: None,
        }
    }
}

/// Render the OpenAPI 3.1 document of a resource tree.
#[must_use]
pub fn render(root: &Resource, info: &DocInfo) -> Value {
    let mut paths = Map::new();
    let mut schemes = Map::new();

    for (path, method) in root.routes() {
        for scheme in method.security().schemes() {
            schemes
                .entry(scheme.name.clone())
                .or_insert_with(|| security_scheme(scheme));
        }
        let item = paths
            .entry(path)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(item) = item {
            item.insert(
                method.method().as_str().to_lowercase(),
                operation(method),
            );
        }
    }

    let mut info_obj = Map::new();
    info_obj.insert("title".into(), json!(info.title));
    info_obj.insert("version".into(), json!(info.version));
    if let Some(description) = &info.description {
        info_obj.insert("description".into(), json!(description));
    }

    let mut doc = Map::new();
    doc.insert("openapi".into(), json!(OPENAPI_VERSION));
    doc.insert("info".into(), Value::Object(info_obj));
    debug!(paths = paths.len(), schemes = schemes.len(), "OpenAPI document rendered");
    doc.insert("paths".into(), Value::Object(paths));
    if !schemes.is_empty() {
        doc.insert("components".into(), json!({ "securitySchemes": schemes }));
    }
    Value::Object(doc)
}

fn operation(method: &ResourceMethod) -> Value {
    let mut op = Map::new();
    if let Some(summary) = method.summary() {
        op.insert("summary".into(), json!(summary));
    }
    if let Some(description) = method.description() {
        op.insert("description".into(), json!(description));
    }
    if let Some(id) = method.operation_id() {
        op.insert("operationId".into(), json!(id));
    }
    if !method.tags().is_empty() {
        op.insert("tags".into(), json!(method.tags()));
    }

    // Credentials are documented by the security schemes, not as parameters.
    let credentials: Vec<Parameter> = method
        .security()
        .schemes()
        .flat_map(|s| s.authenticator.parameters())
        .collect();
    let parameters: Vec<Value> = method
        .parameters()
        .iter()
        .filter(|p| {
            !credentials
                .iter()
                .any(|c| c.kind == p.kind && c.name.eq_ignore_ascii_case(&p.name))
        })
        .filter_map(parameter)
        .collect();
    if !parameters.is_empty() {
        op.insert("parameters".into(), Value::Array(parameters));
    }

    if let Some(body) = request_body(method) {
        op.insert("requestBody".into(), body);
    }

    op.insert("responses".into(), responses(method));

    let security: Vec<Value> = method
        .security()
        .schemes()
        .map(|s| json!({ s.name.clone(): s.authenticator.scopes() }))
        .collect();
    if !security.is_empty() {
        op.insert("security".into(), Value::Array(security));
    }
    Value::Object(op)
}

fn with_allowed_values(mut schema: Value, param: &Parameter) -> Value {
    if let (Some(values), Value::Object(obj)) = (&param.allowed_values, &mut schema) {
        obj.insert("enum".into(), Value::Array(values.clone()));
    }
    schema
}

fn parameter(param: &Parameter) -> Option<Value> {
    let location = param.kind.openapi_location()?;
    let mut obj = Map::new();
    obj.insert("name".into(), json!(param.name));
    obj.insert("in".into(), json!(location));
    // Path parameters are always required in OpenAPI.
    obj.insert(
        "required".into(),
        json!(param.required || param.kind == ParamKind::Uri),
    );
    if let Some(description) = &param.description {
        obj.insert("description".into(), json!(description));
    }
    obj.insert(
        "schema".into(),
        with_allowed_values(json_schema(&param.ty), param),
    );
    Some(Value::Object(obj))
}

fn request_body(method: &ResourceMethod) -> Option<Value> {
    if let Some(body) = method.request_body() {
        let schema = json_schema(&body.ty);
        let content: Map<String, Value> = method
            .content_types()
            .decoder_types()
            .map(|ty| (ty.to_string(), json!({ "schema": schema })))
            .collect();
        let mut obj = Map::new();
        if let Some(description) = &body.description {
            obj.insert("description".into(), json!(description));
        }
        obj.insert("required".into(), json!(body.required));
        obj.insert("content".into(), Value::Object(content));
        return Some(Value::Object(obj));
    }

    let fields: Vec<&Parameter> = method
        .parameters()
        .iter()
        .filter(|p| matches!(p.kind, ParamKind::Form | ParamKind::File))
        .collect();
    if fields.is_empty() {
        return None;
    }
    let media_type = if fields.iter().any(|p| p.kind == ParamKind::File) {
        MULTIPART_FORM_DATA
    } else {
        FORM_URLENCODED
    };
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in &fields {
        properties.insert(
            field.name.clone(),
            with_allowed_values(json_schema(&field.ty), field),
        );
        if field.required {
            required.push(field.name.clone());
        }
    }
    let any_required = !required.is_empty();
    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if any_required {
        schema.insert("required".into(), json!(required));
    }
    Some(json!({
        "required": any_required,
        "content": { media_type: { "schema": schema } },
    }))
}

fn responses(method: &ResourceMethod) -> Value {
    let mut out = Map::new();
    let encoders: Vec<&str> = method.content_types().encoder_types().collect();
    let mut add = |response: &Response| {
        out.entry(response.status().to_string())
            .or_insert_with(|| response_object(response, &encoders));
    };

    add(method.success_response());
    if let Some(fail) = method.fail_response() {
        add(fail);
    }
    for scheme in method.security().schemes() {
        add(&scheme.authentication_failure);
        add(&scheme.authorization_failure);
    }
    for response in method.validation().responses() {
        add(response);
    }
    add(method.content_types().unsupported_response());
    add(&Response::internal_error());
    Value::Object(out)
}

fn response_object(response: &Response, encoders: &[&str]) -> Value {
    let mut obj = Map::new();
    obj.insert("description".into(), json!(response.description));
    let schema = match (&response.schema, &response.body) {
        (Some(ty), _) => Some(json_schema(ty)),
        (None, ResponseBody::Empty) => None,
        (None, _) => Some(json_schema(&TypeDescriptor::Any)),
    };
    if let Some(schema) = schema {
        let content: Map<String, Value> = encoders
            .iter()
            .map(|ty| ((*ty).to_string(), json!({ "schema": schema })))
            .collect();
        obj.insert("content".into(), Value::Object(content));
    }
    Value::Object(obj)
}

fn security_scheme(scheme: &SecurityScheme) -> Value {
    match &scheme.kind {
        SchemeKind::ApiKey { location, name } => {
            json!({ "type": "apiKey", "in": location.as_str(), "name": name })
        }
        SchemeKind::HttpBearer { bearer_format } => match bearer_format {
            Some(format) => json!({ "type": "http", "scheme": "bearer", "bearerFormat": format }),
            None => json!({ "type": "http", "scheme": "bearer" }),
        },
        SchemeKind::HttpBasic => json!({ "type": "http", "scheme": "basic" }),
        // Documented as an HTTP scheme named after the security scheme itself.
        SchemeKind::Custom { description } => {
            let mut obj = Map::new();
            obj.insert("type".into(), json!("http"));
            obj.insert("scheme".into(), json!(scheme.name));
            if let Some(description) = description {
                obj.insert("description".into(), json!(description));
            }
            Value::Object(obj)
        }
    }
}
