#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use http::Method;
use restpipe::content::{ContentTypeRegistry, JsonCodec, YamlCodec, APPLICATION_JSON, APPLICATION_YAML};
use restpipe::openapi::{FieldDescriptor, TypeDescriptor};
use restpipe::params::Parameter;
use restpipe::pipeline::{Outcome, ResourceMethod};
use restpipe::resource::Resource;
use restpipe::response::Response;
use restpipe::runtime_config::RuntimeConfig;
use restpipe::security::{ApiKeyAuthenticator, BearerJwtAuthenticator, SecurityScheme};
use restpipe::server::{Request, Service};
use restpipe::validation::SchemaValidator;
use serde_json::{json, Value};
use std::sync::Once;

pub const API_KEY: &str = "test-key";
pub const JWT_SIGNATURE: &str = "sig";

static MAY_INIT: Once = Once::new();

/// Configure the `may` runtime once per test binary.
pub fn setup_may_runtime() {
    MAY_INIT.call_once(|| {
        may::config().set_stack_size(0x8000);
    });
}

/// Route log output through the test harness for the current thread.
pub fn test_logging() -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter("restpipe=debug")
        .with_test_writer()
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// A `header.payload.signature` token accepted by the pet store's JWT scheme.
pub fn jwt(scope: &str) -> String {
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(json!({ "scope": scope }).to_string());
    format!("e30.{payload}.{JWT_SIGNATURE}")
}

pub fn with_bearer(req: Request, token: &str) -> Request {
    req.with_header("Authorization", format!("Bearer {token}"))
}

pub fn json_and_yaml() -> ContentTypeRegistry {
    let mut registry = ContentTypeRegistry::new();
    registry.register(APPLICATION_JSON, JsonCodec, true);
    registry.register(APPLICATION_YAML, YamlCodec, false);
    registry
}

pub fn pet_type() -> TypeDescriptor {
    TypeDescriptor::object("Pet")
        .field(FieldDescriptor::new("id", TypeDescriptor::integer()).required())
        .field(
            FieldDescriptor::new("pet_name", TypeDescriptor::string())
                .tagged("name")
                .required(),
        )
        .field(FieldDescriptor::new("tag", TypeDescriptor::string()))
}

pub fn rex() -> Value {
    json!({ "id": 1, "name": "Rex", "tag": "dog" })
}

fn api_key_scheme() -> SecurityScheme {
    SecurityScheme::api_key("apiKey", ApiKeyAuthenticator::header("x-api-key", [API_KEY]))
}

fn jwt_scheme(scope: &str) -> SecurityScheme {
    SecurityScheme::bearer(
        "bearerAuth",
        BearerJwtAuthenticator::new(JWT_SIGNATURE).scopes([scope]),
    )
}

/// The pet store tree:
///
/// - `GET /pets` lists pets, optional `limit` and `view` (`full`/`brief`)
/// - `POST /pets` creates a pet; api key or a token with `pets:write`
/// - `GET /pets/{petId}` finds pet 1, otherwise 404
/// - `DELETE /pets/{petId}` needs a token with `admin`
/// - `GET /broken` soft-fails without a fail response
/// - `GET /boom` returns an operation error
pub fn pet_store() -> Resource {
    let list = ResourceMethod::builder(Method::GET)
        .operation_id("listPets")
        .content_types(json_and_yaml())
        .parameter(Parameter::query("limit").with_type(TypeDescriptor::integer()))
        .parameter(
            Parameter::query("view").with_allowed_values(vec![json!("full"), json!("brief")]),
        )
        .validator(
            restpipe::validation::AllowedValues,
            Response::new(400).with_error_body(),
        )
        .operation_fn(|input| {
            let limit: usize = input.query("limit")?.unwrap_or("10").parse()?;
            let pets: Vec<Value> = vec![rex()].into_iter().take(limit).collect();
            Ok(Outcome::ok(Value::Array(pets)))
        })
        .build()
        .unwrap();

    let create = ResourceMethod::builder(Method::POST)
        .operation_id("createPet")
        .content_types(json_and_yaml())
        .request_body(
            Parameter::body(pet_type()).required().validate_with(
                SchemaValidator::for_type(&pet_type()).unwrap(),
                Response::new(422).with_error_body(),
            ),
        )
        .security(api_key_scheme())
        .security(jwt_scheme("pets:write"))
        .operation_fn(|input| {
            let pet = input.body_value()?.clone();
            Ok(Outcome::ok(pet))
        })
        .success(Response::new(201).with_operation_body())
        .build()
        .unwrap();

    let get = ResourceMethod::builder(Method::GET)
        .operation_id("getPet")
        .parameter(Parameter::uri("petId").with_type(TypeDescriptor::integer()))
        .operation_fn(|input| match input.uri_param("petId")?.as_deref() {
            Some("1") => Ok(Outcome::ok(rex())),
            _ => Ok(Outcome::fail_with(json!({ "message": "no such pet" }))),
        })
        .fail(Response::new(404).with_operation_body())
        .build()
        .unwrap();

    let delete = ResourceMethod::builder(Method::DELETE)
        .operation_id("deletePet")
        .parameter(Parameter::uri("petId"))
        .security(jwt_scheme("admin"))
        .operation_fn(|_input| Ok(Outcome::ok_empty()))
        .success(Response::new(204))
        .build()
        .unwrap();

    let broken = ResourceMethod::builder(Method::GET)
        .operation_fn(|_input| Ok(Outcome::fail()))
        .build()
        .unwrap();

    let boom = ResourceMethod::builder(Method::GET)
        .operation_fn(|_input| Err(anyhow::anyhow!("database unavailable")))
        .build()
        .unwrap();

    let mut pet = Resource::new("{petId}").unwrap();
    pet.add_method(get);
    pet.add_method(delete);
    let mut pets = Resource::new("pets").unwrap();
    pets.add_method(list);
    pets.add_method(create);
    pets.add_child(pet);
    let mut broken_res = Resource::new("broken").unwrap();
    broken_res.add_method(broken);
    let mut boom_res = Resource::new("boom").unwrap();
    boom_res.add_method(boom);

    let mut root = Resource::root();
    root.add_child(pets);
    root.add_child(broken_res);
    root.add_child(boom_res);
    root
}

pub fn pet_service() -> Service {
    setup_may_runtime();
    Service::new(&pet_store(), &RuntimeConfig::default()).unwrap()
}
