mod common;

use common::{pet_service, API_KEY};
use http::Method;
use restpipe::input::Input;
use restpipe::params::Parameter;
use restpipe::pipeline::{Outcome, ResourceMethod};
use restpipe::response::Response;
use restpipe::server::Request;
use restpipe::validation::{RequiredParameters, ValidationError};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn create(body: &str) -> Request {
    Request::new(Method::POST, "/pets")
        .with_header("x-api-key", API_KEY)
        .with_header("Content-Type", "application/json")
        .with_body(body.to_string())
}

#[test]
fn test_body_schema_violation_is_422() {
    let svc = pet_service();
    let res = svc.handle(create(r#"{"id": "seven"}"#)).unwrap();
    assert_eq!(res.status, 422);
    let error = res.json_body().unwrap()["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("body:"), "{error}");
}

#[test]
fn test_undecodable_body_fails_validation() {
    let svc = pet_service();
    assert_eq!(svc.handle(create("{not json")).unwrap().status, 422);
}

#[test]
fn test_allowed_values() {
    let svc = pet_service();
    let ok = svc.handle(Request::new(Method::GET, "/pets?view=brief")).unwrap();
    assert_eq!(ok.status, 200);
    let bad = svc.handle(Request::new(Method::GET, "/pets?view=huge")).unwrap();
    assert_eq!(bad.status, 400);
    assert_eq!(
        bad.json_body(),
        Some(json!({ "error": "query.view: 'huge' is not an allowed value" }))
    );
}

#[test]
fn test_operation_not_run_after_validation_failure() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let method = ResourceMethod::builder(Method::GET)
        .parameter(Parameter::query("q").required())
        .validator(RequiredParameters, Response::new(400).with_error_body())
        .operation_fn(move |_input| {
            flag.store(true, Ordering::SeqCst);
            Ok(Outcome::ok_empty())
        })
        .build()
        .unwrap();
    let res = method.serve(&Request::new(Method::GET, "/search"), None);
    assert_eq!(res.status, 400);
    assert!(!ran.load(Ordering::SeqCst));
    assert_eq!(
        method.serve(&Request::new(Method::GET, "/search?q=rex"), None).status,
        200
    );
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn test_method_rule_runs_before_parameter_rules() {
    let method = ResourceMethod::builder(Method::GET)
        .parameter(Parameter::query("q").validate_fn(
            |_input: &Input<'_>| Err(ValidationError::new("parameter rule")),
            Response::new(409).with_error_body(),
        ))
        .validator_fn(
            |_input: &Input<'_>| Err(ValidationError::new("method rule")),
            Response::new(400).with_error_body(),
        )
        .operation_fn(|_input| Ok(Outcome::ok_empty()))
        .build()
        .unwrap();
    let res = method.serve(&Request::new(Method::GET, "/"), None);
    assert_eq!(res.status, 400);
    assert_eq!(res.json_body(), Some(json!({ "error": "method rule" })));
}
