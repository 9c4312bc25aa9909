//! End-to-end pipeline behavior through the service facade.

mod common;

use common::{pet_service, pet_store, rex};
use http::Method;
use restpipe::dispatcher::DispatchError;
use restpipe::pipeline::{Outcome, ResourceMethod};
use restpipe::response::Response;
use restpipe::server::Request;
use serde_json::json;

#[test]
fn test_success_response_carries_operation_body() {
    let _log = common::test_logging();
    let svc = pet_service();
    let res = svc.handle(Request::new(Method::GET, "/pets/1")).unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.get_header("content-type"), Some("application/json"));
    assert_eq!(res.json_body(), Some(rex()));
}

#[test]
fn test_soft_failure_uses_fail_response() {
    let svc = pet_service();
    let res = svc.handle(Request::new(Method::GET, "/pets/2")).unwrap();
    assert_eq!(res.status, 404);
    assert_eq!(res.json_body(), Some(json!({ "message": "no such pet" })));
}

#[test]
fn test_soft_failure_with_bodyless_fail_response() {
    let method = ResourceMethod::builder(Method::GET)
        .operation_fn(|_input| Ok(Outcome::fail()))
        .fail(Response::new(404))
        .build()
        .unwrap();
    let res = method.serve(&Request::new(Method::GET, "/pets/9"), None);
    assert_eq!(res.status, 404);
    assert!(res.body.is_empty());
    assert_eq!(res.get_header("content-type"), Some("application/json"));
}

#[test]
fn test_operation_error_is_generic_500() {
    let svc = pet_service();
    let res = svc.handle(Request::new(Method::GET, "/boom")).unwrap();
    assert_eq!(res.status, 500);
    assert_eq!(
        res.json_body(),
        Some(json!({ "error": "database unavailable" }))
    );
}

#[test]
fn test_request_id_is_echoed() {
    let svc = pet_service();
    let req = Request::new(Method::GET, "/pets/1");
    let id = req.request_id.to_string();
    let res = svc.handle(req).unwrap();
    assert_eq!(res.get_header("x-request-id"), Some(id.as_str()));
}

#[test]
fn test_missing_fail_response_is_reported_by_dispatcher() {
    let svc = pet_service();
    match svc.handle(Request::new(Method::GET, "/broken")) {
        Err(DispatchError::HandlerPanicked { message, .. }) => {
            assert!(message.contains("fail response not defined for GET /broken"));
        }
        other => panic!("expected a handler panic, got {other:?}"),
    }
}

#[test]
#[should_panic(expected = "fail response not defined")]
fn test_missing_fail_response_panics_when_served_directly() {
    let root = pet_store();
    let method = root
        .child("broken")
        .and_then(|r| r.method(&Method::GET))
        .unwrap();
    let _ = method.serve(&Request::new(Method::GET, "/broken"), None);
}

#[test]
fn test_handle_http_maps_panic_to_500() {
    let svc = pet_service();
    let req = http::Request::builder()
        .method("GET")
        .uri("/broken")
        .body(Vec::new())
        .unwrap();
    assert_eq!(svc.handle_http(req).status(), 500);
}

#[test]
fn test_unknown_routes() {
    let svc = pet_service();
    assert_eq!(svc.handle(Request::new(Method::GET, "/owners")).unwrap().status, 404);
    let res = svc.handle(Request::new(Method::PATCH, "/pets/1")).unwrap();
    assert_eq!(res.status, 405);
    let allow = res.get_header("allow").unwrap();
    assert!(allow.contains("GET") && allow.contains("DELETE"));
}
