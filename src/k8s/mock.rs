//! In-memory API server for unit tests
//!
//! A `kube::Client` over a `tower_test` mock service. Every request is
//! recorded as `"<METHOD> <path>"` and answered by a responder closure.

use std::sync::{Arc, Mutex};

use http::{Method, Request, Response, StatusCode};
use hyper::Body;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use super::K8sClient;

pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Client whose requests are answered by `respond(method, path, body)`
pub fn mock_client<F>(name: &str, mut respond: F) -> (K8sClient, RequestLog, JoinHandle<()>)
where
    F: FnMut(&Method, &str, &[u8]) -> Response<Body> + Send + 'static,
{
    let (service, mut handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
    let client = kube::Client::new(service, "default");
    let log = RequestLog::default();

    let recorded = log.clone();
    let server = tokio::spawn(async move {
        while let Some((request, send)) = handle.next_request().await {
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let body = hyper::body::to_bytes(request.into_body())
                .await
                .unwrap_or_default();

            recorded.lock().unwrap().push(format!("{method} {path}"));
            send.send_response(respond(&method, path.as_str(), &body[..]));
        }
    });

    (K8sClient::from_client(client, name), log, server)
}

pub fn json_response(code: u16, value: &Value) -> Response<Body> {
    Response::builder()
        .status(StatusCode::from_u16(code).unwrap())
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(value).unwrap()))
        .unwrap()
}

/// `metav1.Status` failure, as the API server returns for 404/409
pub fn status_response(code: u16, reason: &str, message: &str) -> Response<Body> {
    json_response(
        code,
        &json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": message,
            "reason": reason,
            "code": code,
        }),
    )
}

/// Success status, as returned by a delete
pub fn deleted_response() -> Response<Body> {
    json_response(
        200,
        &json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Success",
            "code": 200,
        }),
    )
}

/// Answer a create with the object that was posted
pub fn echo_response(body: &[u8]) -> Response<Body> {
    Response::builder()
        .status(StatusCode::CREATED)
        .header("content-type", "application/json")
        .body(Body::from(body.to_vec()))
        .unwrap()
}

/// A Running pod with an IP
pub fn running_pod(name: &str, namespace: &str, ip: &str) -> Response<Body> {
    json_response(
        200,
        &json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": name, "namespace": namespace},
            "status": {"phase": "Running", "podIP": ip},
        }),
    )
}

pub fn requests(log: &RequestLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
