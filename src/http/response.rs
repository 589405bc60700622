//! HTTP response building module
//!
//! Provides builders for the watchdog's responses, decoupled from request handling.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, SERVER};
use hyper::{Response, StatusCode};

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// Build a JSON response from an already serialized body
pub fn build_json_response(
    status: StatusCode,
    body: Vec<u8>,
    server_name: &str,
) -> Response<Full<Bytes>> {
    let mut resp = build_response(status, CONTENT_TYPE_JSON, Bytes::from(body));
    set_server_header(&mut resp, server_name);
    resp
}

/// Build 404 Not Found response
pub fn build_404_response(server_name: &str) -> Response<Full<Bytes>> {
    let mut resp = build_response(
        StatusCode::NOT_FOUND,
        CONTENT_TYPE_TEXT,
        Bytes::from_static(b"404 Not Found"),
    );
    set_server_header(&mut resp, server_name);
    resp
}

/// Build 405 Method Not Allowed response, only `POST` is accepted on `/`
pub fn build_405_response(server_name: &str) -> Response<Full<Bytes>> {
    let mut resp = build_response(
        StatusCode::METHOD_NOT_ALLOWED,
        CONTENT_TYPE_TEXT,
        Bytes::from_static(b"405 Method Not Allowed"),
    );
    resp.headers_mut()
        .insert(ALLOW, HeaderValue::from_static("POST"));
    set_server_header(&mut resp, server_name);
    resp
}

/// Build health probe response
pub fn build_health_response(is_head: bool, server_name: &str) -> Response<Full<Bytes>> {
    let body: &'static [u8] = br#"{"status":"ok"}"#;
    let mut resp = build_response(StatusCode::OK, CONTENT_TYPE_JSON, Bytes::from_static(body));
    resp.headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    if is_head {
        // Content-Length still describes the GET body
        *resp.body_mut() = Full::new(Bytes::new());
    }
    set_server_header(&mut resp, server_name);
    resp
}

/// Status, content type and length only; every header value here is static or numeric
fn build_response(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let content_length = body.len();
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    let headers = resp.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    resp
}

/// Attach the `Server` header; an unusable name drops the header, never the response
fn set_server_header(resp: &mut Response<Full<Bytes>>, server_name: &str) {
    match HeaderValue::from_str(server_name) {
        Ok(value) => {
            resp.headers_mut().insert(SERVER, value);
        }
        Err(e) => {
            crate::logger::log_error(&format!("Invalid Server header {server_name:?}: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_json_response_headers() {
        let resp = build_json_response(StatusCode::OK, br#"{"y":2}"#.to_vec(), "watchdog");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "application/json");
        assert_eq!(resp.headers()["Content-Length"], "7");
        assert_eq!(resp.headers()["Server"], "watchdog");
    }

    #[test]
    fn test_405_advertises_post() {
        let resp = build_405_response("watchdog");
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Allow"], "POST");
    }

    #[test]
    fn test_head_health_keeps_length() {
        let resp = build_health_response(true, "watchdog");
        assert_eq!(resp.headers()["Content-Length"], "15");
    }

    #[tokio::test]
    async fn test_invalid_server_name_keeps_status_and_body() {
        // Header values cannot contain newlines
        let resp = build_json_response(StatusCode::OK, br#"{"error":"boom"}"#.to_vec(), "bad\nname");
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get("Server").is_none());
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"error":"boom"}"#);

        let resp = build_404_response("bad\nname");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().get("Server").is_none());
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"404 Not Found");
    }
}
