//! Request correlation, access logging and panic recovery.
//!
//! Layer order (outermost first): set `x-request-id` on the request,
//! propagate it to the response, log the request, catch panics.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::models::ErrorBody;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// One access-log line; rendered as
/// `<METHOD> <PATH> <STATUS> <LATENCY_MS>ms rid=<CORRELATION_ID>`.
#[derive(Debug)]
pub struct RequestLogRecord<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub status: StatusCode,
    pub latency: Duration,
    pub request_id: &'a str,
}

impl RequestLogRecord<'_> {
    pub fn is_failure(&self) -> bool {
        self.status.as_u16() >= 400
    }
}

impl fmt::Display for RequestLogRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {:.2}ms rid={}",
            self.method,
            self.path,
            self.status.as_u16(),
            self.latency.as_secs_f64() * 1000.0,
            self.request_id
        )
    }
}

/// `axum::middleware::from_fn` handler emitting exactly one line per request.
///
/// A request id that is not visible ASCII is replaced with a fresh one, on
/// both the request and the response, so the log line matches the header.
pub async fn log_requests(mut request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let readable = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let (request_id, replacement) = match readable {
        Some(id) => (id, None),
        None => {
            let id = Uuid::new_v4().to_string();
            let value = HeaderValue::from_str(&id).ok();
            if let Some(value) = &value {
                request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
            }
            (id, value)
        }
    };

    let span = info_span!("request", rid = %request_id);
    let start = Instant::now();
    let mut response = next.run(request).instrument(span).await;
    if let Some(value) = replacement {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let record = RequestLogRecord {
        method: &method,
        path: &path,
        status: response.status(),
        latency: start.elapsed(),
        request_id: &request_id,
    };
    if record.is_failure() {
        error!("{record}");
    } else {
        info!("{record}");
    }

    response
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal server error".to_string()
    }
}

/// Routes panic reports through `tracing` with the panic location and a
/// backtrace (empty unless `RUST_BACKTRACE` is set). Runs before unwinding
/// reaches [`handle_panic`], inside the request's span.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let backtrace = Backtrace::capture();
        error!(
            panic.location = %location,
            "Panic: {}\n{backtrace}",
            panic_message(info.payload())
        );
    }));
}

/// Panic handler for `CatchPanicLayer::custom`.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic_message(err.as_ref());
    error!("Error during request: handler panicked: {message}");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_record_renders_fixed_format() {
        let method = Method::POST;
        let record = RequestLogRecord {
            method: &method,
            path: "/",
            status: StatusCode::OK,
            latency: Duration::from_millis(12),
            request_id: "abc",
        };
        assert_eq!(record.to_string(), "POST / 200 12.00ms rid=abc");
        assert!(!record.is_failure());
    }

    #[test]
    fn client_and_server_errors_are_failures() {
        let method = Method::GET;
        for code in [400, 404, 422, 500, 503] {
            let record = RequestLogRecord {
                method: &method,
                path: "/x",
                status: StatusCode::from_u16(code).unwrap(),
                latency: Duration::ZERO,
                request_id: "r",
            };
            assert!(record.is_failure(), "{code} should log at error level");
        }
    }

    #[tokio::test]
    async fn panic_payload_becomes_json_error() {
        let response = handle_panic(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "kaboom");
    }

    #[test]
    fn panic_message_reads_string_payloads() {
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&"borrowed"), "borrowed");
        assert_eq!(panic_message(&42_u8), "Internal server error");
    }
}
