//! Function invocation module
//!
//! Turns a request body into a function call and the call's outcome into a
//! response body. Every failure, from an unreadable body to a failing
//! function, becomes the error envelope `{"error": "<message>"}` and the
//! response status stays 200.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::AppState;
use crate::function::{Function, FunctionError, Params};
use crate::http;
use crate::logger::{self, Outcome};

/// Anything that stops a request from producing a function result
///
/// The `Display` output is the envelope message.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("failed to read request body: {0}")]
    Body(String),
    #[error("request body exceeds {0} bytes")]
    TooLarge(u64),
    #[error(transparent)]
    Parse(serde_json::Error),
    #[error(transparent)]
    Function(#[from] FunctionError),
    #[error("failed to serialize result: {0}")]
    Serialize(serde_json::Error),
}

impl InvokeError {
    /// Failures caused by the request body rather than the function
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Body(_) | Self::TooLarge(_) | Self::Parse(_))
    }
}

/// Error envelope returned in place of a function result
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

impl ErrorEnvelope {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| br#"{"error":"internal error"}"#.to_vec())
    }
}

impl From<&InvokeError> for ErrorEnvelope {
    fn from(err: &InvokeError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Collect the request body, failing once it grows past `limit` bytes
pub async fn read_body<B>(body: B, limit: u64) -> Result<Bytes, InvokeError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let max = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, max).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(InvokeError::TooLarge(limit)),
        Err(e) => Err(InvokeError::Body(e.to_string())),
    }
}

/// Decode the body as a JSON object
pub fn parse_params(body: &[u8]) -> Result<Params, InvokeError> {
    serde_json::from_slice(body).map_err(InvokeError::Parse)
}

/// Parse, call and serialize; the returned bytes are the success body
///
/// The call is abandoned once `deadline` passes.
pub async fn invoke(
    body: &[u8],
    function: &dyn Function,
    deadline: Duration,
) -> Result<Vec<u8>, InvokeError> {
    let params = parse_params(body)?;
    let result = tokio::time::timeout(deadline, function.call(params))
        .await
        .map_err(|_| FunctionError::Timeout(deadline))??;
    serde_json::to_vec(&result).map_err(InvokeError::Serialize)
}

/// Handle `POST /`: always answers 200 with either the result or the envelope
pub async fn handle_invoke<B>(body: B, state: &AppState) -> (Response<Full<Bytes>>, Outcome)
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let result = match read_body(body, state.config.http.max_body_size).await {
        Ok(bytes) => {
            invoke(
                &bytes,
                state.function.as_ref(),
                state.config.function_deadline(),
            )
            .await
        }
        Err(e) => Err(e),
    };

    let (payload, outcome) = match result {
        Ok(payload) => (payload, Outcome::Ok),
        Err(err) => {
            let envelope = ErrorEnvelope::from(&err);
            if err.is_client_error() {
                logger::log_request_rejected(&envelope.error);
            } else {
                logger::log_invocation_failed(state.function.name(), &envelope.error);
            }
            (envelope.to_bytes(), Outcome::Error)
        }
    };

    let response =
        http::build_json_response(StatusCode::OK, payload, &state.config.http.server_name);
    (response, outcome)
}
