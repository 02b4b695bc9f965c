//! Request/response pipeline around every API call.
//!
//! Request stages rewrite an outgoing `ApiRequest` in order (auth header,
//! content type). `decode_response` turns the raw response into either the
//! unwrapped payload or a classified `ApiError`. Response stages then see
//! every outcome in order. None of these touch the outside world: the client
//! applies notices and redirects afterwards through the host ports.

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{Map, Value};

use super::error::{
    ApiError, RedirectTiming, FORBIDDEN, GENERIC_FAILURE, NOT_FOUND, SERVER_ERROR,
    SESSION_EXPIRED,
};
use super::transport::{ApiRequest, HttpResponse, RequestBody, ResponseType};
use crate::session::Session;

/// Envelope code meaning success.
pub const CODE_OK: i64 = 200;
/// Envelope code meaning the token is missing or expired.
pub const CODE_UNAUTHORIZED: i64 = 401;

/// A successfully decoded response.
#[derive(Debug, Clone)]
pub enum Payload {
    /// The envelope's `data` field, or the whole body when there is none.
    Json(Value),
    /// Binary responses bypass the envelope entirely.
    Binary(HttpResponse),
}

pub type Outcome = Result<Payload, ApiError>;

/// Rewrites a request before it is sent. An error aborts the call.
pub trait RequestStage: Send + Sync {
    fn apply(&self, request: &mut ApiRequest, session: &Session) -> Result<(), ApiError>;
}

/// Observes or rewrites the decoded outcome of a call.
pub trait ResponseStage: Send + Sync {
    fn apply(&self, request: &ApiRequest, outcome: Outcome) -> Outcome;
}

/// Attach `Authorization: Bearer <token>` when the session has a token.
///
/// Without a token any caller-supplied Authorization header is dropped, so an
/// anonymous request never carries a stale credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct BearerAuth;

impl RequestStage for BearerAuth {
    fn apply(&self, request: &mut ApiRequest, session: &Session) -> Result<(), ApiError> {
        match session.token() {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::Request("token is not a valid header value".into()))?;
                request.headers.insert(AUTHORIZATION, value);
            }
            None => {
                request.headers.remove(AUTHORIZATION);
            }
        }
        Ok(())
    }
}

/// Default body-carrying writes to `application/json`.
///
/// Multipart bodies get no explicit content type: the transport writes it
/// together with the boundary.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultContentType;

impl RequestStage for DefaultContentType {
    fn apply(&self, request: &mut ApiRequest, _session: &Session) -> Result<(), ApiError> {
        if let RequestBody::Multipart(_) = request.body {
            request.headers.remove(CONTENT_TYPE);
            return Ok(());
        }

        let method = &request.method;
        let is_write = *method == Method::POST
            || *method == Method::PUT
            || *method == Method::PATCH
            || (*method == Method::DELETE && request.body != RequestBody::Empty);

        if is_write && !request.headers.contains_key(CONTENT_TYPE) {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(())
    }
}

/// Log every rejected call.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFailures;

impl ResponseStage for LogFailures {
    fn apply(&self, request: &ApiRequest, outcome: Outcome) -> Outcome {
        if let Err(ref e) = outcome {
            log::warn!("{} {} failed: {}", request.method, request.path, e);
        }
        outcome
    }
}

/// Decode a raw response according to the expected response type.
pub fn decode_response(response: HttpResponse, response_type: ResponseType) -> Outcome {
    if response.status >= 400 {
        return Err(status_error(response.status, &response.body));
    }

    if response_type == ResponseType::Binary {
        return Ok(Payload::Binary(response));
    }

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::Json(Value::Null));
    }

    let body: Value = serde_json::from_slice(&response.body)?;
    unwrap_envelope(body).map(Payload::Json)
}

/// Apply the `{code, data, message}` envelope rules to a JSON body.
pub fn unwrap_envelope(body: Value) -> Result<Value, ApiError> {
    let mut map = match body {
        Value::Object(map) => map,
        other => return Ok(other),
    };

    match envelope_code(&map) {
        None | Some(CODE_OK) => Ok(map.remove("data").unwrap_or(Value::Object(map))),
        Some(CODE_UNAUTHORIZED) => Err(ApiError::SessionExpired {
            message: SESSION_EXPIRED.to_string(),
            timing: RedirectTiming::Immediate,
        }),
        Some(code) => Err(ApiError::Business {
            code,
            message: envelope_message(&map).unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        }),
    }
}

/// Classify an HTTP error status, preferring the server's message.
pub fn status_error(status: u16, body: &[u8]) -> ApiError {
    let server_message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| match v {
            Value::Object(map) => envelope_message(&map),
            _ => None,
        });
    let message = |fallback: &str| server_message.clone().unwrap_or_else(|| fallback.to_string());

    match status {
        401 => ApiError::SessionExpired {
            message: SESSION_EXPIRED.to_string(),
            timing: RedirectTiming::Delayed,
        },
        403 => ApiError::Forbidden(message(FORBIDDEN)),
        404 => ApiError::NotFound(message(NOT_FOUND)),
        500 => ApiError::Server(message(SERVER_ERROR)),
        _ => ApiError::Status {
            status,
            message: message(&format!("Request failed with status code {}", status)),
        },
    }
}

/// `code` as an integer; some gateways send it as a numeric string.
fn envelope_code(map: &Map<String, Value>) -> Option<i64> {
    match map.get("code")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn envelope_message(map: &Map<String, Value>) -> Option<String> {
    map.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
