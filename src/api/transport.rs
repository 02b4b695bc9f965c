//! Request descriptors and the transport that puts them on the wire.
//!
//! `ApiRequest` is plain data so the pipeline stages and the tests can
//! inspect it. `Transport` is the seam between the pipeline and the network:
//! in production `ReqwestTransport` sends over HTTP, in tests a recorder
//! returns canned responses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::error::ApiError;
use crate::config::ClientConfig;

/// Size of each slice a file part is streamed in, and so the progress granularity.
const UPLOAD_SLICE: usize = 64 * 1024;

/// Called with `(loaded, total)` bytes as an upload body is sent.
pub type ProgressSink = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// How the response body should be treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// A JSON envelope to be unwrapped.
    #[default]
    Json,
    /// Raw bytes handed back with status and headers untouched.
    Binary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartValue {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        data: Bytes,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: PartValue,
}

/// A multipart/form-data body (file upload plus metadata fields).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    pub parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl ToString) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            value: PartValue::Text(value.to_string()),
        });
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, mime: Option<&str>, data: Bytes) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            value: PartValue::File {
                file_name: file_name.to_string(),
                mime: mime.map(str::to_string),
                data,
            },
        });
        self
    }

    /// Value of the named text field, if present.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|p| match p.value {
            PartValue::Text(ref v) if p.name == name => Some(v.as_str()),
            _ => None,
        })
    }

    /// Total bytes across file parts; progress is reported against this.
    pub fn file_bytes(&self) -> u64 {
        self.parts
            .iter()
            .map(|p| match p.value {
                PartValue::File { ref data, .. } => data.len() as u64,
                PartValue::Text(_) => 0,
            })
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// One outbound call: method, API-relative path, query, headers and body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub response_type: ResponseType,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            response_type: ResponseType::Json,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn queries(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn binary(mut self) -> Self {
        self.response_type = ResponseType::Binary;
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn json_body(&self) -> Option<&Value> {
        match self.body {
            RequestBody::Json(ref v) => Some(v),
            _ => None,
        }
    }
}

/// What came back over the wire, before any envelope handling.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(v) = HeaderValue::from_str(value) {
            self.headers.insert(HeaderName::from_static(name), v);
        }
        self
    }

    /// Header value as text; non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// No response was received (DNS, connect, TLS, timeout, reset).
    #[error("no response: {0}")]
    NoResponse(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    Build(String),
}

/// Sends a prepared request and returns the raw response.
///
/// A response with an error status is still `Ok`; only the absence of a
/// response is a `TransportError`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &ApiRequest,
        progress: Option<ProgressSink>,
    ) -> Result<HttpResponse, TransportError>;
}

/// HTTP transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        progress: Option<ProgressSink>,
    ) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.config.url(&request.path))
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(ref value) => builder.json(value),
            RequestBody::Multipart(ref form) => builder.multipart(to_reqwest_form(form, progress)?),
        };

        let resp = builder.send().await.map_err(classify)?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(classify)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::Build(err.to_string())
    } else {
        TransportError::NoResponse(err.to_string())
    }
}

/// Convert a `MultipartForm`, streaming file parts so progress can be observed.
fn to_reqwest_form(
    form: &MultipartForm,
    progress: Option<ProgressSink>,
) -> Result<reqwest::multipart::Form, TransportError> {
    use reqwest::multipart::{Form, Part};

    let total = form.file_bytes();
    let loaded = Arc::new(AtomicU64::new(0));
    let mut out = Form::new();

    for part in &form.parts {
        out = match part.value {
            PartValue::Text(ref v) => out.text(part.name.clone(), v.clone()),
            PartValue::File {
                ref file_name,
                ref mime,
                ref data,
            } => {
                let len = data.len() as u64;
                let body = match progress {
                    Some(ref sink) => {
                        progress_body(data.clone(), total, loaded.clone(), sink.clone())
                    }
                    None => reqwest::Body::from(data.clone()),
                };
                let mut p = Part::stream_with_length(body, len).file_name(file_name.clone());
                p = p
                    .mime_str(mime.as_deref().unwrap_or("application/octet-stream"))
                    .map_err(|e| TransportError::Build(e.to_string()))?;
                out.part(part.name.clone(), p)
            }
        };
    }

    Ok(out)
}

fn progress_body(
    data: Bytes,
    total: u64,
    loaded: Arc<AtomicU64>,
    sink: ProgressSink,
) -> reqwest::Body {
    reqwest::Body::wrap_stream(progress_stream(data, total, loaded, sink))
}

/// Slice `data` and report cumulative bytes as each slice is pulled.
fn progress_stream(
    data: Bytes,
    total: u64,
    loaded: Arc<AtomicU64>,
    sink: ProgressSink,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    let slices: Vec<Bytes> = (0..data.len())
        .step_by(UPLOAD_SLICE)
        .map(|start| data.slice(start..(start + UPLOAD_SLICE).min(data.len())))
        .collect();

    futures::stream::iter(slices.into_iter().map(move |slice| {
        let sent = loaded.fetch_add(slice.len() as u64, Ordering::SeqCst) + slice.len() as u64;
        sink(sent, total);
        Ok::<Bytes, std::io::Error>(slice)
    }))
}
