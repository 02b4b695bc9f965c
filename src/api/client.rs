//! HTTP client core: runs the request pipeline, sends through the transport,
//! decodes the response and applies host-visible effects.
//!
//! Every Domain API function goes through `ApiClient::execute`, so each call
//! either resolves with the unwrapped payload or rejects with an `ApiError`
//! whose message is ready for display. No call is retried here.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ApiError, NETWORK_UNREACHABLE};
use super::pipeline::{
    decode_response, BearerAuth, DefaultContentType, LogFailures, Outcome, Payload, RequestStage,
    ResponseStage,
};
use super::transport::{
    ApiRequest, HttpResponse, ProgressSink, ReqwestTransport, Transport, TransportError,
};
use crate::config::ClientConfig;
use crate::host::{Notice, Ports};
use crate::router::is_login_path;
use crate::session::Session;

struct Inner {
    config: ClientConfig,
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
    ports: Ports,
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

/// Shared API client. Cloning is cheap; clones share session and transport.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

/// Builder for `ApiClient`, starting from the default pipeline.
pub struct ApiClientBuilder {
    config: ClientConfig,
    session: Arc<Session>,
    transport: Option<Arc<dyn Transport>>,
    ports: Ports,
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl ApiClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn ports(mut self, ports: Ports) -> Self {
        self.ports = ports;
        self
    }

    /// Append a request stage after the defaults.
    pub fn request_stage(mut self, stage: Arc<dyn RequestStage>) -> Self {
        self.request_stages.push(stage);
        self
    }

    /// Append a response stage after the defaults.
    pub fn response_stage(mut self, stage: Arc<dyn ResponseStage>) -> Self {
        self.response_stages.push(stage);
        self
    }

    pub fn build(self) -> ApiClient {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new(&self.config)));
        ApiClient {
            inner: Arc::new(Inner {
                config: self.config,
                session: self.session,
                transport,
                ports: self.ports,
                request_stages: self.request_stages,
                response_stages: self.response_stages,
            }),
        }
    }
}

impl ApiClient {
    /// Create a client over HTTP with the default pipeline.
    pub fn new(config: ClientConfig, session: Arc<Session>, ports: Ports) -> Self {
        Self::builder(config, session).ports(ports).build()
    }

    pub fn builder(config: ClientConfig, session: Arc<Session>) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            session,
            transport: None,
            ports: Ports::default(),
            request_stages: vec![Arc::new(BearerAuth), Arc::new(DefaultContentType)],
            response_stages: vec![Arc::new(LogFailures)],
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    /// Run one request through the full pipeline.
    pub async fn execute(
        &self,
        request: ApiRequest,
        progress: Option<ProgressSink>,
    ) -> Result<Payload, ApiError> {
        let outcome = self.run(request, progress).await;
        if let Err(ref e) = outcome {
            self.apply_effects(e);
        }
        outcome
    }

    async fn run(&self, mut request: ApiRequest, progress: Option<ProgressSink>) -> Outcome {
        for stage in &self.inner.request_stages {
            stage.apply(&mut request, &self.inner.session)?;
        }

        log::debug!("{} {}", request.method, request.path);

        let outcome = match self.inner.transport.send(&request, progress).await {
            Ok(response) => decode_response(response, request.response_type),
            Err(TransportError::NoResponse(detail)) => {
                log::debug!("{} {}: {}", request.method, request.path, detail);
                Err(ApiError::Network(NETWORK_UNREACHABLE.to_string()))
            }
            Err(TransportError::Build(detail)) => Err(ApiError::Request(detail)),
        };

        self.inner
            .response_stages
            .iter()
            .fold(outcome, |outcome, stage| stage.apply(&request, outcome))
    }

    /// Notify the host and, on session expiry, clear the session and redirect.
    fn apply_effects(&self, error: &ApiError) {
        if error.is_notified() {
            self.inner.ports.notifier.notify(&Notice::error(error.to_string()));
        }

        if let ApiError::SessionExpired { timing, .. } = error {
            if let Err(e) = self.inner.session.clear() {
                log::warn!("Failed to clear expired session: {}", e);
            }
            let navigator = &self.inner.ports.navigator;
            let current = navigator.current_path();
            if is_login_path(&current) {
                log::debug!("Already at {}, not redirecting again", current);
                return;
            }
            navigator.redirect_to_login(&current, timing.delay(self.inner.config.auth_redirect_delay));
        }
    }

    /// Execute and deserialize the unwrapped payload.
    pub async fn json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let value = self.value(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Execute and return the unwrapped payload untyped.
    pub async fn value(&self, request: ApiRequest) -> Result<Value, ApiError> {
        match self.execute(request, None).await? {
            Payload::Json(value) => Ok(value),
            Payload::Binary(_) => Err(ApiError::Decode("expected JSON, got binary".into())),
        }
    }

    /// Execute for its side effect, discarding the payload.
    pub async fn unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request, None).await.map(|_| ())
    }

    /// Execute as a binary request and return the raw response.
    pub async fn binary(&self, request: ApiRequest) -> Result<HttpResponse, ApiError> {
        match self.execute(request.binary(), None).await? {
            Payload::Binary(response) => Ok(response),
            Payload::Json(_) => Err(ApiError::Decode("expected binary, got JSON".into())),
        }
    }
}
