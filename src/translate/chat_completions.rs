//! OpenAI-compatible chat-completions request library
//!
//! [`ChatCompletionsLibrary`] implements [`RequestLibrary`] on top of any
//! endpoint that speaks the `/chat/completions` API (OpenAI, DeepSeek, Ollama,
//! vLLM, ...). Backends are registered by name; the backend the adapter
//! resolves for a request picks the endpoint.
//!
//! The streaming flag is accepted but responses are always fetched whole and
//! delivered as a single terminal chunk.
//!
//! # Authentication
//!
//! [`ChatCompletionsLibrary::from_env`] registers an `openai` backend from
//! `OPENAI_API_KEY`, `OPENAI_BASE_URL` (default `https://api.openai.com/v1`)
//! and `OPENAI_MODEL`. [`ChatCompletionsLibrary::from_env_as`] registers the
//! same endpoint under another backend name.
//!
//! # Example
//!
//! ```ignore
//! use immersive_translate::translate::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let library = Arc::new(ChatCompletionsLibrary::from_env()?);
//!     let adapter = TranslateAdapter::new(
//!         library,
//!         AdapterConfig::default().with_backend("openai"),
//!         HostDefaults::default(),
//!     )?;
//!     let request = TranslationRequest::new(Content::Input("Hello".into()));
//!     println!("{:?}", adapter.translate_async(&request).await?.result);
//!     Ok(())
//! }
//! ```

use crate::translate::descriptor::TranslationRequest;
use crate::translate::error::{AdapterError, AdapterResult};
use crate::translate::library::{
    LlmRequest, RequestInfo, RequestLibrary, Response, ResponseHandler,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Longest error body copied into a failure message
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Where a named backend sends its requests
#[derive(Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    /// Base URL up to (not including) `/chat/completions`
    pub base_url: String,
    pub api_key: Option<String>,
    /// Model used when the request resolves none
    pub default_model: Option<String>,
}

impl BackendEndpoint {
    /// Create an endpoint with no key and no default model
    ///
    /// # Arguments
    /// * `base_url` - URL up to `/chat/completions`; a trailing slash is fine
    ///
    /// # Example
    /// ```ignore
    /// let endpoint = BackendEndpoint::new("http://localhost:11434/v1")
    ///     .with_default_model("qwen2.5");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            default_model: None,
        }
    }

    /// Endpoint described by the `OPENAI_*` environment variables
    ///
    /// Reads `OPENAI_BASE_URL` (default [`DEFAULT_OPENAI_BASE_URL`]),
    /// `OPENAI_API_KEY` and `OPENAI_MODEL`. Unset or blank variables leave the
    /// field at its default; a missing key is not an error here.
    pub fn from_env() -> Self {
        let base_url =
            env_value("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());

        let mut endpoint = Self::new(base_url);
        endpoint.api_key = env_value("OPENAI_API_KEY");
        endpoint.default_model = env_value("OPENAI_MODEL");
        endpoint
    }

    /// Send `Authorization: Bearer <api_key>` with every request
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Model to use when a request resolves none
    ///
    /// # Arguments
    /// * `model` - Model name as the backend knows it (e.g. "gpt-4o-mini")
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for BackendEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendEndpoint")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of a `/chat/completions` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// Raw HTTP outcome of a transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

/// Sends a [`ChatRequest`] to an endpoint
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: &BackendEndpoint,
        request: &ChatRequest,
    ) -> AdapterResult<TransportReply>;
}

/// [`ChatTransport`] over `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> AdapterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AdapterError::NetworkError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(
        &self,
        endpoint: &BackendEndpoint,
        request: &ChatRequest,
    ) -> AdapterResult<TransportReply> {
        let mut builder = self.client.post(endpoint.completions_url()).json(request);
        if let Some(api_key) = &endpoint.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportReply { status, body })
    }
}

/// [`RequestLibrary`] for OpenAI-compatible chat endpoints
///
/// Requests run on spawned tokio tasks. Called outside a tokio runtime,
/// [`RequestLibrary::request`] answers with [`Response::Failed`] instead.
pub struct ChatCompletionsLibrary {
    endpoints: HashMap<String, BackendEndpoint>,
    transport: Arc<dyn ChatTransport>,
    /// Bumped by [`cancel_all`](Self::cancel_all); in-flight tasks watch it
    cancel: watch::Sender<u64>,
}

impl ChatCompletionsLibrary {
    /// Request timeout of the default HTTP transport
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Library over a custom transport, with no backends yet
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        let (cancel, _) = watch::channel(0);
        Self {
            endpoints: HashMap::new(),
            transport,
            cancel,
        }
    }

    /// Library over [`HttpTransport`] with no backends yet
    pub fn with_http() -> AdapterResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(Self::DEFAULT_TIMEOUT)?)))
    }

    /// Library with an `openai` backend configured from the environment
    pub fn from_env() -> AdapterResult<Self> {
        Self::from_env_as("openai")
    }

    /// Library with the [`BackendEndpoint::from_env`] endpoint registered as `name`
    ///
    /// # Arguments
    /// * `name` - Backend name requests resolve to (e.g. "openai", "deepseek")
    ///
    /// # Returns
    /// * `Ok(ChatCompletionsLibrary)` - One backend, ready for requests
    /// * `Err(AdapterError::ConfigError)` - `OPENAI_API_KEY` is unset or blank
    ///
    /// # Example
    /// ```ignore
    /// // OPENAI_BASE_URL=https://api.deepseek.com/v1 OPENAI_MODEL=deepseek-chat
    /// let library = ChatCompletionsLibrary::from_env_as("deepseek")?;
    /// assert_eq!(library.backend_names(), vec!["deepseek"]);
    /// ```
    pub fn from_env_as(name: impl Into<String>) -> AdapterResult<Self> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(AdapterError::ConfigError(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ));
        }
        let endpoint = BackendEndpoint::from_env();
        if endpoint.api_key.is_none() {
            return Err(AdapterError::ConfigError(
                "OPENAI_API_KEY cannot be empty".to_string(),
            ));
        }

        Ok(Self::with_http()?.with_backend(name, endpoint))
    }

    /// Register (or replace) a named backend
    pub fn with_backend(mut self, name: impl Into<String>, endpoint: BackendEndpoint) -> Self {
        self.endpoints.insert(name.into(), endpoint);
        self
    }

    pub fn backend_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Abort every in-flight request
    ///
    /// Each aborted request delivers [`Response::Aborted`] once.
    pub fn cancel_all(&self) {
        self.cancel.send_modify(|generation| *generation += 1);
    }

    fn build_body(request: &LlmRequest, model: String) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.trim().is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: request.system_prompt.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model,
            messages,
            stream: false,
        }
    }
}

impl std::fmt::Debug for ChatCompletionsLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsLibrary")
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl RequestLibrary for ChatCompletionsLibrary {
    fn name(&self) -> &str {
        "Chat Completions"
    }

    fn is_available(&self) -> bool {
        !self.endpoints.is_empty()
    }

    fn request(&self, request: LlmRequest, mut handler: ResponseHandler) {
        let context = request.context.clone();

        let Some(endpoint) = self.endpoints.get(&request.backend).cloned() else {
            warn!(backend = %request.backend, "Unknown backend");
            handler(
                Response::Failed,
                RequestInfo::with_context(context)
                    .with_error(format!("Unknown backend '{}'", request.backend)),
            );
            return;
        };

        let Some(model) = request
            .model
            .clone()
            .or_else(|| endpoint.default_model.clone())
        else {
            handler(
                Response::Failed,
                RequestInfo::with_context(context).with_error(format!(
                    "No model configured for backend '{}'",
                    request.backend
                )),
            );
            return;
        };

        if request.stream {
            debug!(backend = %request.backend, "Streaming requested; fetching whole response");
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(backend = %request.backend, "No tokio runtime; request not sent");
            handler(
                Response::Failed,
                RequestInfo::with_context(context).with_error("no tokio runtime available"),
            );
            return;
        };

        let body = Self::build_body(&request, model);
        let transport = Arc::clone(&self.transport);
        let mut cancelled = self.cancel.subscribe();

        runtime.spawn(async move {
            let reply = tokio::select! {
                reply = transport.send(&endpoint, &body) => Some(reply),
                _ = wait_cancelled(&mut cancelled) => None,
            };

            let Some(reply) = reply else {
                debug!(url = %endpoint.completions_url(), "Request cancelled");
                handler(Response::Aborted, RequestInfo::with_context(context));
                return;
            };

            for (response, info) in interpret_reply(reply, &context) {
                handler(response, info);
            }
        });
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn wait_cancelled(cancelled: &mut watch::Receiver<u64>) {
    if cancelled.changed().await.is_err() {
        // Library dropped; nobody can cancel any more
        std::future::pending::<()>().await;
    }
}

/// Turn a transport outcome into handler deliveries; the last one is terminal
fn interpret_reply(
    reply: AdapterResult<TransportReply>,
    context: &TranslationRequest,
) -> Vec<(Response, RequestInfo)> {
    let reply = match reply {
        Ok(reply) => reply,
        Err(err) => {
            return vec![(
                Response::Failed,
                RequestInfo::with_context(context.clone()).with_error(err.to_string()),
            )];
        }
    };

    let status = reply.status.to_string();
    let failed = |error: String| {
        vec![(
            Response::Failed,
            RequestInfo::with_context(context.clone())
                .with_status(status.clone())
                .with_error(error),
        )]
    };

    if !(200..300).contains(&reply.status) {
        return failed(error_detail(&reply.body));
    }

    let json: Value = match serde_json::from_str(&reply.body) {
        Ok(json) => json,
        Err(e) => return failed(format!("Failed to parse API response: {}", e)),
    };

    let message = &json["choices"][0]["message"];
    if message.is_null() {
        return failed("Invalid API response: missing 'choices[0].message'".to_string());
    }

    let info = || RequestInfo::with_context(context.clone()).with_status(status.clone());
    let mut deliveries = Vec::new();

    if let Some(reasoning) = message["reasoning_content"].as_str() {
        if !reasoning.is_empty() {
            deliveries.push((Response::Reasoning(reasoning.to_string()), info()));
        }
    }
    if let Some(tool_calls) = message["tool_calls"].as_array() {
        for call in tool_calls {
            deliveries.push((Response::ToolCall(call.clone()), info()));
        }
    }

    match message["content"].as_str() {
        Some(content) if !content.is_empty() => {
            deliveries.push((Response::Text(content.to_string()), info()));
        }
        _ => {
            let error = if deliveries.iter().any(|(r, _)| matches!(r, Response::ToolCall(_))) {
                "Model requested tool calls instead of answering"
            } else {
                "Empty response from model"
            };
            deliveries.push((Response::Failed, info().with_error(error)));
        }
    }

    deliveries
}

/// Best-effort error text from a non-2xx body
fn error_detail(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(message) = json["error"]["message"].as_str() {
            return message.to_string();
        }
        if let Some(message) = json["error"].as_str() {
            return message.to_string();
        }
    }

    let body = body.trim();
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}…", truncated)
    } else {
        body.to_string()
    }
}
