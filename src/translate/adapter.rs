//! The translation request adapter
//!
//! [`TranslateAdapter::translate`] checks the request library, resolves the
//! backend and model, builds the prompt and dispatches. The completion handler
//! it installs turns the library's [`Response`] into a single call of the
//! caller's callback.
//!
//! # Example
//!
//! ```ignore
//! use immersive_translate::translate::*;
//! use std::sync::Arc;
//!
//! let library = Arc::new(MockRequestLibrary::new(MockMode::Echo));
//! let adapter = TranslateAdapter::new(
//!     library,
//!     AdapterConfig::default().with_backend("mock"),
//!     HostDefaults::default(),
//! )?;
//!
//! let request = TranslationRequest::new(Content::Input("Hello".into()));
//! let completion = adapter.translate_async(&request).await?;
//! println!("{:?}", completion.result);
//! ```

use crate::translate::config::{AdapterConfig, EffectiveTarget, HostDefaults, resolve_target};
use crate::translate::descriptor::{Content, TranslationRequest};
use crate::translate::error::{
    AdapterError, AdapterResult, TranslationFailure, TranslationResult,
};
use crate::translate::library::{
    LlmRequest, RequestInfo, RequestLibrary, Response, ResponseHandler,
};
use crate::translate::prompt::{build_prompt, failure_message};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Caller-supplied completion callback, called at most once
pub type Callback = Box<dyn FnOnce(TranslationResult, TranslationRequest) + Send + 'static>;

/// Handler used when `translate` gets no callback
pub type DefaultHandler = Arc<dyn Fn(TranslationResult, TranslationRequest) + Send + Sync + 'static>;

/// Terminal outcome of one request
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub result: TranslationResult,
    /// Copy of the descriptor with `status`, `error`, `backend` and `model` filled in
    pub request: TranslationRequest,
}

/// Forwards translation requests to a [`RequestLibrary`]
#[derive(Clone)]
pub struct TranslateAdapter {
    library: Arc<dyn RequestLibrary>,
    config: AdapterConfig,
    host: HostDefaults,
    default_handler: DefaultHandler,
}

impl TranslateAdapter {
    /// Create an adapter; fails if the prompt template is invalid
    pub fn new(
        library: Arc<dyn RequestLibrary>,
        config: AdapterConfig,
        host: HostDefaults,
    ) -> AdapterResult<Self> {
        config.validate()?;

        Ok(Self {
            library,
            config,
            host,
            default_handler: Arc::new(log_completion),
        })
    }

    /// Replace the handler used for requests dispatched without a callback
    pub fn with_default_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(TranslationResult, TranslationRequest) + Send + Sync + 'static,
    {
        self.default_handler = Arc::new(handler);
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn host_defaults(&self) -> &HostDefaults {
        &self.host
    }

    /// Send `request` to the library
    ///
    /// Returns once the request is dispatched; the outcome arrives through
    /// `callback`, or the default handler when `callback` is `None`. `request`
    /// itself is never modified.
    ///
    /// # Errors
    ///
    /// * [`AdapterError::LibraryUnavailable`] if the library cannot take requests
    /// * [`AdapterError::NoBackend`] if no backend override or host default exists
    ///
    /// Nothing is dispatched in either case.
    pub fn translate(
        &self,
        request: &TranslationRequest,
        callback: Option<Callback>,
    ) -> AdapterResult<()> {
        if !self.library.is_available() {
            return Err(AdapterError::LibraryUnavailable(
                self.library.name().to_string(),
            ));
        }

        let target = resolve_target(&self.config, &self.host)?;
        let prompt = build_prompt(&self.config.user_prompt_template, &request.content);

        let mut context = request.clone();
        context.content = Content::Prompt(prompt.clone());

        let callback = match callback {
            Some(callback) => callback,
            None => {
                let handler = Arc::clone(&self.default_handler);
                let callback: Callback = Box::new(move |result, request| handler(result, request));
                callback
            }
        };
        let handler = completion_handler(
            context.clone(),
            target.clone(),
            self.config.error_prefix.clone(),
            callback,
        );

        debug!(
            library = self.library.name(),
            backend = %target.backend,
            model = target.model.as_deref().unwrap_or("<default>"),
            stream = self.config.stream,
            content_len = request.content.as_str().len(),
            prompt_len = prompt.len(),
            "Dispatching translation request"
        );

        self.library.request(
            LlmRequest {
                prompt,
                buffer: request.buffer.clone(),
                position: request.position,
                system_prompt: self.config.system_prompt.clone(),
                stream: self.config.stream,
                backend: target.backend,
                model: target.model,
                context,
            },
            handler,
        );

        Ok(())
    }

    /// Like [`translate`](Self::translate), but waits for the terminal outcome
    ///
    /// Resolves with [`AdapterError::Incomplete`] if the library drops the
    /// request without ever delivering a terminal response.
    pub async fn translate_async(&self, request: &TranslationRequest) -> AdapterResult<Completion> {
        let (tx, rx) = oneshot::channel();
        let callback: Callback = Box::new(move |result, request| {
            // The receiver may already be gone if the caller stopped waiting
            let _ = tx.send(Completion { result, request });
        });
        self.translate(request, Some(callback))?;

        rx.await.map_err(|_| AdapterError::Incomplete)
    }
}

impl std::fmt::Debug for TranslateAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslateAdapter")
            .field("library", &self.library.name())
            .field("config", &self.config)
            .field("host", &self.host)
            .finish()
    }
}

/// Build the handler the library calls with each response
///
/// `fallback` is used when the library does not return the context it was given.
fn completion_handler(
    fallback: TranslationRequest,
    target: EffectiveTarget,
    error_prefix: String,
    callback: Callback,
) -> ResponseHandler {
    let mut callback = Some(callback);

    Box::new(move |response, info| {
        let RequestInfo {
            context,
            status,
            error,
        } = info;

        if !response.is_terminal() {
            debug!(backend = %target.backend, ?response, "Ignoring intermediate response chunk");
            return;
        }

        let result = match response {
            Response::Text(text) => Ok(text),
            _ => Err(TranslationFailure {
                message: failure_message(&error_prefix, status.as_deref(), error.as_deref()),
                status: status.clone(),
                error: error.clone(),
            }),
        };

        let Some(callback) = callback.take() else {
            warn!(
                backend = %target.backend,
                "Dropping terminal response for an already completed request"
            );
            return;
        };

        let mut request = context.unwrap_or_else(|| fallback.clone());
        if status.is_some() {
            request.status = status;
        }
        if error.is_some() {
            request.error = error;
        }
        request.backend = Some(target.backend.clone());
        if let Some(model) = &target.model {
            request.model = Some(model.clone());
        }

        callback(result, request);
    })
}

/// Default completion handler: report the outcome through `tracing`
pub fn log_completion(result: TranslationResult, request: TranslationRequest) {
    let buffer = request.buffer.as_deref().unwrap_or("<none>");
    let position = request.position.map(|p| p.to_string());
    let position = position.as_deref().unwrap_or("<none>");

    match result {
        Ok(text) => info!(buffer, position, text = %text, "Translation completed"),
        Err(failure) => warn!(buffer, position, "{}", failure),
    }
}
