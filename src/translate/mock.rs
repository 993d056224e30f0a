//! Mock request library for testing
//!
//! A deterministic, network-free [`RequestLibrary`] that answers according to a
//! [`MockMode`] and records every request it receives, so tests can assert on
//! what was (or was not) dispatched.
//!
//! # Example
//!
//! ```ignore
//! use immersive_translate::translate::{MockMode, MockRequestLibrary};
//!
//! let library = MockRequestLibrary::new(MockMode::Suffix("fr".into()));
//! // ... dispatch through a TranslateAdapter ...
//! assert_eq!(library.request_count(), 1);
//! ```

use crate::translate::descriptor::TranslationRequest;
use crate::translate::library::{
    LlmRequest, RequestInfo, RequestLibrary, Response, ResponseHandler,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// One scripted delivery to the completion handler
#[derive(Debug, Clone, PartialEq)]
pub struct MockDelivery {
    pub response: Response,
    pub status: Option<String>,
    pub error: Option<String>,
    /// Whether [`RequestInfo::context`] carries the request's context
    pub include_context: bool,
}

impl MockDelivery {
    pub fn new(response: Response) -> Self {
        Self {
            response,
            status: None,
            error: None,
            include_context: true,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Deliver without returning the context, as some libraries do
    pub fn without_context(mut self) -> Self {
        self.include_context = false;
        self
    }
}

/// How the mock answers each request
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Reply with the prompt itself
    Echo,

    /// Append a suffix: "hello" → "hello_fr"
    Suffix(String),

    /// Deliver a fixed sequence of responses
    Script(Vec<MockDelivery>),

    /// Report the request as aborted
    Abort,

    /// Report a failed request with the given status and error
    Fail {
        status: Option<String>,
        error: Option<String>,
    },

    /// Keep the handler until [`MockRequestLibrary::release`] is called
    Hold,

    /// Drop the handler without ever calling it
    Silent,
}

/// Mock implementation of [`RequestLibrary`]
pub struct MockRequestLibrary {
    mode: MockMode,
    /// Optional simulated network delay (in milliseconds)
    delay_ms: u64,
    available: AtomicBool,
    requests: Mutex<Vec<LlmRequest>>,
    held: Mutex<Vec<(TranslationRequest, ResponseHandler)>>,
}

impl MockRequestLibrary {
    pub fn new(mode: MockMode) -> Self {
        Self::with_delay(mode, 0)
    }

    /// Deliver responses from a spawned task after `delay_ms`
    ///
    /// With `delay_ms > 0` and no tokio runtime, each request fails at once.
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            mode,
            delay_ms,
            available: AtomicBool::new(true),
            requests: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Every request dispatched so far, in order
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .map(|requests| requests.len())
            .unwrap_or_default()
    }

    /// Number of requests waiting in [`MockMode::Hold`]
    pub fn held_count(&self) -> usize {
        self.held.lock().map(|held| held.len()).unwrap_or_default()
    }

    /// Deliver `delivery` to every held request
    ///
    /// Handlers stay held, so several deliveries can be released in turn.
    pub fn release(&self, delivery: MockDelivery) {
        let mut held = match self.held.lock() {
            Ok(mut held) => std::mem::take(&mut *held),
            Err(_) => return,
        };

        // Handlers run with the lock released
        for (context, handler) in held.iter_mut() {
            let (response, info) = Self::materialize(&delivery, context);
            handler(response, info);
        }

        if let Ok(mut slot) = self.held.lock() {
            held.append(&mut *slot);
            *slot = held;
        }
    }

    /// Drop every held handler without calling it
    pub fn drop_held(&self) {
        if let Ok(mut held) = self.held.lock() {
            held.clear();
        }
    }

    fn deliveries(&self, request: &LlmRequest) -> Vec<MockDelivery> {
        match &self.mode {
            MockMode::Echo => vec![MockDelivery::new(Response::Text(request.prompt.clone()))],
            MockMode::Suffix(suffix) => vec![MockDelivery::new(Response::Text(format!(
                "{}_{}",
                request.prompt, suffix
            )))],
            MockMode::Script(script) => script.clone(),
            MockMode::Abort => vec![MockDelivery::new(Response::Aborted)],
            MockMode::Fail { status, error } => vec![MockDelivery {
                response: Response::Failed,
                status: status.clone(),
                error: error.clone(),
                include_context: true,
            }],
            MockMode::Hold | MockMode::Silent => Vec::new(),
        }
    }

    fn materialize(delivery: &MockDelivery, context: &TranslationRequest) -> (Response, RequestInfo) {
        let info = RequestInfo {
            context: delivery.include_context.then(|| context.clone()),
            status: delivery.status.clone(),
            error: delivery.error.clone(),
        };
        (delivery.response.clone(), info)
    }
}

impl std::fmt::Debug for MockRequestLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRequestLibrary")
            .field("mode", &self.mode)
            .field("delay_ms", &self.delay_ms)
            .field("available", &self.is_available())
            .field("requests", &self.request_count())
            .field("held", &self.held_count())
            .finish()
    }
}

impl RequestLibrary for MockRequestLibrary {
    fn name(&self) -> &str {
        "Mock Request Library"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn request(&self, request: LlmRequest, mut handler: ResponseHandler) {
        let deliveries = self.deliveries(&request);
        let context = request.context.clone();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        match self.mode {
            MockMode::Hold => {
                if let Ok(mut held) = self.held.lock() {
                    held.push((context, handler));
                }
                return;
            }
            MockMode::Silent => return,
            _ => {}
        }

        if self.delay_ms == 0 {
            for delivery in &deliveries {
                let (response, info) = Self::materialize(delivery, &context);
                handler(response, info);
            }
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            handler(
                Response::Failed,
                RequestInfo::with_context(context).with_error("no tokio runtime available"),
            );
            return;
        };

        let delay = Duration::from_millis(self.delay_ms);
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            for delivery in &deliveries {
                let (response, info) = Self::materialize(delivery, &context);
                handler(response, info);
            }
        });
    }
}
