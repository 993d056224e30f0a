//! Translation request adapter
//!
//! Routes "immersive translate" requests from an editor integration through an
//! LLM request library and hands the outcome back to a one-shot callback.
//!
//! # Overview
//!
//! 1. **Descriptor** - [`TranslationRequest`] with the content and its target buffer/position
//! 2. **Configuration** - [`AdapterConfig`] overrides layered over [`HostDefaults`]
//! 3. **Request library** - the [`RequestLibrary`] trait, with a scripted
//!    [`MockRequestLibrary`] and the HTTP-backed [`ChatCompletionsLibrary`]
//! 4. **Adapter** - [`TranslateAdapter`] builds the prompt, dispatches, and maps
//!    each [`Response`] to at most one callback invocation
//!
//! # Example
//!
//! ```ignore
//! use immersive_translate::translate::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let library = Arc::new(MockRequestLibrary::new(MockMode::Suffix("fr".into())));
//!     let adapter = TranslateAdapter::new(
//!         library,
//!         AdapterConfig::default().with_backend("mock"),
//!         HostDefaults::default(),
//!     )?;
//!
//!     let request = TranslationRequest::new(Content::Prompt("Hello".into()));
//!     match adapter.translate_async(&request).await?.result {
//!         Ok(text) => println!("{}", text),
//!         Err(failure) => eprintln!("{}", failure),
//!     }
//!     Ok(())
//! }
//! ```
pub mod adapter;
pub mod chat_completions;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod library;
pub mod mock;
pub mod prompt;

#[cfg(test)]
mod integration_tests;

pub use adapter::{Callback, Completion, DefaultHandler, TranslateAdapter, log_completion};
pub use chat_completions::{
    BackendEndpoint, ChatCompletionsLibrary, ChatMessage, ChatRequest, ChatTransport,
    DEFAULT_OPENAI_BASE_URL, HttpTransport, TransportReply,
};
pub use config::{AdapterConfig, EffectiveTarget, HostDefaults, resolve_target};
pub use descriptor::{Content, TranslationRequest};
pub use error::{AdapterError, AdapterResult, TranslationFailure, TranslationResult};
pub use library::{LlmRequest, RequestInfo, RequestLibrary, Response, ResponseHandler};
pub use mock::{MockDelivery, MockMode, MockRequestLibrary};
pub use prompt::{FAILURE_NOTICE, PLACEHOLDER, build_prompt, failure_message};
