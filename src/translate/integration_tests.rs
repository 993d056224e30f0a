//! End-to-end tests for the translation adapter
//!
//! These drive [`TranslateAdapter`] against both request libraries: the mock
//! for deterministic flows, and [`ChatCompletionsLibrary`] over an in-process
//! transport for the HTTP mapping. The live test needs a real key:
//!
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo test --lib translate::integration_tests -- --ignored --nocapture
//! ```

#[cfg(test)]
mod tests {
    use super::super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn adapter(library: Arc<dyn RequestLibrary>, config: AdapterConfig) -> TranslateAdapter {
        TranslateAdapter::new(library, config, HostDefaults::default())
            .expect("valid adapter config")
    }

    /// Transport that answers every request with the same chat response
    struct FixedReply(String);

    #[async_trait]
    impl ChatTransport for FixedReply {
        async fn send(
            &self,
            _endpoint: &BackendEndpoint,
            request: &ChatRequest,
        ) -> AdapterResult<TransportReply> {
            let user = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(TransportReply {
                status: 200,
                body: json!({
                    "choices": [{"message": {
                        "reasoning_content": format!("translating '{}'", user),
                        "content": self.0,
                    }}]
                })
                .to_string(),
            })
        }
    }

    // ============================================================================
    // Mock library flows
    // ============================================================================

    #[tokio::test]
    async fn test_e2e_input_through_template() {
        let library = Arc::new(MockRequestLibrary::new(MockMode::Echo));
        let config = AdapterConfig::default()
            .with_backend("mock")
            .with_model("tiny")
            .with_user_prompt_template("<translate lang=\"fr\">%s</translate>");
        let adapter = adapter(library.clone(), config);

        let request = TranslationRequest::new(Content::Input("Good evening".to_string()))
            .with_buffer("letter.txt")
            .with_position(256);
        let original = request.clone();

        let completion = adapter.translate_async(&request).await.unwrap();
        let sent = "<translate lang=\"fr\">Good evening</translate>";

        assert_eq!(completion.result, Ok(sent.to_string()));
        assert_eq!(completion.request.content, Content::Prompt(sent.to_string()));
        assert_eq!(completion.request.buffer.as_deref(), Some("letter.txt"));
        assert_eq!(completion.request.position, Some(256));
        assert_eq!(completion.request.backend.as_deref(), Some("mock"));
        assert_eq!(completion.request.model.as_deref(), Some("tiny"));
        assert_eq!(request, original);
        assert_eq!(library.request_count(), 1);
    }

    #[tokio::test]
    async fn test_e2e_pending_until_terminal() {
        let library = Arc::new(MockRequestLibrary::new(MockMode::Hold));
        let adapter = adapter(library.clone(), AdapterConfig::default().with_backend("mock"));

        let calls: Arc<Mutex<Vec<TranslationResult>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let callback: Callback = Box::new(move |result, _| sink.lock().unwrap().push(result));
        let request = TranslationRequest::new(Content::Prompt("p".to_string()));
        adapter.translate(&request, Some(callback)).unwrap();

        // Dispatched, nothing delivered yet
        assert_eq!(library.held_count(), 1);
        assert!(calls.lock().unwrap().is_empty());

        library.release(MockDelivery::new(Response::Reasoning("...".to_string())));
        library.release(MockDelivery::new(Response::ToolResult(json!({"ok": true}))));
        assert!(calls.lock().unwrap().is_empty());

        library.release(MockDelivery::new(Response::Aborted));
        library.release(MockDelivery::new(Response::Text("late".to_string())));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            Err(TranslationFailure {
                message: "[immersive-translate] Translation failed.".to_string(),
                status: None,
                error: None,
            })
        );
    }

    #[tokio::test]
    async fn test_e2e_concurrent_requests_are_independent() {
        let library = Arc::new(MockRequestLibrary::with_delay(
            MockMode::Suffix("es".to_string()),
            10,
        ));
        let adapter = adapter(library.clone(), AdapterConfig::default().with_backend("mock"));

        let first = TranslationRequest::new(Content::Prompt("one".to_string())).with_position(1);
        let second = TranslationRequest::new(Content::Prompt("two".to_string())).with_position(2);

        let (a, b) = tokio::join!(
            adapter.translate_async(&first),
            adapter.translate_async(&second)
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.result, Ok("one_es".to_string()));
        assert_eq!(a.request.position, Some(1));
        assert_eq!(b.result, Ok("two_es".to_string()));
        assert_eq!(b.request.position, Some(2));
        assert_eq!(library.request_count(), 2);
    }

    #[tokio::test]
    async fn test_e2e_failure_is_inspectable() {
        let library = Arc::new(MockRequestLibrary::new(MockMode::Fail {
            status: Some("500".to_string()),
            error: Some("  internal error ".to_string()),
        }));
        let config = AdapterConfig::default()
            .with_backend("mock")
            .with_error_prefix("  llm: ");
        let adapter = adapter(library, config);

        let request = TranslationRequest::new(Content::Input("x".to_string()));
        let completion = adapter.translate_async(&request).await.unwrap();

        let failure = completion.result.unwrap_err();
        assert!(failure.message.starts_with("llm:"));
        assert!(failure.message.ends_with(FAILURE_NOTICE));
        assert_eq!(failure.message, failure.message.trim());
        assert_eq!(failure.message, "llm:  500   internal error  Translation failed.");
        assert_eq!(failure.error.as_deref(), Some("  internal error "));
        assert_eq!(completion.request.status.as_deref(), Some("500"));
    }

    #[tokio::test]
    async fn test_e2e_no_backend_anywhere() {
        let library = Arc::new(MockRequestLibrary::new(MockMode::Echo));
        let adapter = TranslateAdapter::new(
            library.clone(),
            AdapterConfig::default().with_model("gpt-4o"),
            HostDefaults::new(None, Some("gpt-4o".to_string())),
        )
        .unwrap();

        let request = TranslationRequest::new(Content::Input("x".to_string()));
        assert!(matches!(
            adapter.translate_async(&request).await,
            Err(AdapterError::NoBackend)
        ));
        assert_eq!(library.request_count(), 0);
    }

    // ============================================================================
    // Chat-completions library flows
    // ============================================================================

    #[tokio::test]
    async fn test_e2e_chat_library_reasoning_suppressed() {
        let library = Arc::new(
            ChatCompletionsLibrary::new(Arc::new(FixedReply("Bonsoir".to_string())))
                .with_backend(
                    "deepseek",
                    BackendEndpoint::new("https://api.deepseek.com/v1")
                        .with_default_model("deepseek-reasoner"),
                ),
        );
        let host = HostDefaults::new(Some("deepseek".to_string()), None);
        let adapter = TranslateAdapter::new(library, AdapterConfig::default(), host).unwrap();

        let request = TranslationRequest::new(Content::Input("Good evening".to_string()));
        let completion = adapter.translate_async(&request).await.unwrap();

        assert_eq!(completion.result, Ok("Bonsoir".to_string()));
        assert_eq!(completion.request.status.as_deref(), Some("200"));
        assert_eq!(completion.request.backend.as_deref(), Some("deepseek"));
        // The library filled in its own default model; the descriptor only
        // records what the adapter resolved
        assert_eq!(completion.request.model, None);
    }

    #[tokio::test]
    async fn test_e2e_chat_library_cancel() {
        struct Never;

        #[async_trait]
        impl ChatTransport for Never {
            async fn send(
                &self,
                _endpoint: &BackendEndpoint,
                _request: &ChatRequest,
            ) -> AdapterResult<TransportReply> {
                std::future::pending().await
            }
        }

        let library = Arc::new(ChatCompletionsLibrary::new(Arc::new(Never)).with_backend(
            "local",
            BackendEndpoint::new("http://localhost:8080/v1").with_default_model("m"),
        ));
        let adapter = adapter(library.clone(), AdapterConfig::default().with_backend("local"));

        let request = TranslationRequest::new(Content::Prompt("wait".to_string()));
        let pending = adapter.translate_async(&request);
        tokio::pin!(pending);

        // Let the request dispatch before cancelling
        tokio::select! {
            _ = &mut pending => panic!("request should still be pending"),
            _ = tokio::task::yield_now() => {}
        }
        library.cancel_all();

        let completion = pending.await.unwrap();
        let failure = completion.result.unwrap_err();
        assert_eq!(failure.message, "[immersive-translate] Translation failed.");
    }

    #[test]
    fn test_e2e_chat_library_without_runtime() {
        let library = Arc::new(
            ChatCompletionsLibrary::new(Arc::new(FixedReply("unused".to_string()))).with_backend(
                "local",
                BackendEndpoint::new("http://localhost:11434/v1").with_default_model("qwen2.5"),
            ),
        );
        let adapter = adapter(library, AdapterConfig::default().with_backend("local"));

        let calls: Arc<Mutex<Vec<Completion>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let callback: Callback =
            Box::new(move |result, request| sink.lock().unwrap().push(Completion { result, request }));
        let request = TranslationRequest::new(Content::Input("Good evening".to_string()));
        adapter.translate(&request, Some(callback)).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let failure = calls[0].result.clone().unwrap_err();
        assert_eq!(failure.error.as_deref(), Some("no tokio runtime available"));
        assert_eq!(calls[0].request.backend.as_deref(), Some("local"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_e2e_real_api() {
        if std::env::var("OPENAI_API_KEY").is_err() {
            eprintln!("⚠️  Skipping: OPENAI_API_KEY not set");
            return;
        }

        let library = Arc::new(ChatCompletionsLibrary::from_env().unwrap());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let config = AdapterConfig::default()
            .with_backend("openai")
            .with_model(model)
            .with_user_prompt_template("Translate into French, reply with the translation only:\n\n%s");
        let adapter = adapter(library, config);

        let request = TranslationRequest::new(Content::Input("Good morning".to_string()));
        let completion = adapter.translate_async(&request).await.unwrap();

        println!("📝 Result: {:?}", completion.result);
        assert!(completion.result.is_ok());
    }
}
