use clap::{Arg, ArgAction, Command};
use immersive_translate::translate::{
    AdapterConfig, BackendEndpoint, ChatCompletionsLibrary, Content, HostDefaults, MockMode,
    MockRequestLibrary, RequestLibrary, TranslateAdapter, TranslationRequest,
};
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("immersive-translate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Translate text through an OpenAI-compatible LLM endpoint")
        .arg(
            Arg::new("text")
                .help("Text to translate (reads stdin when omitted or '-')")
                .index(1),
        )
        .arg(
            Arg::new("prompt")
                .long("prompt")
                .short('p')
                .help("Send the text verbatim instead of filling the prompt template")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .short('b')
                .help("Backend override (default: LLM_DEFAULT_BACKEND, then 'openai')"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .short('m')
                .help("Model override (default: LLM_DEFAULT_MODEL or OPENAI_MODEL)"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .help("Chat-completions base URL, e.g. http://localhost:11434/v1"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .help("API key (default: OPENAI_API_KEY)"),
        )
        .arg(
            Arg::new("stream")
                .long("stream")
                .help("Ask the request library to stream")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("JSON adapter config file"),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .help("Use the mock request library (echoes the prompt)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log the request flow to stderr")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // 1. Configuration
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => AdapterConfig::from_json_file(path)?,
        None => AdapterConfig::from_env()?,
    };
    if let Some(backend) = matches.get_one::<String>("backend") {
        config.backend = Some(backend.clone());
    }
    if let Some(model) = matches.get_one::<String>("model") {
        config.model = Some(model.clone());
    }
    if matches.get_flag("stream") {
        config.stream = true;
    }

    let mut host = HostDefaults::from_env();

    // 2. Request library
    let library: Arc<dyn RequestLibrary> = if matches.get_flag("mock") {
        host.backend.get_or_insert_with(|| "mock".to_string());
        Arc::new(MockRequestLibrary::new(MockMode::Echo))
    } else {
        // The endpoint is registered under whatever backend the adapter resolves
        let name = config
            .backend
            .clone()
            .or_else(|| host.backend.clone())
            .unwrap_or_else(|| "openai".to_string());
        let api_key = matches.get_one::<String>("api-key");
        let base_url = matches.get_one::<String>("base-url");

        let library = if api_key.is_none() && base_url.is_none() {
            ChatCompletionsLibrary::from_env_as(name.clone())?
        } else {
            let mut endpoint = BackendEndpoint::from_env();
            if let Some(base_url) = base_url {
                endpoint.base_url = base_url.clone();
            }
            if let Some(api_key) = api_key {
                endpoint = endpoint.with_api_key(api_key.clone());
            }
            ChatCompletionsLibrary::with_http()?.with_backend(name.clone(), endpoint)
        };

        host.backend.get_or_insert(name);
        if host.model.is_none() {
            host.model = std::env::var("OPENAI_MODEL")
                .ok()
                .filter(|model| !model.trim().is_empty());
        }
        Arc::new(library)
    };

    let adapter = TranslateAdapter::new(library, config, host)?;
    let (config, host) = (adapter.config(), adapter.host_defaults());
    debug!(
        backend = config.backend.as_deref().or(host.backend.as_deref()),
        model = config.model.as_deref().or(host.model.as_deref()),
        stream = config.stream,
        "Adapter ready"
    );

    // 3. Request
    let text = match matches.get_one::<String>("text").map(String::as_str) {
        Some("-") | None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            input
        }
        Some(text) => text.to_string(),
    };
    let content = if matches.get_flag("prompt") {
        Content::Prompt(text)
    } else {
        Content::Input(text)
    };

    // 4. Translate
    let completion = adapter.translate_async(&TranslationRequest::new(content)).await?;
    info!(
        backend = completion.request.backend.as_deref().unwrap_or_default(),
        model = completion.request.model.as_deref().unwrap_or_default(),
        status = completion.request.status.as_deref().unwrap_or_default(),
        "Request finished"
    );

    match completion.result {
        Ok(translation) => {
            println!("{}", translation);
            Ok(())
        }
        Err(failure) => {
            eprintln!("❌ {}", failure);
            std::process::exit(1);
        }
    }
}
