//! qwen-agent — streaming tool-call agent server core.
//!
//! The `chat` command runs one conversation through the inference loop and
//! prints the newline-delimited JSON event stream on stdout; a network
//! listener in front of this crate forwards the same events verbatim.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use qwen_agent::agent::tools::build_registry;
use qwen_agent::agent::{AgentLoop, ChatMessage, ChatRequest};
use qwen_agent::agent::wire::error_body;
use qwen_agent::config::{load_config, Config};
use qwen_agent::logging::{InferenceLogger, StreamLogger};
use qwen_agent::providers::{LLMProvider, OpenAICompatProvider};

#[derive(Parser)]
#[command(name = "qwen-agent", about = "Qwen agentic server core", version)]
struct Cli {
    /// Path to the JSON config file (defaults to ~/.qwen-agent/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one conversation and stream NDJSON events to stdout.
    Chat {
        /// Single user message. Omit to read a full request JSON from stdin.
        #[arg(short, long)]
        message: Option<String>,
        /// Session id (generated if not provided).
        #[arg(short, long)]
        session: Option<String>,
        /// Sampling temperature override.
        #[arg(long)]
        temperature: Option<f64>,
        /// Max output tokens override.
        #[arg(long)]
        max_tokens: Option<u32>,
        /// API key for the model endpoint.
        #[arg(long)]
        api_key: Option<String>,
        /// Base URL for the model endpoint.
        #[arg(long)]
        base_url: Option<String>,
        /// Model name to use.
        #[arg(long)]
        model: Option<String>,
        /// Rate limit pause in seconds before each model stream.
        #[arg(long)]
        rate_limit: Option<u64>,
    },
    /// Print the registered tool catalogue as JSON.
    Tools,
    /// Delete streaming log files abandoned by crashed sessions.
    Cleanup {
        /// Age threshold in hours.
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
}

fn setup_tracing() {
    // Events go to stderr: stdout carries only the NDJSON stream.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() {
    setup_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let exit_code = match cli.command {
        Commands::Chat {
            message,
            session,
            temperature,
            max_tokens,
            api_key,
            base_url,
            model,
            rate_limit,
        } => {
            let mut config = config;
            if let Some(key) = api_key {
                config.provider.api_key = key;
            }
            if let Some(url) = base_url {
                config.provider.base_url = url;
            }
            if let Some(m) = model {
                config.provider.model = m;
            }
            if let Some(secs) = rate_limit {
                config.provider.rate_limit_pause_secs = secs;
            }

            run_chat(config, message, session, temperature, max_tokens).await
        }
        Commands::Tools => {
            let registry = build_registry(&config.tools);
            let catalogue = serde_json::Value::Array(registry.definitions());
            println!("{}", serde_json::to_string_pretty(&catalogue).unwrap_or_default());
            0
        }
        Commands::Cleanup { max_age_hours } => {
            let base_dir = PathBuf::from(&config.logging.directory);
            let hours = max_age_hours.unwrap_or(config.logging.streaming.stale_max_age_hours);
            let stream_log = StreamLogger::new(&base_dir, &config.logging.streaming);
            let removed = stream_log.cleanup_stale(Duration::from_secs(hours * 3600));
            println!("Removed {} stale streaming log file(s)", removed);
            0
        }
    };

    std::process::exit(exit_code);
}

async fn run_chat(
    config: Config,
    message: Option<String>,
    session: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
) -> i32 {
    if let Err(e) = config.validate_provider() {
        eprintln!("Error: {}", e);
        return 1;
    }

    // Assemble the request: either a single --message or a full request
    // document on stdin. A malformed document yields one structured error
    // object and no stream.
    let mut request = match message {
        Some(content) => ChatRequest {
            messages: vec![ChatMessage::new("user", &content)],
            temperature: config.agent.temperature,
            max_output_tokens: config.agent.max_tokens,
        },
        None => {
            let mut body = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut body) {
                println!("{}", error_body(&format!("failed to read stdin: {}", e)));
                return 2;
            }
            match ChatRequest::from_json_str(&body) {
                Ok(req) => req,
                Err(e) => {
                    println!("{}", error_body(&e));
                    return 2;
                }
            }
        }
    };
    if let Some(t) = temperature {
        request.temperature = t;
    }
    if let Some(m) = max_tokens {
        request.max_output_tokens = m;
    }

    let session_id = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    // Composition root: provider, registry, and both loggers are built here
    // and handed to the loop by reference.
    let provider: Arc<dyn LLMProvider> = Arc::new(OpenAICompatProvider::new(
        &config.provider.api_key,
        &config.provider.base_url,
        &config.provider.model,
    ));
    let registry = Arc::new(build_registry(&config.tools));

    let base_dir = PathBuf::from(&config.logging.directory);
    let stream_log = StreamLogger::new(&base_dir, &config.logging.streaming);
    let flush_worker = stream_log.spawn_flush_worker();
    let inference_log = InferenceLogger::new(&base_dir, &config.logging);

    let agent_loop = AgentLoop::new(
        provider,
        registry,
        Arc::clone(&stream_log),
        Arc::clone(&inference_log),
        &config,
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<qwen_agent::agent::StreamEvent>();
    let printer = tokio::spawn(async move {
        use std::io::Write;
        let stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            let mut lock = stdout.lock();
            let _ = lock.write_all(event.to_ndjson_line().as_bytes());
            let _ = lock.flush();
        }
    });

    let result = agent_loop.run(&session_id, request, &tx).await;
    drop(tx);
    let _ = printer.await;
    flush_worker.abort();

    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: inference failed: {}", e);
            1
        }
    }
}
