use std::io::Write;
use std::process::ExitCode;
use std::time::Instant;

use agent_bridge::config::load_config;
use agent_bridge::error::{BridgeError, ErrorCategory};
use agent_bridge::observability::{init_tracing, log_stream_complete};
use agent_bridge::protocol::events::{FinishReason, NormalizedEvent};
use agent_bridge::protocol::prompt::ConversationMessage;
use agent_bridge::transport::{CallOptions, Provider, ProviderSettings};
use futures_util::StreamExt;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const USAGE: &str = "usage: agent-bridge [--config PATH] <agent-name> <prompt...>";

struct Args {
    config_path: String,
    agent_name: String,
    prompt: String,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut positional = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config_path = args.next().ok_or("--config requires a path")?;
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            _ => positional.push(arg),
        }
    }
    let mut positional = positional.into_iter();
    let agent_name = positional.next().ok_or(USAGE)?;
    let prompt = positional.collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        return Err(USAGE.to_string());
    }
    Ok(Args {
        config_path,
        agent_name,
        prompt,
    })
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let config = load_config(&args.config_path).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {e}");
        eprintln!("Please copy 'config.example.yaml' to 'config.yaml' and modify as needed.");
        std::process::exit(1);
    });

    init_tracing(&config.features.log_level, config.features.log_format);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Failed to initialize Tokio runtime: {e}");
            std::process::exit(1);
        });

    let settings = ProviderSettings::from_config(&config.agent);
    match runtime.block_on(run(settings, args)) {
        Ok(FinishReason::Error) => ExitCode::from(3),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn exit_code_for(err: &BridgeError) -> u8 {
    match err.category() {
        ErrorCategory::InvalidRequest | ErrorCategory::Unsupported => 2,
        _ => 1,
    }
}

async fn run(settings: ProviderSettings, args: Args) -> Result<FinishReason, BridgeError> {
    let provider = Provider::new(settings)?;
    let model = provider.language_model(args.agent_name);
    let options = CallOptions::new(vec![ConversationMessage::user_text(args.prompt)]);

    let start = Instant::now();
    let response = model.stream(options).await?;

    let abort_handle = response.abort_handle.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling agent stream");
            abort_handle.abort();
        }
    });

    let mut events = response.events;
    let mut count = 0usize;
    let mut reason = FinishReason::Unknown;
    let stdout = std::io::stdout();
    while let Some(event) = events.next().await {
        count += 1;
        if let NormalizedEvent::Finish { reason: final_reason, .. } = &event {
            reason = *final_reason;
        }
        let line = serde_json::to_string(&event)
            .map_err(|err| BridgeError::Internal(format!("failed to encode event: {err}")))?;
        let mut out = stdout.lock();
        if writeln!(out, "{line}").and_then(|()| out.flush()).is_err() {
            response.abort_handle.abort();
            break;
        }
    }
    interrupt.abort();

    log_stream_complete(model.agent_name(), reason, count, start);
    Ok(reason)
}
