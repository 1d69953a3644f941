mod cli;
mod tools;

use std::io::Write;
use std::sync::Arc;

use callstream_ai::{DashScopeClient, DashScopeConfig, Session};
use callstream_common::{CallstreamError, ConfigError};
use callstream_config::CallstreamConfig;
use futures_util::StreamExt;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

/// Load environment variables from a .env file (KEY=VALUE lines).
fn load_dotenv() {
    let manifest_dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidates = [
        // Current directory
        std::path::PathBuf::from(".env"),
        // Workspace root, two levels up from crates/callstream-app/
        manifest_dir.join("..").join("..").join(".env"),
    ];

    for path in &candidates {
        if let Ok(contents) = std::fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    if std::env::var(key).is_err() {
                        std::env::set_var(key, value);
                    }
                }
            }
            return;
        }
    }
}

fn init_logging(level: Option<&str>) {
    let directive = level
        .map(|l| if l.contains('=') { l.to_string() } else { format!("callstream={l}") })
        .unwrap_or_else(|| "callstream=warn".to_string());

    let filter = match directive.parse() {
        Ok(d) => EnvFilter::from_default_env().add_directive(d),
        Err(e) => {
            eprintln!("ignoring invalid log level {directive:?}: {e}");
            EnvFilter::from_default_env()
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&str>) -> CallstreamConfig {
    let loaded = match path {
        Some(path) => {
            tracing::info!("Using config override: {path}");
            callstream_config::load_config_from(std::path::Path::new(path))
        }
        None => callstream_config::load_config(),
    };
    loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        CallstreamConfig::default()
    })
}

/// Transport settings from config; `model` overrides the configured one.
fn transport_config(
    config: &CallstreamConfig,
    model: Option<&str>,
    api_key: String,
) -> DashScopeConfig {
    let transport = DashScopeConfig::new(api_key)
        .with_model(model.unwrap_or(config.model.model.as_str()))
        .with_temperature(config.model.temperature);
    match config.model.endpoint {
        Some(ref endpoint) => transport.with_endpoint(endpoint.clone()),
        None => transport,
    }
}

fn build_session(config: &CallstreamConfig, model: Option<&str>) -> Result<Session, CallstreamError> {
    let key_env = &config.model.api_key_env;
    let api_key = std::env::var(key_env)
        .ok()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ConfigError::MissingCredential(key_env.clone()))?;

    let transport = transport_config(config, model, api_key);
    tracing::info!("Model: {}", transport.model);

    let client = DashScopeClient::new(transport).map_err(|e| CallstreamError::Ai(e.to_string()))?;

    let mut session = Session::new(Arc::new(client), tools::registry())
        .with_max_tool_rounds(config.session.max_tool_rounds);
    if let Some(ref prompt) = config.session.system_prompt {
        session = session.with_system_prompt(prompt.clone());
    }
    Ok(session)
}

/// Run one turn, printing text pieces as they arrive.
async fn run_turn(session: &mut Session, prompt: String) -> Result<(), CallstreamError> {
    let mut stdout = std::io::stdout();
    let mut turn = session.submit(prompt);
    while let Some(piece) = turn.next().await {
        match piece {
            Ok(text) => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            Err(e) => {
                writeln!(stdout)?;
                return Err(CallstreamError::Ai(e.to_string()));
            }
        }
    }
    writeln!(stdout)?;
    Ok(())
}

async fn interactive(session: &mut Session) -> Result<(), CallstreamError> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                println!("(history cleared)");
            }
            "/usage" => {
                let total = session.tracker().total();
                println!(
                    "{} exchanges, {} input + {} output tokens",
                    session.tracker().call_count(),
                    total.input_tokens,
                    total.output_tokens
                );
            }
            prompt => {
                if let Err(e) = run_turn(session, prompt.to_string()).await {
                    eprintln!("error: {e}");
                }
            }
        }
    }
    Ok(())
}

async fn run(args: cli::Args) -> Result<(), CallstreamError> {
    let config = load_config(args.config.as_deref());
    let mut session = build_session(&config, args.model.as_deref())?;

    match args.one_shot() {
        Some(prompt) => run_turn(&mut session, prompt).await,
        None => interactive(&mut session).await,
    }?;

    tracing::info!(
        exchanges = session.tracker().call_count(),
        tokens = session.tracker().total_tokens(),
        "Session finished"
    );
    Ok(())
}

fn main() {
    // Load .env file before anything else, while the process is still
    // single-threaded.
    load_dotenv();

    let args = cli::parse();
    init_logging(args.log_level.as_deref());

    tracing::info!("Callstream v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CallstreamError::from)
        .and_then(|runtime| runtime.block_on(run(args)));

    if let Err(e) = result {
        tracing::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
