use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use url::Url;

use voice_hand_history::config::{ReconcilerConfig, ValidationPolicy};
use voice_hand_history::history::HandSettings;
use voice_hand_history::logging::init_tracing;
use voice_hand_history::reconcile::chat::{DEFAULT_MODEL, GROQ_CHAT_URL};
use voice_hand_history::reconcile::{
    ChatInterpreter, ChatInterpreterConfig, FragmentInterpreter, Reconciler, ScriptedInterpreter,
};
use voice_hand_history::server::{run_server, ServerConfig};

const DEFAULT_BIND: &str = "127.0.0.1:4000";

#[derive(Debug, Parser)]
#[command(name = "hand_history_server")]
#[command(about = "Serve the voice hand-history reconciler over HTTP", long_about = None)]
struct Args {
    /// Address to bind the HTTP server to (host:port)
    #[arg(long, env = "HAND_SERVER_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// API key for the chat-completions interpreter (falls back to GROQ_API_KEY)
    #[arg(long, env = "HAND_INTERPRETER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible chat-completions endpoint
    #[arg(long, env = "HAND_INTERPRETER_URL", default_value = GROQ_CHAT_URL)]
    interpreter_url: Url,

    /// Model name sent to the interpreter
    #[arg(long, env = "HAND_INTERPRETER_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Serve a recorded script instead of calling a model
    #[arg(long)]
    script: Option<PathBuf>,

    /// Seconds to wait for one interpreter reply
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Commit batches that break error-level invariants (they are still logged)
    #[arg(long)]
    permissive: bool,

    /// JSON file of hand settings used for new and reset hands
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "HAND_LOG_JSON", default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json)?;
    let config = build_config(args).context("failed to build server config")?;
    run_server(config).await
}

fn load_dotenv() {
    let manifest_env = env!("CARGO_MANIFEST_DIR");
    let manifest_env_path = PathBuf::from(manifest_env).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

fn build_config(args: Args) -> Result<ServerConfig> {
    let settings = match &args.settings {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings {}", path.display()))?;
            serde_json::from_str::<HandSettings>(&raw)
                .with_context(|| format!("invalid settings in {}", path.display()))?
        }
        None => HandSettings::default(),
    };

    let interpreter: Arc<dyn FragmentInterpreter> = match &args.script {
        Some(path) => Arc::new(
            ScriptedInterpreter::from_json_file(path)
                .with_context(|| format!("failed to load script {}", path.display()))?,
        ),
        None => {
            let api_key = args
                .api_key
                .clone()
                .or_else(|| env::var("GROQ_API_KEY").ok())
                .ok_or_else(|| anyhow!("HAND_INTERPRETER_API_KEY or GROQ_API_KEY must be set"))?;
            Arc::new(ChatInterpreter::new(ChatInterpreterConfig {
                endpoint: args.interpreter_url.clone(),
                model: args.model.clone(),
                api_key,
                temperature: None,
            }))
        }
    };

    let config = ReconcilerConfig {
        interpreter_timeout: Duration::from_secs(args.timeout_secs),
        validation: if args.permissive {
            ValidationPolicy::Permissive
        } else {
            ValidationPolicy::Strict
        },
        ..Default::default()
    };

    Ok(ServerConfig {
        bind: args.bind,
        reconciler: Reconciler::new(interpreter, settings, config),
    })
}
