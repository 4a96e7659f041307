use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use url::Url;

use voice_hand_history::config::{ReconcilerConfig, ValidationPolicy};
use voice_hand_history::history::{format_cards, HandSettings};
use voice_hand_history::logging::init_tracing;
use voice_hand_history::reconcile::chat::{DEFAULT_MODEL, GROQ_CHAT_URL};
use voice_hand_history::reconcile::{
    ChatInterpreter, ChatInterpreterConfig, FragmentInterpreter, FragmentOutcome, FragmentRecord,
    Reconciler, ScriptedInterpreter,
};
use voice_hand_history::replay::{compute_snapshot, Cursor, Playback, TableSnapshot, DEFAULT_TICK};

const LOG_TARGET: &str = "bin::hand_replay";

#[derive(Debug, Parser)]
#[command(name = "hand_replay")]
#[command(about = "Replay a spoken hand transcript into an Open Hand History document", long_about = None)]
struct Args {
    /// Transcript (one fragment per line) or, with --script, a recorded script
    input: PathBuf,

    /// Treat the input as a JSON array of recorded `{fragment, patches | error}` entries
    #[arg(long)]
    script: bool,

    /// API key for the chat-completions interpreter (falls back to GROQ_API_KEY)
    #[arg(long, env = "HAND_INTERPRETER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible chat-completions endpoint
    #[arg(long, env = "HAND_INTERPRETER_URL", default_value = GROQ_CHAT_URL)]
    interpreter_url: Url,

    /// Model name sent to the interpreter
    #[arg(long, env = "HAND_INTERPRETER_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Seconds to wait for one interpreter reply
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Commit batches that break error-level invariants (they are still logged)
    #[arg(long)]
    permissive: bool,

    /// JSON file of hand settings (table size, blinds, dealer seat, ...)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Where to write the final OHH JSON (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the table at ROUND:ACTION (action -1 is the start of the round)
    #[arg(long, value_parser = parse_cursor)]
    snapshot: Option<Cursor>,

    /// Walk the finished hand from the start, printing every step
    #[arg(long)]
    walk: bool,

    /// Pause between walk steps, in milliseconds (defaults to the auto-play tick)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "HAND_LOG_JSON", default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = Args::parse();
    init_tracing(args.json)?;

    let settings = load_settings(args.settings.as_ref())?;
    let config = ReconcilerConfig {
        interpreter_timeout: Duration::from_secs(args.timeout_secs),
        validation: if args.permissive {
            ValidationPolicy::Permissive
        } else {
            ValidationPolicy::Strict
        },
        ..Default::default()
    };

    let (interpreter, fragments) = build_interpreter(&args)?;
    info!(
        target: LOG_TARGET,
        interpreter = interpreter.name(),
        fragments = fragments.len(),
        "replaying transcript"
    );

    let mut reconciler = Reconciler::new(interpreter, settings, config);
    for fragment in fragments {
        let record = reconciler.process(fragment).await;
        println!("{}", describe_record(&record));
    }

    let failures = reconciler.log().failures().count();
    println!(
        "-- {} fragments, {} failed, state {}",
        reconciler.log().len(),
        failures,
        reconciler.hash().short()
    );

    let hand = reconciler.document();
    let ohh = serde_json::to_string_pretty(&hand.to_ohh_json()?)?;
    match &args.output {
        Some(path) => {
            fs::write(path, ohh).with_context(|| format!("failed to write {}", path.display()))?;
            info!(target: LOG_TARGET, path = %path.display(), "hand written");
        }
        None => println!("{ohh}"),
    }

    if let Some(cursor) = args.snapshot {
        println!("{}", describe_snapshot(&compute_snapshot(hand, cursor)));
    }

    if args.walk {
        let tick = args.tick_ms.map(Duration::from_millis).unwrap_or(DEFAULT_TICK);
        let mut playback = Playback::new();
        playback.seek(hand, Cursor::START);
        playback.play();
        println!("{}", describe_snapshot(&playback.snapshot(hand)));
        while playback.tick(hand) {
            if !tick.is_zero() {
                tokio::time::sleep(tick).await;
            }
            println!("{}", describe_snapshot(&playback.snapshot(hand)));
        }
    }

    Ok(())
}

fn load_dotenv() {
    let manifest_env = env!("CARGO_MANIFEST_DIR");
    let manifest_env_path = PathBuf::from(manifest_env).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

fn load_settings(path: Option<&PathBuf>) -> Result<HandSettings> {
    let Some(path) = path else {
        return Ok(HandSettings::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid settings in {}", path.display()))
}

fn build_interpreter(args: &Args) -> Result<(Arc<dyn FragmentInterpreter>, Vec<String>)> {
    if args.script {
        let scripted = ScriptedInterpreter::from_json_file(&args.input)
            .with_context(|| format!("failed to load script {}", args.input.display()))?;
        let fragments = scripted.fragments();
        return Ok((Arc::new(scripted), fragments));
    }

    let transcript = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read transcript {}", args.input.display()))?;
    let fragments = transcript
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect();

    let api_key = args
        .api_key
        .clone()
        .or_else(|| env::var("GROQ_API_KEY").ok())
        .ok_or_else(|| anyhow!("HAND_INTERPRETER_API_KEY or GROQ_API_KEY must be set"))?;
    let interpreter = ChatInterpreter::new(ChatInterpreterConfig {
        endpoint: args.interpreter_url.clone(),
        model: args.model.clone(),
        api_key,
        temperature: None,
    });
    Ok((Arc::new(interpreter), fragments))
}

fn parse_cursor(raw: &str) -> Result<Cursor, String> {
    let (round, action) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected ROUND:ACTION, got {raw:?}"))?;
    let round = round
        .trim()
        .parse()
        .map_err(|err| format!("bad round {round:?}: {err}"))?;
    let action: isize = action
        .trim()
        .parse()
        .map_err(|err| format!("bad action {action:?}: {err}"))?;
    if action < -1 {
        return Err("action must be -1 or greater".to_owned());
    }
    Ok(Cursor::new(round, action))
}

fn describe_record(record: &FragmentRecord) -> String {
    let detail = match &record.outcome {
        FragmentOutcome::Committed {
            operations,
            state_hash,
            change,
        } => {
            let from = change.map_or_else(|| "-".to_owned(), |cursor| cursor.to_string());
            format!("{} ops, state {}, from {}", operations.len(), state_hash.short(), from)
        }
        FragmentOutcome::NoOp => "nothing to record".to_owned(),
        FragmentOutcome::InterpretFailed { reason } => reason.to_string(),
        FragmentOutcome::Rejected { error, .. } => error.to_string(),
    };
    format!(
        "#{:<3} {:<16} {:?} -> {}",
        record.sequence,
        record.outcome.label(),
        record.fragment,
        detail
    )
}

fn describe_snapshot(snapshot: &TableSnapshot) -> String {
    let mut line = format!(
        "{} {} pot={} board=[{}]",
        snapshot.cursor,
        snapshot.street,
        snapshot.pot,
        format_cards(&snapshot.board)
    );
    for player in &snapshot.players {
        let marker = if player.is_next_to_act { "*" } else { "" };
        let state = if player.folded { " folded" } else { "" };
        line.push_str(&format!(
            " | {}{}@{} {}/{}{}{}",
            marker,
            player.name,
            player.seat,
            player.stack,
            player.wager,
            state,
            player
                .last_action
                .as_deref()
                .map(|label| format!(" ({label})"))
                .unwrap_or_default()
        ));
    }
    if snapshot.hand_complete {
        line.push_str(" | complete");
    }
    line
}
