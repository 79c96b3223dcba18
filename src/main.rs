//! Callbot CLI
//!
//! Usage:
//!   callbot --text "your text here"           # Single decision
//!   callbot --interactive                     # Simulated call on stdin
//!   callbot --serve                           # HTTP API server
//!   callbot --text "text" --json              # JSON output

use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::fmt::{MakeWriter, SubscriberBuilder};
use tracing_subscriber::EnvFilter;

use callbot::config::CallbotConfig;
use callbot::core::{run_server, AppState, Collaborators, ControllerSettings, DecisionEngine, SqliteStore, TurnController, TurnInput};
use callbot::types::{CallState, Route, TurnOutput};
use callbot::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "callbot",
    version = VERSION,
    about = "Insurance callbot - decide intent, urgency and routing for caller turns",
    long_about = "Callbot turns a caller utterance (transcript, emotion, audio metrics)\n\
                  into a decision {intent, urgency, action, confidence} and a route:\n\
                  answer, repeat, or hand off to a human agent.\n\n\
                  Modes:\n  \
                  --text         One-shot decision for a single utterance\n  \
                  --interactive  Simulated call, one caller turn per line\n  \
                  --serve        HTTP API server mode\n\n\
                  Call states:\n  \
                  AWAITING_INPUT    - Waiting for the caller\n  \
                  GOODBYE_PENDING   - Caller said goodbye once\n  \
                  FEEDBACK_PENDING  - Waiting for the satisfaction answer\n  \
                  ENDED             - Call over"
)]
struct Args {
    /// Text to evaluate (single mode)
    #[arg(short, long)]
    text: Option<String>,

    /// Interactive mode - read caller turns from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (overrides [server].addr)
    #[arg(long)]
    addr: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.log_json, args.no_color);

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = match &args.config {
        Some(path) => CallbotConfig::from_file(path),
        None => Ok(CallbotConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            std::process::exit(2);
        }
    };

    let result = if args.serve {
        run_serve(&args, &config)
    } else if let Some(ref text) = args.text {
        run_single(text, &args, &config)
    } else {
        run_interactive(&args, &config)
    };

    if let Err(err) = result {
        error!(%err, "callbot exited with error");
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(json: bool, no_color: bool) {
    let builder = log_builder(no_color, io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn log_builder<W>(no_color: bool, writer: W) -> SubscriberBuilder<DefaultFields, Format, EnvFilter, W>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("callbot=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(!no_color)
}

fn runtime() -> callbot::Result<Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread().enable_all().build()?)
}

/// Run single text evaluation
fn run_single(text: &str, args: &Args, config: &CallbotConfig) -> callbot::Result<()> {
    let engine = DecisionEngine::from_config(config)?;
    let routed = engine.evaluate(Some(text), None, None)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&routed).unwrap_or_default());
        return Ok(());
    }

    let d = &routed.decision;
    if args.no_color {
        println!(
            "intent={} | urgency={} | action={} | confidence={:.3} | route={}",
            d.intent,
            d.urgency,
            d.action,
            d.confidence,
            routed.route.as_str()
        );
    } else {
        println!(
            "{} intent={} urgency={} action={} conf={:.3}",
            "decision".bold(),
            d.intent,
            d.urgency,
            d.action,
            d.confidence
        );
        match &routed.route {
            Route::Escalate { reason } => println!("  {} {}", "escalate:".red().bold(), reason),
            Route::Repeat => println!("  {}", "repeat".yellow()),
            Route::Respond => println!("  {}", "respond".green()),
        }
    }
    Ok(())
}

/// Simulated call: each stdin line is one caller turn, an empty line is silence
fn run_interactive(args: &Args, config: &CallbotConfig) -> callbot::Result<()> {
    let rt = runtime()?;
    let engine = Arc::new(DecisionEngine::from_config(config)?);
    let store = Arc::new(SqliteStore::open(&config.database.path)?);
    let mut controller = TurnController::new(
        format!("cli_{}", uuid::Uuid::new_v4().simple()),
        engine,
        Collaborators::with_store(store),
        ControllerSettings::from(&config.conversation),
    );

    print_header(args.no_color);
    println!("One line per caller turn. Empty line = silence. Type 'quit' to hang up.");
    println!();
    println!("{} {}", bot_tag(args.no_color), controller.welcome());

    let mut lines = spawn_stdin_reader();
    drive_call(&rt, &mut controller, &mut lines, args)?;

    println!(
        "\nCall ended. Turns: {} | status: {}",
        controller.conversation().turn_number(),
        controller.status().map(|s| s.as_str()).unwrap_or("in_progress")
    );
    Ok(())
}

/// Stdin lines from a detached reader thread. The channel closes at EOF.
/// Abandoning a `recv` leaves nothing for the runtime to wait on at shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Turn loop until the call ends. A closed channel or "quit" hangs up.
fn drive_call(
    rt: &Runtime,
    controller: &mut TurnController,
    lines: &mut mpsc::UnboundedReceiver<String>,
    args: &Args,
) -> callbot::Result<()> {
    let mut stdout = io::stdout();

    while !controller.is_ended() {
        print!("{}", format_prompt(controller.state(), args.no_color));
        stdout.flush()?;

        let output = if controller.state() == CallState::FeedbackPending {
            rt.block_on(controller.await_feedback(async {
                lines.recv().await.map(|line| line.trim().to_string())
            }))
        } else {
            let Some(line) = rt.block_on(lines.recv()) else {
                controller.hang_up();
                break;
            };
            let line = line.trim();
            if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
                controller.hang_up();
                break;
            }
            controller.handle_turn(&TurnInput::text(line))
        };

        print_output(&output, args);
    }
    Ok(())
}

fn print_output(output: &TurnOutput, args: &Args) {
    if args.json {
        println!("{}", serde_json::to_string(output).unwrap_or_default());
    } else if args.no_color {
        println!("{}", output.to_parseable_string());
        if let Some(reply) = &output.reply {
            println!("bot: {reply}");
        }
    } else {
        println!("{}", output.to_terminal_string());
    }
}

fn print_header(no_color: bool) {
    let title = format!("Callbot v{VERSION} - simulated call");
    if no_color {
        println!("========================================");
        println!("  {title}");
        println!("========================================");
    } else {
        println!("{}", title.bold());
    }
    println!();
}

fn bot_tag(no_color: bool) -> String {
    if no_color {
        "bot:".to_string()
    } else {
        "bot:".cyan().to_string()
    }
}

fn format_prompt(state: CallState, no_color: bool) -> String {
    if no_color {
        format!("[{state}] > ")
    } else {
        format!("{} > ", format!("[{state}]").color(state.color()))
    }
}

/// Run HTTP API server
fn run_serve(args: &Args, config: &CallbotConfig) -> callbot::Result<()> {
    let addr = args.addr.clone().unwrap_or_else(|| config.server.addr.clone());
    let state = Arc::new(AppState::from_config(config)?);
    println!("Callbot API v{VERSION} on {addr} (decider: {})", state.engine.decider_name());
    runtime()?.block_on(run_server(&addr, state))
}
