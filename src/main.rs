//! Blinkscan CLI
//!
//! Usage:
//!   blinkscan                               # Talk mode, eye input from stdin
//!   blinkscan --train                       # Training mode
//!   blinkscan --ticks 20 --json             # Headless run, one log entry per tick
//!   blinkscan --serve                       # HTTP API server
//!   blinkscan --alphabet grid.json --record # Custom catalog, write a frame log

use std::sync::Arc;
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use blinkscan::core::{
    build_log_entry, is_probability, load_alphabet, new_session_id, run_server, FrameLogWriter, ScanSession, ServerConfig,
    SessionConfig, SessionHandle,
};
use blinkscan::types::{
    Alphabet, CellHighlight, CellText, ConfigurationError, EyeSample, Sensitivity, SessionEvent,
    SessionMode, TickReport,
};
use blinkscan::{DEFAULT_TICK_INTERVAL_MS, GRID_COLUMNS, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "blinkscan",
    version = VERSION,
    about = "Blinkscan - select characters from a scanning grid by winking",
    long_about = "Blinkscan highlights one character of an alphabet grid at a time.\n\
                  Closing the right eye pauses the scan on the highlighted character;\n\
                  opening it again selects it and restarts the scan.\n\n\
                  Modes:\n  \
                  (default)  Talk mode, eye readings typed on stdin\n  \
                  --train    Training mode, guided through the training words\n  \
                  --serve    HTTP API server mode\n\n\
                  Stdin commands:\n  \
                  c / o        eye closed / open\n  \
                  0.0-1.0      right-eye open probability\n  \
                  p / r / g    pause / reset / resume\n  \
                  s <ms>       change interval\n  \
                  q            quit"
)]
struct Args {
    /// Training mode
    #[arg(short, long)]
    train: bool,

    /// Milliseconds per highlighted character
    #[arg(short, long, default_value_t = DEFAULT_TICK_INTERVAL_MS)]
    interval_ms: u32,

    /// Alphabet catalog JSON (default: built-in a-z grid)
    #[arg(short, long)]
    alphabet: Option<String>,

    /// How far the eye must close: strict or lenient
    #[arg(long, default_value = "lenient")]
    sensitivity: Sensitivity,

    /// Stop after this many ticks (headless, no stdin)
    #[arg(long)]
    ticks: Option<u64>,

    /// Write a frame log for the session
    #[arg(long)]
    record: bool,

    /// Directory for frame logs (default: ./logs)
    #[arg(long, default_value = "./logs")]
    log_dir: String,

    /// Output log entries as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blinkscan=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.no_color {
        colored::control::set_override(false);
    }

    let alphabet = match load_alphabet(args.alphabet.as_deref()) {
        Ok(alphabet) => Arc::new(alphabet),
        Err(e) => exit_config_error(e),
    };

    if args.serve {
        run_serve(&args, alphabet).await;
    } else {
        run_scan(&args, alphabet).await;
    }
}

fn exit_config_error(e: ConfigurationError) -> ! {
    eprintln!("Configuration error: {}", e);
    std::process::exit(1);
}

/// Run a local scan session
async fn run_scan(args: &Args, alphabet: Arc<Alphabet>) {
    let mode = if args.train { SessionMode::Train } else { SessionMode::Talk };
    let config = SessionConfig {
        mode,
        tick_interval_ms: args.interval_ms,
        sensitivity: args.sensitivity,
    };
    let session_id = new_session_id(mode, chrono::Utc::now());

    let session = match ScanSession::new(session_id.clone(), alphabet.clone(), config) {
        Ok(session) => session,
        Err(e) => exit_config_error(e),
    };
    let handle = if args.record {
        let writer = FrameLogWriter::spawn(&args.log_dir, &session_id);
        println!("Frame log: {}", writer.path().display());
        SessionHandle::with_log(session, writer)
    } else {
        SessionHandle::new(session)
    };

    print_header(mode, args.no_color);
    let events = handle.subscribe();
    if let Err(e) = handle.start().await {
        exit_config_error(e);
    }

    match args.ticks {
        Some(limit) => run_headless(&handle, events, limit, args.json).await,
        None => {
            let printer = tokio::spawn(print_events(handle.clone(), events, args.json));
            read_commands(&handle).await;
            printer.abort();
        }
    }

    match handle.shutdown().await {
        Ok(Some(lines)) => println!("\nSession {} ended. Log lines: {}", session_id, lines),
        Ok(None) => println!("\nSession {} ended.", session_id),
        Err(e) => {
            eprintln!("Frame log write failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print ticks until `limit`, then return
async fn run_headless(
    handle: &SessionHandle,
    mut events: broadcast::Receiver<SessionEvent>,
    limit: u64,
    json: bool,
) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Tick(report)) => {
                print_tick_line(handle, &report, json).await;
                if report.state.tick_index >= limit {
                    break;
                }
            }
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn print_tick_line(handle: &SessionHandle, report: &TickReport, json: bool) {
    if json {
        // Built from the reported state, not the live one, which may have moved on
        let entry = handle
            .with_session(|s| build_log_entry(&report.state, s.alphabet(), report.cursor))
            .await;
        match entry.to_json_line() {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("{}", e),
        }
    } else {
        println!("{}", report.to_parseable_string());
    }
}

/// Render every event; the grid is redrawn on each tick
async fn print_events(
    handle: SessionHandle,
    mut events: broadcast::Receiver<SessionEvent>,
    json: bool,
) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Tick(report)) => {
                if json {
                    print_tick_line(&handle, &report, true).await;
                } else {
                    let line = handle.with_session(render_grid).await;
                    println!("{}", line);
                }
            }
            Ok(SessionEvent::BlinkStart) => println!("{}", "  ● blink start - paused".yellow()),
            Ok(SessionEvent::BlinkEnd) => println!("{}", "  ○ blink end - selected".green()),
            Ok(SessionEvent::Stopped(last)) => {
                println!("  ■ stopped at tick {} (index {})", last.tick_index, last.highlighted_index)
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// One line per tick: rows of the grid, highlight and target colored
fn render_grid(session: &ScanSession) -> String {
    let mut out = String::new();
    for (i, ch) in session.alphabet().chars().iter().enumerate() {
        if i > 0 && i % GRID_COLUMNS == 0 {
            out.push_str(" |");
        }
        let glyph = if ch.label == " " { "␣".to_string() } else { ch.label.clone() };
        let cell = format!(" {} ", glyph);
        let cell = match session.text_color(i) {
            CellText::Target => cell.as_str().red().bold(),
            CellText::Normal => cell.as_str().normal(),
        };
        let cell = match session.highlight_color(i) {
            CellHighlight::Match => cell.on_green(),
            CellHighlight::Highlighted => cell.on_yellow(),
            CellHighlight::Normal => cell,
        };
        out.push_str(&cell.to_string());
    }

    if let (Some(word), Some(target)) = (session.training_word(), session.training_target()) {
        out.push_str(&format!("   {} [{}]", word, target.label));
    }
    if session.state().is_paused() {
        out.push_str(&format!("   {}", "PAUSED".yellow()));
    }
    out
}

/// Read stdin commands until quit or EOF
async fn read_commands(handle: &SessionHandle) {
    println!("Type c/o for eye closed/open, a probability, p/r/g, s <ms>, or q to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "q" | "quit" | "exit" => break,
            "c" | "close" | "closed" => {
                handle.eye_signal(false).await;
            }
            "o" | "open" => {
                handle.eye_signal(true).await;
            }
            "p" | "pause" => handle.pause().await,
            "r" | "reset" => handle.reset().await,
            "g" | "resume" => handle.resume().await,
            other => {
                if let Some(ms) = other.strip_prefix("s ").or_else(|| other.strip_prefix("speed ")) {
                    match ms.trim().parse::<u32>() {
                        Ok(ms) => {
                            if let Err(e) = handle.set_interval(ms).await {
                                println!("{}", format!("  ⚠ {}", e).as_str().yellow());
                            }
                        }
                        Err(_) => println!("{}", "  ⚠ interval must be a number of milliseconds".yellow()),
                    }
                } else if let Some(probability) = parse_probability(other) {
                    // Typed probabilities are for the watched eye; the reference eye is open
                    handle.eye_sample(EyeSample::new(1.0, probability)).await;
                } else {
                    println!("{}", format!("  ⚠ unknown command '{}'", other).as_str().yellow());
                }
            }
        }
    }
}

/// A typed open probability; rejects nan, inf and anything outside 0..=1
fn parse_probability(input: &str) -> Option<f64> {
    input.parse::<f64>().ok().filter(|p| is_probability(*p))
}

/// Print header
fn print_header(mode: SessionMode, no_color: bool) {
    let title = format!("  Blinkscan v{} - {} mode", VERSION, mode);
    println!("========================================");
    if no_color {
        println!("{}", title);
    } else {
        println!("{}", title.as_str().bold());
    }
    println!("========================================");
    println!();
}

/// Run HTTP API server
async fn run_serve(args: &Args, alphabet: Arc<Alphabet>) {
    let config = ServerConfig {
        alphabet,
        log_dir: Some(args.log_dir.clone()),
        sensitivity: args.sensitivity,
        default_interval_ms: args.interval_ms,
    };

    if let Err(e) = run_server(&args.addr, config).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
