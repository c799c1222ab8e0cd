//! Paysoko assistant entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load config
//!   4. Init logger once (CLI `-v` flags > env > config)
//!   5. Build LLM provider and graph client
//!   6. Build the QA chain (reads the graph schema)
//!   7. Open the CSV interaction log
//!   8. Spawn Ctrl-C → shutdown signal watcher
//!   9. Run comms channels until shutdown or until they all exit

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use paysoko_assistant::config::{self, Config};
use paysoko_assistant::error::AppError;
use paysoko_assistant::graph::{GraphClient, neo4j::Neo4jClient};
use paysoko_assistant::llm::providers;
use paysoko_assistant::logger;
use paysoko_assistant::qa::{QaChain, QaOptions};
use paysoko_assistant::qa_log::QaLogger;
use paysoko_assistant::subsystems::comms;

const USAGE: &str = "\
Usage: paysoko-assistant [OPTIONS]

Options:
  -h, --help                 Print help
  -i, --interactive          Enable the console UI
  -f, --config <PATH>        Path to configuration file (default: config/default.toml)
  -v, -vv, -vvv, -vvvv       Increase logging verbosity";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Optional file; missing is fine.
    let _ = dotenvy::dotenv();

    let args = match parse_cli_args(std::env::args().skip(1))? {
        Cli::Help => {
            println!("{USAGE}");
            return Ok(());
        }
        Cli::Run(args) => args,
    };

    let mut config = config::load(args.config_path.as_deref())?;
    if args.interactive {
        config.comms.pty.enabled = true;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        name = %config.name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        interactive = args.interactive,
        "config loaded"
    );

    let llm = providers::build(&config.llm, config.llm_api_key.clone())?;
    let graph = GraphClient::Neo4j(Neo4jClient::new(&config.graph.neo4j)?);
    let chain = QaChain::new(llm, graph, QaOptions { indexes: config.qa.indexes.clone() }).await?;
    let logger = QaLogger::open(&config.qa.log_file)?;

    print_startup_summary(&config);

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let handle = comms::start(&config, Arc::new(chain), logger, shutdown.clone());
    let result = handle.join().await;

    // Channels may exit on their own (EOF, /quit); stop the rest too.
    shutdown.cancel();
    info!("shutdown complete");
    result
}

fn print_startup_summary(config: &Config) {
    println!("{} ready", config.name);
    println!("  llm:   {} ({})", config.llm.provider, config.llm.active_model());
    println!("  graph: {} db={}", config.graph.neo4j.uri, config.graph.neo4j.database);
    println!("  log:   {}", config.qa.log_file.display());
    if config.comms_http_should_load() {
        println!("  http:  http://{}", config.comms.http.bind);
    }
    if config.comms_pty_should_load() {
        println!("  console: enabled");
    }
}

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Cli {
    Help,
    Run(CliArgs),
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    log_level: Option<&'static str>,
    interactive: bool,
    config_path: Option<String>,
}

fn parse_cli_args<I>(args: I) -> Result<Cli, AppError>
where
    I: IntoIterator<Item = String>,
{
    let mut verbosity = 0u8;
    let mut out = CliArgs::default();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => return Ok(Cli::Help),
            "-i" | "--interactive" => out.interactive = true,
            "-f" | "--config" => match iter.next() {
                Some(path) => out.config_path = Some(path),
                None => return Err(AppError::Config("-f/--config requires a path argument".into())),
            },
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add(u8::try_from(a.len() - 1).unwrap_or(u8::MAX));
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier:
    //   -v → warn, -vv → info, -vvv → debug, -vvvv+ → trace
    out.log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    Ok(Cli::Run(out))
}
