//! PTY (console) comms channel: reads questions from stdin and prints the
//! assistant's answers to stdout.
//!
//! Lines starting with `/` are console commands (tone selection, log
//! viewing). Everything else is a question. All answering goes through
//! [`CommsState::ask`]; this module has no direct access to the chain.
//!
//! Runs until the `shutdown` token is cancelled (Ctrl-C), stdin is closed,
//! or the user types `/quit`.

use std::io::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};
use super::state::{CommsEvent, CommsState, TONES, resolve_tone};

const DEFAULT_LOG_ROWS: usize = 5;

const HELP: &str = "\
Commands:
  /tone            list tones
  /tone <n|name>   select a tone
  /logs [n]        show the last n logged exchanges (default 5)
  /clear           clear the transcript
  /help            show this help
  /quit            leave the console
Anything else is sent as a question.";

// ── Commands ──────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Ask(String),
    ListTones,
    SetTone(String),
    Logs(usize),
    Clear,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Ask(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    Some(match name {
        "tone" if arg.is_empty() => Command::ListTones,
        "tone" => Command::SetTone(arg.to_string()),
        "logs" => match arg {
            "" => Command::Logs(DEFAULT_LOG_ROWS),
            n => match n.parse() {
                Ok(n) => Command::Logs(n),
                Err(_) => Command::Unknown(line.to_string()),
            },
        },
        "clear" => Command::Clear,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    })
}

// ── PtyChannel ───────────────────────────────────────────────────────────────

pub struct PtyChannel {
    channel_id: String,
    state: Arc<CommsState>,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>) -> Self {
        Self { channel_id: channel_id.into(), state }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_pty(self.channel_id, self.state, shutdown))
    }
}

// ── run_pty ──────────────────────────────────────────────────────────────────

async fn run_pty(
    channel_id: String,
    state: Arc<CommsState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    info!(%channel_id, "pty channel started");
    print_banner();

    let mut tone = state.default_tone().to_string();
    let mut exchanges: usize = 0;
    state.report_event(CommsEvent::SessionStarted { channel_id: channel_id.clone() });

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!();
                info!("pty channel shutting down");
                break;
            }

            line = lines.next_line() => {
                let input = match line {
                    Err(e) => {
                        warn!("pty read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => input,
                };

                let Some(command) = parse_command(&input) else { continue };
                debug!(?command, "pty command");

                match command {
                    Command::Quit => break,
                    Command::Help => println!("{HELP}"),
                    Command::ListTones => {
                        for (i, t) in TONES.iter().enumerate() {
                            let mark = if *t == tone { "*" } else { " " };
                            println!("{mark} {}. {t}", i + 1);
                        }
                    }
                    Command::SetTone(choice) => match resolve_tone(&choice) {
                        Some(t) => {
                            tone = t.to_string();
                            println!("tone set to: {tone}");
                        }
                        None => println!("unknown tone '{choice}', type /tone to list them"),
                    },
                    Command::Logs(n) => match state.log_entries() {
                        Ok(entries) if entries.is_empty() => println!("no logged exchanges yet"),
                        Ok(entries) => {
                            let skip = entries.len().saturating_sub(n);
                            for e in &entries[skip..] {
                                println!("[{}] Q: {}\n{}\n", e.timestamp, e.question, e.response);
                            }
                        }
                        Err(e) => println!("could not read logs: {e}"),
                    },
                    Command::Clear => {
                        exchanges = 0;
                        print!("\x1b[2J\x1b[H");
                        print_banner();
                    }
                    Command::Unknown(cmd) => println!("unknown command '{cmd}', type /help"),
                    Command::Ask(question) => {
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            result = state.ask(&channel_id, &question, &tone) => match result {
                                Ok(answer) => {
                                    exchanges += 1;
                                    println!("\n{}\n", answer.answer);
                                    debug!(exchanges, "pty exchange complete");
                                }
                                Err(e) => {
                                    warn!(error = %e, "question failed");
                                    println!("Sorry, I could not answer that: {e}");
                                }
                            },
                        }
                    }
                }
            }
        }
    }

    state.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}

fn print_banner() {
    println!("─────────────────────────────────────────");
    println!(" Paysoko assistant  (/help, Ctrl-C to quit)");
    println!("─────────────────────────────────────────");
}
