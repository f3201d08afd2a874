//! REPL – Read-Eval-Print Loop for the voxbot interactive shell.
//!
//! Supported slash-commands:
//!   /help                  – show this list
//!   /status                – endpoint, transport and connection state
//!   /exec <type> [json]    – run one action and print its result
//!   /handlers              – list action types handled locally
//!   /quit | /exit          – close the transport and exit
//!
//! Any other line is spoken to the assistant.

use async_trait::async_trait;
use colored::Colorize;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Runtime;

use voxbot_runtime::{ActionExecutionClient, SpeechSynthesizer, Voicebot};
use voxbot_types::{Action, ActionResult, ConnectionState, Emotion};

use crate::config::Config;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Exec(Action),
    Handlers,
    Quit,
    Say(String),
    Invalid(String),
}

/// Parse one trimmed, non-empty line.
pub fn parse_command(line: &str) -> Command {
    if !line.starts_with('/') {
        return Command::Say(line.to_string());
    }
    let (cmd, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match cmd {
        "/help" => Command::Help,
        "/status" => Command::Status,
        "/handlers" => Command::Handlers,
        "/quit" | "/exit" => Command::Quit,
        "/exec" => match parse_exec(args.trim()) {
            Ok(action) => Command::Exec(action),
            Err(e) => Command::Invalid(e),
        },
        other => Command::Invalid(format!("Unknown command: '{other}'")),
    }
}

/// Parse `<type> [json-object]` into an [`Action`].
pub fn parse_exec(args: &str) -> Result<Action, String> {
    let (action_type, params) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
    if action_type.is_empty() {
        return Err("Usage: /exec <type> [json-params]".to_string());
    }
    let mut action = Action::new(action_type);
    let params = params.trim();
    if !params.is_empty() {
        match serde_json::from_str::<Value>(params) {
            Ok(Value::Object(map)) => action.parameters = map,
            Ok(_) => return Err("Parameters must be a JSON object".to_string()),
            Err(e) => return Err(format!("Invalid JSON parameters: {e}")),
        }
    }
    Ok(action)
}

/// Prints replies to stdout in place of audio playback.
pub struct ConsoleSynthesizer;

#[async_trait]
impl SpeechSynthesizer for ConsoleSynthesizer {
    async fn speak(&self, text: &str, emotion: Emotion) -> bool {
        let tag = format!("[{emotion}]");
        let tag = match emotion {
            Emotion::Happy => tag.green(),
            Emotion::Sad => tag.blue(),
            Emotion::Angry => tag.red(),
            Emotion::Surprised => tag.magenta(),
            Emotion::Concerned => tag.yellow(),
            Emotion::Neutral => tag.dimmed(),
        };
        println!("{} {} {}", "voxbot".bold().cyan(), tag, text);
        true
    }
}

/// Everything the REPL needs.
pub struct Session<'a> {
    pub runtime: &'a Runtime,
    pub client: Arc<ActionExecutionClient>,
    pub bot: Voicebot,
    pub config: Config,
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(mut session: Session<'_>, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "you>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Command::Help => cmd_help(),
            Command::Status => cmd_status(&session),
            Command::Handlers => cmd_handlers(&session.client),
            Command::Exec(action) => {
                let result = session.runtime.block_on(session.client.execute(&action));
                print_result(&result);
            }
            Command::Say(text) => {
                session.runtime.block_on(session.bot.handle_text(&text));
            }
            Command::Quit => {
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Command::Invalid(msg) => {
                println!(
                    "{} Type {} for available commands.",
                    msg.red(),
                    "/help".bold()
                );
            }
        }
    }

    session.runtime.block_on(session.client.close());
    println!("{}", "Goodbye.".green());
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "voxbot Commands".bold().underline());
    println!("  {}               – endpoint, transport and connection state", "/status".bold().cyan());
    println!("  {} – run an action and print the result", "/exec <type> [json]".bold().cyan());
    println!("  {}             – list locally handled actions", "/handlers".bold().cyan());
    println!("  {}         – exit", "/quit  /exit".bold().cyan());
    println!("  Anything else is said to the assistant.");
    println!();
}

fn cmd_status(session: &Session<'_>) {
    let client = &session.client;
    println!("{}", "Status".bold().underline());
    println!("  Endpoint    : {}", session.config.endpoint.yellow());
    println!("  Transport   : {}", client.transport_kind().to_string().bold());
    let state = match client.connection_state() {
        Some(ConnectionState::Connected) => "connected".green(),
        Some(ConnectionState::Connecting) => "connecting".yellow(),
        Some(ConnectionState::Disconnected) => "disconnected".red(),
        None => "n/a (stateless)".dimmed(),
    };
    println!("  Connection  : {state}");
    println!("  Model       : {} at {}", session.config.model.yellow(), session.config.llm_url.dimmed());
    println!("  Local actions: {}", client.registry().len());
    println!("  Context     : {} message(s)", session.bot.context().len());
}

fn cmd_handlers(client: &ActionExecutionClient) {
    println!("{}", "Local Handlers".bold().underline());
    for action_type in client.registry().action_types() {
        println!("  • {}", action_type.bold());
    }
}

fn print_result(result: &ActionResult) {
    let body = serde_json::to_string_pretty(result).unwrap_or_else(|_| format!("{result:?}"));
    if result.success {
        println!("{} {}", "✓".green().bold(), body);
    } else {
        println!("{} {}", "✗".red().bold(), body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_text_is_said() {
        assert_eq!(parse_command("what's the weather?"), Command::Say("what's the weather?".into()));
    }

    #[test]
    fn slash_commands_parse() {
        assert_eq!(parse_command("/help"), Command::Help);
        assert_eq!(parse_command("/status"), Command::Status);
        assert_eq!(parse_command("/handlers"), Command::Handlers);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert!(matches!(parse_command("/dance"), Command::Invalid(_)));
    }

    #[test]
    fn exec_with_params() {
        let Command::Exec(action) = parse_command(r#"/exec search {"query": "rust", "limit": 2}"#) else {
            panic!("expected exec");
        };
        assert_eq!(action.action_type, "search");
        assert_eq!(action.param("query"), Some(&json!("rust")));
        assert_eq!(action.param("limit"), Some(&json!(2)));
    }

    #[test]
    fn exec_without_params_has_empty_map() {
        assert_eq!(parse_exec("execute_task"), Ok(Action::new("execute_task")));
    }

    #[test]
    fn exec_rejects_bad_input() {
        assert!(parse_exec("").is_err());
        assert!(parse_exec("search [1,2]").unwrap_err().contains("JSON object"));
        assert!(parse_exec("search {oops").unwrap_err().contains("Invalid JSON"));
    }
}
