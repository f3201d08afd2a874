//! `voxbot-cli` – voxbot Command Line Interface
//!
//! 1. Checks for `~/.voxbot/config.toml`; runs a **First-Run Wizard** when the
//!    file is absent.
//! 2. Builds the action execution client (local handlers plus the remote
//!    transport chosen by the endpoint scheme) and the voicebot.
//! 3. Drops the user into an **interactive REPL** (`/status`, `/exec`,
//!    `/handlers`, `/help`, `/quit`); other lines are spoken to the assistant.
//! 4. Intercepts **Ctrl-C** to close the transport before exiting.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use voxbot_handlers::HandlerRegistry;
use voxbot_runtime::{ActionExecutionClient, ConversationContext, LlmOracle, Voicebot, init_tracing};

fn main() {
    let telemetry = init_tracing("voxbot");
    if telemetry.is_exporting() {
        info!("exporting spans over OTLP");
    }

    print_banner();

    let cfg = match config::load() {
        Ok(None) => run_first_run_wizard(),
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };
    info!(config = ?cfg, "configuration resolved");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            std::process::exit(1);
        }
    };

    let client = match ActionExecutionClient::new(
        cfg.transport_config(),
        HandlerRegistry::with_builtin_handlers(),
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("{}: {}", "Failed to build action client".red(), e);
            std::process::exit(1);
        }
    };

    let oracle = LlmOracle::new(cfg.llm_url.clone(), cfg.model.clone()).with_api_key(cfg.api_key.clone());
    let bot = Voicebot::new(Arc::clone(&client), Box::new(oracle), Box::new(repl::ConsoleSynthesizer))
        .with_context(ConversationContext::new(cfg.max_turns));

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_ctrlc = Arc::clone(&shutdown);
    let client_ctrlc = Arc::clone(&client);
    let handle = runtime.handle().clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – closing connections …".yellow().bold());
        shutdown_ctrlc.store(true, Ordering::SeqCst);
        handle.block_on(client_ctrlc.close());
        println!("{}", "  ✓ Exiting voxbot.".green());
        std::process::exit(130);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    println!(
        "  Remote endpoint {} ({})",
        cfg.endpoint.bold(),
        client.transport_kind()
    );
    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    repl::run(
        repl::Session {
            runtime: &runtime,
            client,
            bot,
            config: cfg,
        },
        shutdown,
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// First-Run Wizard
// ─────────────────────────────────────────────────────────────────────────────

fn run_first_run_wizard() -> config::Config {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║       voxbot First-Run Wizard        ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  No configuration found.  Let's set up voxbot.\n");

    let mut cfg = config::Config::default();

    cfg.endpoint = prompt_line(
        &format!("  Remote execution endpoint [{}]: ", cfg.endpoint),
        &cfg.endpoint,
    );
    cfg.llm_url = prompt_line(
        &format!("  Model server URL [{}]: ", cfg.llm_url),
        &cfg.llm_url,
    );
    cfg.model = prompt_line(&format!("  Model [{}]: ", cfg.model), &cfg.model);

    match config::save(&cfg) {
        Ok(()) => println!(
            "\n  {} Config saved to {}\n",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }

    config::apply_env_overrides(&mut cfg);
    cfg
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#" _  _  __ _  _ ___  __  ____"#.bold().cyan());
    println!("{}", r#"( \/ )/  ( \/ ) _ )/  \(_  _)"#.bold().cyan());
    println!("{}", r#" \  /(  O )  (| _ (  O ) )(  "#.bold().cyan());
    println!("{}", r#"  \/  \__(_/\_)___/\__/ (__) "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "voxbot".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Emotional voice assistant with remote actions");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn prompt_line(msg: &str, default: &str) -> String {
    use std::io::{BufRead, Write};
    print!("{}", msg);
    std::io::stdout().flush().ok();
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let t = line.trim().to_string();
            if t.is_empty() { default.to_string() } else { t }
        }
        Err(_) => default.to_string(),
    }
}
