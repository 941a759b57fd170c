// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;
mod headless;

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use clio_core::Agent;
use clio_tools::ToolRegistry;
use clio_tui::{App, AppOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let headless = cli.is_headless();

    // The UI owns the terminal, so interactive runs never log to it.
    init_logging(cli.verbose, cli.command.is_none() && !headless);

    // Handle subcommands first (before validating config)
    if let Some(cmd) = &cli.command {
        match cmd {
            Commands::Completions { shell } => {
                cli::print_completions(*shell);
                return Ok(());
            }
            Commands::ShowConfig => {
                let config = load_config(&cli)?;
                println!("{}", serde_yaml::to_string(&config.redacted())?);
                return Ok(());
            }
            Commands::ListTools => {
                let config = load_config(&cli)?;
                let tools = ToolRegistry::builtin(&config.tools).context("loading tool definitions")?;
                for def in tools.list() {
                    let summary = def.description.lines().next().unwrap_or_default();
                    println!("{:<8} {summary}", def.name);
                }
                return Ok(());
            }
        }
    }

    let config = load_config(&cli)?;
    config.validate().context("invalid configuration")?;

    let model = clio_model::from_config(&config.model)?;
    let tools = Arc::new(ToolRegistry::builtin(&config.tools).context("loading tool definitions")?);
    info!(provider = model.name(), model = model.model_name(), tools = ?tools.names(), "starting");
    let agent = Agent::new(model, tools, &config.agent, &config.tools);

    if headless {
        let prompt = headless_prompt(cli.prompt)?;
        headless::run(agent, &prompt).await
    } else {
        let opts = AppOptions {
            initial_prompt: cli.prompt,
            ascii: config.tui.ascii,
            tick_ms: config.tui.tick_ms,
        };
        run_tui(agent, opts).await
    }
}

/// Layered config plus the `--model` flag.
fn load_config(cli: &Cli) -> anyhow::Result<clio_config::Config> {
    let mut config = clio_config::load(cli.config.as_deref())?;
    if let Some(model) = &cli.model {
        config.model.name = model.clone();
    }
    Ok(config)
}

/// The prompt argument, or all of stdin when it is piped.
fn headless_prompt(arg: Option<String>) -> anyhow::Result<String> {
    let prompt = match arg {
        Some(p) => p,
        None if !cli::is_stdin_tty() => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        }
        None => String::new(),
    };
    if prompt.trim().is_empty() {
        anyhow::bail!("headless mode needs a prompt (argument or stdin)");
    }
    Ok(prompt)
}

async fn run_tui(agent: Agent, opts: AppOptions) -> anyhow::Result<()> {
    use ratatui::crossterm::{
        event::{DisableMouseCapture, EnableMouseCapture},
        execute,
    };

    let terminal = ratatui::init();
    let _ = execute!(std::io::stderr(), EnableMouseCapture);

    let result = App::new(agent, opts).run(terminal).await;

    let _ = execute!(std::io::stderr(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn tui_log_path() -> Option<PathBuf> {
    let dir = dirs::cache_dir()?.join("clio");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join("clio.log"))
}

/// Headless runs log to stderr.  Interactive runs log to a file under the
/// cache directory, or nowhere when it cannot be opened.
fn init_logging(verbosity: u8, interactive: bool) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    if !interactive {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .init();
        return;
    }

    let file = tui_log_path().and_then(|path| {
        std::fs::OpenOptions::new().create(true).append(true).open(path).ok()
    });
    match file {
        Some(file) => tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(filter)
            .init(),
        None => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::sink))
            .with(filter)
            .init(),
    }
    debug!(verbosity, "logging initialised");
}
