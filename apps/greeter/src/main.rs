#![allow(clippy::print_stdout)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ramverk::domain::config::Settings;
use ramverk::fullstack;
use ramverk::kernel::config::load_config;
use std::path::PathBuf;

/// Greets visitors with a greeting anyone can change.
#[derive(Debug, Parser)]
#[command(name = "greeter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// TOML settings file, layered under `RAMVERK__*` environment variables.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Default, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    #[default]
    Serve,
    /// Print the URL rules
    Routes,
}

fn settings(config: Option<&PathBuf>) -> Result<Settings> {
    match config {
        Some(path) => load_config(Some(path)).context("Critical: Configuration is malformed"),
        None => Ok(ramverk_greeter::default_settings()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = settings(cli.config.as_ref())?;

    match cli.command.unwrap_or_default() {
        Command::Serve => {
            let _log = fullstack::logger(&settings)?;
            let app = ramverk_greeter::build(settings).await?;
            app.serve().await?;
        },
        Command::Routes => {
            let app = ramverk_greeter::build(settings).await?;
            for rule in app.rules() {
                let methods = rule.allowed_methods().map_or_else(|| "*".to_owned(), |m| m.to_string());
                let build_only = if rule.is_build_only() { " (build only)" } else { "" };
                println!(
                    "{:<24} {:<16} {}{build_only}",
                    rule.pattern(),
                    methods,
                    rule.endpoint_name().unwrap_or("-")
                );
            }
        },
    }

    Ok(())
}
