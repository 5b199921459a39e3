mod cli;
mod commands;
mod config;
mod storage;
mod version;

use std::io;

use clap::Parser;
use color_eyre::{eyre::bail, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point: one helper command per process, as invoked by Vault.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .install()?;
    init_tracing();

    let cli = match cli::Cli::try_parse_from(cli::normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => {
            // Help output goes to stdout and is not a failure; usage errors are.
            let code = if err.use_stderr() { 1 } else { 0 };
            err.print()?;
            std::process::exit(code);
        }
    };

    let command = match cli.command {
        _ if cli.version => cli::Command::Version,
        Some(command) => command,
        None => bail!("expected a command: store, get, erase or version"),
    };
    if command == cli::Command::Version {
        eprintln!("{}", version::human_version());
        return Ok(());
    }

    let config = config::Config::from_env()?;
    let store = storage::store_from_config(&config)?;
    match command {
        cli::Command::Store => commands::store(&store, io::stdin().lock()).await?,
        cli::Command::Get => commands::get(&store, io::stdout().lock()).await?,
        cli::Command::Erase => commands::erase(&store).await?,
        cli::Command::Version => {}
    }

    Ok(())
}

fn init_tracing() {
    // Stdout carries the token, so logs go to stderr and stay quiet by default.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
