//! Backoffice Command-Line Client
//!
//! Signs in to a Backoffice API, keeps the session between runs and reports
//! what the session may see.

mod app;
mod commands;
mod config;
mod formatter;
mod routes;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::App;
use config::{Args, CliConfig, Command, DEFAULT_LOG_DIRECTIVE};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = CliConfig::from(&args);
    let formatter = formatter::create_formatter(config.format);
    let mut app = App::open(&config).await?;

    let result = match args.command {
        Command::Login { email, password } => commands::login(&app, &*formatter, email, password).await,
        Command::Logout => commands::logout(&app, &*formatter).await,
        Command::Whoami => commands::whoami(&app, &*formatter).await,
        Command::Can { required } => commands::can(&app, &*formatter, &required).await,
        Command::Visit { route } => commands::visit(&app, &*formatter, &route).await,
        Command::Routes => commands::list_routes(&app, &*formatter).await,
    };

    app.flush_events().await;
    result
}
