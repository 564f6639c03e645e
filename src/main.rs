//! Satchel - terminal chat client for an AI homework tutor.

mod api;
mod chat;
mod cli;
mod config;
mod socket;
mod version_check;

use clap::Parser;
use config::{Settings, XdgDirs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Satchel - your homework tutor in the terminal 🎒
#[derive(Parser, Debug)]
#[command(name = "satchel")]
#[command(version, about, long_about = None)]
struct Args {
    /// Ask a single question and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Bearer token for the homework assistant service
    #[arg(long, env = "SATCHEL_TOKEN")]
    token: Option<String>,

    /// Application id for the homework assistant service
    #[arg(long, env = "SATCHEL_APP_ID")]
    app_id: Option<String>,

    /// Realtime channel host (defaults to the production host)
    #[arg(long, env = "SATCHEL_SOCKET_URL")]
    socket_url: Option<String>,

    /// REST base URL (defaults to the production host)
    #[arg(long, env = "SATCHEL_API_URL")]
    api_url: Option<String>,

    /// Subject scope for new conversations (e.g. "Physics")
    #[arg(short, long)]
    curriculum: Option<String>,

    /// Class level scope (e.g. "SSS 1")
    #[arg(long)]
    class_level: Option<String>,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose logging (equivalent to RUST_LOG=trace)
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Skip checking for new versions
    #[arg(long)]
    skip_update_check: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        // Determine log level from args or env
        let default_filter = if args.verbose {
            "trace"
        } else if args.debug {
            "debug"
        } else {
            "warn" // Quiet by default for normal use
        };

        // Initialize tracing with stderr output
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();

        if args.debug || args.verbose {
            tracing::info!("Debug logging enabled");
        }

        // Settings file first, command line and environment on top.
        let xdg = XdgDirs::new();
        let mut settings = Settings::load(&xdg.settings_file())?;
        if let Some(token) = args.token {
            settings.token = token;
        }
        if let Some(app_id) = args.app_id {
            settings.application_id = app_id;
        }
        if let Some(socket_url) = args.socket_url {
            settings.socket_url = socket_url;
        }
        if let Some(api_url) = args.api_url {
            settings.api_url = api_url;
        }
        if let Some(curriculum) = args.curriculum {
            settings.curriculum = curriculum;
        }
        if let Some(class_level) = args.class_level {
            settings.class_level = class_level;
        }

        if let Err(err) = settings.ensure_credentials() {
            eprintln!("✗ {err}");
            eprintln!(
                "  Set it in {} or pass --token/--app-id (SATCHEL_TOKEN/SATCHEL_APP_ID).",
                xdg.settings_file().display()
            );
            std::process::exit(1);
        }

        // Check for updates in background (non-blocking)
        if !args.skip_update_check {
            tokio::spawn(async {
                if let Some(release) = version_check::check_for_update().await {
                    version_check::print_update_message(&release);
                }
            });
        }

        if let Some(prompt) = args.prompt {
            cli::run_single_prompt(settings, &prompt).await?;
        } else {
            cli::run_interactive(settings).await?;
        }

        Ok(())
    })
}
