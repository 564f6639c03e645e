//! CLI runner for interactive and single-prompt modes.

use crate::cli::repl::Repl;
use crate::config::Settings;

/// Run a single prompt and exit.
pub async fn run_single_prompt(settings: Settings, prompt: &str) -> anyhow::Result<()> {
    let mut repl = Repl::new(settings).await;
    repl.handle_prompt(prompt).await?;
    repl.shutdown();
    Ok(())
}

/// Run in interactive mode.
pub async fn run_interactive(settings: Settings) -> anyhow::Result<()> {
    print_banner();

    let mut repl = Repl::new(settings).await;
    repl.run().await?;

    Ok(())
}

/// Print the welcome banner.
pub fn print_banner() {
    println!();
    println!("  \x1b[1;33m╔═╗╔═╗╔╦╗╔═╗╦ ╦╔═╗╦  \x1b[0m");
    println!("  \x1b[1;33m╚═╗╠═╣ ║ ║  ╠═╣║╣ ║  \x1b[0m");
    println!(
        "  \x1b[1;33m╚═╝╩ ╩ ╩ ╚═╝╩ ╩╚═╝╩═╝\x1b[0m  \x1b[2mv{}\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("  \x1b[2m🎒 Your homework tutor in the terminal\x1b[0m");
    println!("  \x1b[2mType \x1b[0m\x1b[1;36m/help\x1b[0m\x1b[2m for commands, or just ask a question!\x1b[0m");
    println!();
}

/// Get the application version string.
pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Generate the banner text lines without ANSI codes (for testing).
pub fn banner_text_lines() -> Vec<&'static str> {
    vec![
        "╔═╗╔═╗╔╦╗╔═╗╦ ╦╔═╗╦",
        "╚═╗╠═╣ ║ ║  ╠═╣║╣ ║",
        "╚═╝╩ ╩ ╩ ╚═╝╩ ╩╚═╝╩═╝",
        "Your homework tutor in the terminal",
        "/help",
    ]
}
