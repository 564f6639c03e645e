//! Command-line interface: REPL, prompt, and transcript rendering.

mod prompt;
mod renderer;
mod repl;
mod runner;
mod spinner;

pub use prompt::{create_reedline, SatchelCompleter, SatchelHighlighter, SatchelPrompt, COMMANDS};
pub use renderer::{RenderStyle, TranscriptRenderer};
pub use repl::{CommandResult, Repl};
pub use runner::{get_version, print_banner, run_interactive, run_single_prompt};
pub use spinner::{Spinner, SpinnerHandle};
