//! Animated typing indicator shown while the tutor composes an answer.

use crossterm::{
    cursor::{Hide, MoveToColumn, Show},
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
    ExecutableCommand,
};
use std::io::stdout;
use std::time::Duration;
use tokio::sync::watch;

/// Spinner animation frames.
const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const FRAME_INTERVAL: Duration = Duration::from_millis(80);

/// Handle for a running spinner.
pub struct SpinnerHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl SpinnerHandle {
    /// Stop the spinner and clear its line.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        let mut stdout = stdout();
        let _ = stdout.execute(MoveToColumn(0));
        let _ = stdout.execute(Clear(ClearType::CurrentLine));
        let _ = stdout.execute(Show);
    }
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        let _ = stdout().execute(Show);
    }
}

/// Spinner for showing activity.
#[derive(Default)]
pub struct Spinner;

impl Spinner {
    pub fn new() -> Self {
        Self
    }

    /// Start the spinner with a message.
    pub fn start(&self, message: impl Into<String>) -> SpinnerHandle {
        let message = message.into();
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut frame_idx = 0;
            let mut stdout = stdout();
            let _ = stdout.execute(Hide);

            loop {
                if *stop_rx.borrow() {
                    break;
                }

                let frame = SPINNER_FRAMES[frame_idx % SPINNER_FRAMES.len()];
                let _ = stdout.execute(MoveToColumn(0));
                let _ = stdout.execute(Clear(ClearType::CurrentLine));
                let _ = stdout.execute(SetForegroundColor(Color::Cyan));
                let _ = stdout.execute(Print(format!("{} {}", frame, message)));
                let _ = stdout.execute(ResetColor);

                frame_idx += 1;
                tokio::time::sleep(FRAME_INTERVAL).await;
            }

            let _ = stdout.execute(MoveToColumn(0));
            let _ = stdout.execute(Clear(ClearType::CurrentLine));
            let _ = stdout.execute(Show);
        });

        SpinnerHandle {
            stop_tx,
            task: Some(task),
        }
    }
}
