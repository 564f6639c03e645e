//! Interactive REPL for the homework tutor.
//!
//! This module provides the main loop for interactive sessions. It
//! handles:
//!
//! - User input via reedline (readline alternative)
//! - Command dispatching (slash commands like /chats, /attach)
//! - Sending questions and rendering answers as they arrive
//! - Conversation browsing and history hydration

use std::path::Path;
use std::time::Duration;

use reedline::{FileBackedHistory, Signal};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{upload, ApiClient, GroupCatalog, UploadError, Uploader};
use crate::chat::{Applied, Attachment, Dispatcher, SendOutcome};
use crate::cli::prompt::{create_reedline, SatchelCompleter, SatchelPrompt, COMMANDS};
use crate::cli::renderer::TranscriptRenderer;
use crate::cli::spinner::Spinner;
use crate::config::{Settings, XdgDirs};
use crate::socket::{ServerEvent, SocketConfig, SocketManager};

/// How long to wait for an answer before giving the prompt back.
const ANSWER_TIMEOUT: Duration = Duration::from_secs(120);

/// How long to wait for a history response when opening a conversation.
const HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of handling a command.
pub enum CommandResult {
    /// Continue the REPL loop
    Continue,
    /// Exit the REPL
    Exit,
}

enum Waited {
    Event(Option<ServerEvent>),
    TimedOut,
}

/// REPL state.
pub struct Repl {
    settings: Settings,
    manager: SocketManager,
    dispatcher: Dispatcher,
    events: mpsc::UnboundedReceiver<ServerEvent>,
    api: ApiClient,
    catalog: GroupCatalog,
    uploader: Uploader,
    renderer: TranscriptRenderer,
    spinner: Spinner,
}

impl Repl {
    /// Create a new REPL and attempt the initial connection. A failed
    /// connection leaves the REPL usable offline; `/connect` retries.
    pub async fn new(settings: Settings) -> Self {
        let socket_config = SocketConfig::new(
            &settings.socket_url,
            &settings.token,
            &settings.application_id,
        );
        let mut manager = SocketManager::new(socket_config);
        let events = manager
            .take_events()
            .expect("event stream taken from a fresh manager");

        match manager.connect().await {
            Ok(_) => println!("\x1b[32m●\x1b[0m Connected to {}", settings.socket_url),
            Err(err) => {
                println!("\x1b[31m○\x1b[0m Offline: {err}");
                println!("  Use \x1b[1;36m/connect\x1b[0m to retry.");
            }
        }

        let dispatcher = Dispatcher::new(
            manager.handle(),
            &settings.curriculum,
            &settings.class_level,
        );
        let api = ApiClient::new(&settings.api_url, &settings.token);

        Self {
            settings,
            manager,
            dispatcher,
            events,
            api,
            catalog: GroupCatalog::new(),
            uploader: Uploader::new(),
            renderer: TranscriptRenderer::new(),
            spinner: Spinner::new(),
        }
    }

    /// Tear down the connection.
    pub fn shutdown(&mut self) {
        self.manager.disconnect();
    }

    /// Run the REPL loop.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut line_editor = create_reedline(SatchelCompleter);

        let history_path = XdgDirs::new().state.join("history.txt");
        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(history) = FileBackedHistory::with_file(500, history_path) {
            line_editor = line_editor.with_history(Box::new(history));
        }

        // Fresh conversation, hydrated with the most recent exchanges for
        // the configured curriculum when the server has any.
        self.dispatcher.store_mut().start_new_chat();
        if self.dispatcher.is_connected()
            && self.dispatcher.request_history_for_new_session().is_ok()
            && self.await_history(HISTORY_TIMEOUT).await?
        {
            println!();
        }

        loop {
            self.drain_events()?;

            let prompt = SatchelPrompt::new(
                &self.settings.curriculum,
                &self.settings.class_level,
                self.dispatcher.is_connected(),
            );

            match line_editor.read_line(&prompt) {
                Ok(Signal::Success(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    match self.handle_input(&line).await {
                        Ok(CommandResult::Exit) => break,
                        Ok(CommandResult::Continue) => {}
                        Err(err) => println!("\x1b[31m✗\x1b[0m {err}"),
                    }
                }
                Ok(Signal::CtrlC) => continue,
                Ok(Signal::CtrlD) => break,
                Err(err) => {
                    warn!(error = %err, "line editor failed");
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    async fn handle_input(&mut self, line: &str) -> anyhow::Result<CommandResult> {
        if line.starts_with('/') {
            self.handle_command(line).await
        } else {
            self.handle_prompt(line).await?;
            Ok(CommandResult::Continue)
        }
    }

    /// Send a question and wait for the answer.
    pub async fn handle_prompt(&mut self, text: &str) -> anyhow::Result<()> {
        match self.dispatcher.send_text(text) {
            SendOutcome::Sent(_) => self.await_answer().await,
            SendOutcome::NotConnected(notice) => {
                self.renderer.render_message(&notice)?;
                Ok(())
            }
        }
    }

    /// Wait for the assistant's answer, rendering anything else that
    /// arrives in the meantime.
    async fn await_answer(&mut self) -> anyhow::Result<()> {
        let mut spinner = Some(self.spinner.start("tutor is typing..."));
        let deadline = tokio::time::Instant::now() + ANSWER_TIMEOUT;

        loop {
            let waited = tokio::select! {
                event = self.events.recv() => Waited::Event(event),
                _ = tokio::time::sleep_until(deadline) => Waited::TimedOut,
            };

            let event = match waited {
                Waited::TimedOut => {
                    if let Some(handle) = spinner.take() {
                        handle.stop().await;
                    }
                    println!("\x1b[33m⚠\x1b[0m No answer yet; it may still arrive.");
                    return Ok(());
                }
                Waited::Event(None) => {
                    if let Some(handle) = spinner.take() {
                        handle.stop().await;
                    }
                    return Ok(());
                }
                Waited::Event(Some(event)) => event,
            };

            match self.dispatcher.apply(event) {
                Applied::Answer {
                    message,
                    adopted_group,
                } => {
                    if let Some(handle) = spinner.take() {
                        handle.stop().await;
                    }
                    self.renderer.render_message(&message)?;
                    if adopted_group.is_some() {
                        if let Err(err) = self.catalog.refresh(&self.api).await {
                            warn!(error = %err, "failed to refresh conversation list");
                        }
                    }
                    return Ok(());
                }
                Applied::SystemNotice(message) => {
                    if let Some(handle) = spinner.take() {
                        handle.stop().await;
                    }
                    self.renderer.render_message(&message)?;
                    spinner = Some(self.spinner.start("tutor is typing..."));
                }
                Applied::Typing | Applied::HistoryReplaced(_) | Applied::Ignored => {}
            }
        }
    }

    /// Wait for a history response; returns whether the transcript was
    /// replaced (and rendered).
    async fn await_history(&mut self, timeout: Duration) -> anyhow::Result<bool> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let waited = tokio::select! {
                event = self.events.recv() => Waited::Event(event),
                _ = tokio::time::sleep_until(deadline) => Waited::TimedOut,
            };

            let event = match waited {
                Waited::TimedOut | Waited::Event(None) => return Ok(false),
                Waited::Event(Some(event)) => event,
            };

            match self.dispatcher.apply(event) {
                Applied::HistoryReplaced(count) => {
                    debug!(count, "transcript hydrated");
                    self.render_transcript()?;
                    return Ok(true);
                }
                Applied::SystemNotice(message) => self.renderer.render_message(&message)?,
                Applied::Answer { message, .. } => self.renderer.render_message(&message)?,
                Applied::Typing | Applied::Ignored => {}
            }
        }
    }

    /// Render events that arrived while the prompt was idle.
    fn drain_events(&mut self) -> anyhow::Result<()> {
        loop {
            match self.events.try_recv() {
                Ok(event) => match self.dispatcher.apply(event) {
                    Applied::SystemNotice(message) => self.renderer.render_message(&message)?,
                    Applied::Answer { message, .. } => self.renderer.render_message(&message)?,
                    Applied::HistoryReplaced(_) => self.render_transcript()?,
                    Applied::Typing | Applied::Ignored => {}
                },
                Err(mpsc::error::TryRecvError::Empty)
                | Err(mpsc::error::TryRecvError::Disconnected) => break,
            }
        }
        Ok(())
    }

    fn render_transcript(&self) -> anyhow::Result<()> {
        for message in self.dispatcher.store().messages() {
            self.renderer.render_message(message)?;
        }
        Ok(())
    }

    /// Handle a slash command.
    async fn handle_command(&mut self, input: &str) -> anyhow::Result<CommandResult> {
        let parts: Vec<&str> = input[1..].splitn(2, ' ').collect();
        let cmd = parts[0].to_lowercase();
        let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

        match cmd.as_str() {
            "help" | "h" | "?" => show_help(),
            "exit" | "quit" | "q" => return Ok(CommandResult::Exit),
            "clear" | "cls" => print!("\x1b[2J\x1b[1;1H"),
            "version" | "v" => println!("satchel v{}", env!("CARGO_PKG_VERSION")),
            "new" => {
                self.dispatcher.store_mut().start_new_chat();
                println!("Started a new conversation.");
            }
            "chats" => self.cmd_chats().await,
            "more" => self.cmd_more().await,
            "open" => self.cmd_open(args).await?,
            "attach" => self.cmd_attach(args).await?,
            "detach" => {
                if self.dispatcher.store().pending_attachment().is_some() {
                    self.dispatcher.store_mut().clear_pending_attachment();
                    println!("Attachment removed.");
                } else {
                    println!("Nothing attached.");
                }
            }
            "connect" => match self.manager.connect().await {
                Ok(handle) => {
                    self.dispatcher.set_handle(handle);
                    println!("\x1b[32m●\x1b[0m Connected.");
                }
                Err(err) => println!("\x1b[31m✗\x1b[0m {err}"),
            },
            _ => {
                println!("Unknown command: /{cmd}");
                println!("   Use /help to see available commands");
            }
        }

        Ok(CommandResult::Continue)
    }

    async fn cmd_chats(&mut self) {
        if self.catalog.is_empty() && self.catalog.has_more() {
            if let Err(err) = self.catalog.fetch_next_page(&self.api).await {
                println!("\x1b[31m✗\x1b[0m Could not fetch conversations: {err}");
                return;
            }
        }
        self.list_chats();
    }

    async fn cmd_more(&mut self) {
        if !self.catalog.has_more() {
            println!("No more conversations.");
            return;
        }
        match self.catalog.fetch_next_page(&self.api).await {
            Ok(_) => self.list_chats(),
            Err(err) => println!("\x1b[31m✗\x1b[0m Could not fetch conversations: {err}"),
        }
    }

    fn list_chats(&self) {
        if self.catalog.is_empty() {
            println!("No conversations yet. Just start typing to begin one.");
            return;
        }

        let active = self.dispatcher.store().active().group_id();
        for (idx, group) in self.catalog.groups().iter().enumerate() {
            let marker = if active == Some(group.id.as_str()) {
                "\x1b[1;33m▸\x1b[0m"
            } else {
                " "
            };
            println!("{} {:>3}. {}", marker, idx + 1, group.title);
        }
        if self.catalog.has_more() {
            println!("\x1b[2mUse /more for older conversations.\x1b[0m");
        }
    }

    async fn cmd_open(&mut self, args: &str) -> anyhow::Result<()> {
        if args.is_empty() {
            println!("Usage: /open <number from /chats>");
            return Ok(());
        }

        let group = match args.parse::<usize>() {
            Ok(n) if n >= 1 => self.catalog.groups().get(n - 1).cloned(),
            _ => self
                .catalog
                .groups()
                .iter()
                .find(|g| g.id == args)
                .cloned(),
        };
        let Some(group) = group else {
            println!("No such conversation. Use /chats to list them first.");
            return Ok(());
        };

        println!("Opening \x1b[1m{}\x1b[0m...", group.title);
        self.dispatcher.store_mut().open_group(&group.id);

        match self.dispatcher.request_history(&group.id) {
            Ok(()) => {
                if !self.await_history(HISTORY_TIMEOUT).await? {
                    println!("No history arrived; the thread may be empty.");
                }
            }
            Err(err) => println!("\x1b[31m✗\x1b[0m {err}"),
        }
        Ok(())
    }

    async fn cmd_attach(&mut self, args: &str) -> anyhow::Result<()> {
        if args.is_empty() {
            println!("Usage: /attach <path to a JPEG/PNG image or PDF>");
            return Ok(());
        }
        if self.uploader.is_busy() {
            println!("An upload is already in progress.");
            return Ok(());
        }

        let path = Path::new(args);
        let kind = upload::kind_for_path(path);

        let handle = self.spinner.start(format!("uploading {}...", kind.label()));
        let result = self.uploader.upload(&self.api, path, kind).await;
        handle.stop().await;

        match result {
            Ok(uploaded) => {
                self.dispatcher.store_mut().set_pending_attachment(Attachment {
                    url: uploaded.url,
                    kind,
                });
                println!(
                    "\x1b[32m✓\x1b[0m Attached {}. It will be sent with your next message.",
                    kind.label()
                );
            }
            Err(UploadError::Invalid(violation)) => {
                println!("\x1b[31m✗\x1b[0m {violation}");
            }
            Err(err) => {
                debug!(error = %err, "upload failed");
                println!("\x1b[31m✗\x1b[0m Failed to upload file. Please try again.");
            }
        }
        Ok(())
    }
}

/// Print command help.
fn show_help() {
    println!();
    println!("  Type a question to ask the tutor, or use a command:");
    println!();
    for (cmd, description) in COMMANDS {
        println!("  \x1b[1;36m{:<10}\x1b[0m {}", cmd, description);
    }
    println!();
}
