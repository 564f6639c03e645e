//! Satchel Library
//!
//! This crate provides the core functionality for the Satchel CLI: a
//! terminal chat client for an AI homework tutor.
//!
//! This library exposes many types for external consumers. The unused_imports
//! warning is suppressed because these are re-exports meant for library users.

#![allow(dead_code)] // Library APIs may not be used internally
#![allow(unused_imports)] // Re-exports for library consumers
//!
//! ## Main Components
//!
//! - [`socket`] - Realtime channel (connection manager, wire events)
//! - [`chat`] - Conversation store and event dispatch
//! - [`api`] - REST client (attachment uploads, conversation groups)
//! - [`cli`] - Command-line interface (REPL, rendering)
//! - [`config`] - Configuration and settings management
//!
//! ## Quick Start
//!
//! ```ignore
//! use satchel::{Settings, SocketConfig, SocketManager, Dispatcher};
//!
//! let settings = Settings::load(&path)?;
//! let mut manager = SocketManager::new(SocketConfig::new(
//!     &settings.socket_url, &settings.token, &settings.application_id,
//! ));
//! let handle = manager.connect().await?;
//! let dispatcher = Dispatcher::new(handle, &settings.curriculum, &settings.class_level);
//! ```

pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod socket;
pub mod version_check;

// Re-export commonly used types
pub use api::{
    ApiClient, ApiError, GroupCatalog, GroupSummary, UploadError, UploadedFile, Uploader,
    ValidationError,
};
pub use chat::{
    ActiveConversation, Applied, Attachment, AttachmentKind, ChatStore, Dispatcher,
    DisplayMessage, Role, SendOutcome,
};
pub use cli::{Repl, TranscriptRenderer};
pub use config::{Settings, SettingsError, XdgDirs};
pub use socket::{
    ChatRequest, ClientEvent, HistoryScope, MessageType, ServerEvent, SocketConfig, SocketError,
    SocketHandle, SocketManager,
};
