//! Conversation state: the transcript, the typing flag, and the active
//! conversation state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Classification of an uploaded file, driving validation and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Document,
}

impl AttachmentKind {
    pub fn label(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Document => "document",
        }
    }
}

/// A remote file attached to a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub url: String,
    pub kind: AttachmentKind,
}

/// A single transcript entry. Immutable once created.
#[derive(Debug, Clone)]
pub struct DisplayMessage {
    pub id: uuid::Uuid,
    pub role: Role,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    pub attachment: Option<Attachment>,
}

impl DisplayMessage {
    pub fn user(text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            sent_at: Utc::now(),
            attachment,
        }
    }

    pub fn assistant(text: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            role: Role::Assistant,
            text: text.into(),
            sent_at,
            attachment: None,
        }
    }

    /// System messages carry no server timestamp; they are stamped with
    /// the client clock on arrival.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            role: Role::System,
            text: text.into(),
            sent_at: Utc::now(),
            attachment: None,
        }
    }

    /// Hydrated history entries keep the server-reported timestamp.
    pub fn hydrated(role: Role, text: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            role,
            text: text.into(),
            sent_at,
            attachment: None,
        }
    }
}

/// Which conversation the transcript belongs to.
///
/// Exactly one state holds at a time; transitions go through the guarded
/// methods on [`ChatStore`] rather than ad-hoc assignment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveConversation {
    /// Nothing selected yet.
    #[default]
    Idle,
    /// A new conversation was requested but nothing sent yet.
    PendingNew,
    /// First message of a new conversation is in flight; waiting for the
    /// server to mint a group id.
    Creating,
    /// An existing conversation group.
    Active(String),
}

impl ActiveConversation {
    pub fn group_id(&self) -> Option<&str> {
        match self {
            ActiveConversation::Active(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_creating(&self) -> bool {
        matches!(self, ActiveConversation::Creating)
    }

    pub fn is_pending_new(&self) -> bool {
        matches!(self, ActiveConversation::PendingNew)
    }
}

/// The single-writer store behind the presentation layer.
#[derive(Debug, Default)]
pub struct ChatStore {
    messages: Vec<DisplayMessage>,
    typing: bool,
    active: ActiveConversation,
    pending_attachment: Option<Attachment>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    pub fn typing(&self) -> bool {
        self.typing
    }

    pub fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
    }

    pub fn active(&self) -> &ActiveConversation {
        &self.active
    }

    /// Append a live message. Display order equals arrival order.
    pub fn push(&mut self, message: DisplayMessage) {
        self.messages.push(message);
    }

    /// Replace the transcript with hydrated history, in server order.
    pub fn replace_with_history(&mut self, messages: Vec<DisplayMessage>) {
        self.messages = messages;
    }

    /// Begin a new conversation. Allowed from any state; clears the
    /// transcript and the typing flag.
    pub fn start_new_chat(&mut self) {
        self.messages.clear();
        self.typing = false;
        self.active = ActiveConversation::PendingNew;
    }

    /// Select an existing conversation group. Allowed from any state;
    /// clears the transcript pending hydration.
    pub fn open_group(&mut self, group_id: impl Into<String>) {
        self.messages.clear();
        self.typing = false;
        self.active = ActiveConversation::Active(group_id.into());
    }

    /// First send of a pending-new conversation: PendingNew -> Creating.
    /// Returns false (and changes nothing) from any other state.
    pub fn begin_creating(&mut self) -> bool {
        if self.active.is_pending_new() {
            self.active = ActiveConversation::Creating;
            true
        } else {
            false
        }
    }

    /// Adopt a server-minted group id: Creating -> Active(id). Re-adopting
    /// the already-active id is a no-op; anything else is rejected.
    pub fn adopt_group(&mut self, group_id: &str) -> bool {
        match &self.active {
            ActiveConversation::Creating => {
                self.active = ActiveConversation::Active(group_id.to_string());
                true
            }
            ActiveConversation::Active(current) if current == group_id => true,
            other => {
                warn!(state = ?other, group_id, "rejecting group adoption");
                false
            }
        }
    }

    pub fn pending_attachment(&self) -> Option<&Attachment> {
        self.pending_attachment.as_ref()
    }

    /// Stage an attachment for the next outgoing message, replacing any
    /// previously staged one.
    pub fn set_pending_attachment(&mut self, attachment: Attachment) {
        self.pending_attachment = Some(attachment);
    }

    /// Consume the staged attachment (cleared on send).
    pub fn take_pending_attachment(&mut self) -> Option<Attachment> {
        self.pending_attachment.take()
    }

    pub fn clear_pending_attachment(&mut self) {
        self.pending_attachment = None;
    }
}
