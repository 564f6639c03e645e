//! Translation between user actions, wire events, and store updates.
//!
//! Outbound: user actions become [`ClientEvent`]s on the socket handle.
//! Inbound: decoded [`ServerEvent`]s are applied to the store one at a
//! time, in arrival order, each returning an [`Applied`] outcome the
//! presentation layer reacts to.

use chrono::Utc;
use tracing::{debug, warn};

use crate::chat::store::{Attachment, AttachmentKind, ChatStore, DisplayMessage, Role};
use crate::socket::{
    ChatRequest, ClientEvent, HistoryItem, HistoryScope, MessageType, ServerEvent, SocketError,
    SocketHandle,
};

/// Transcript copy shown when a send is attempted while disconnected.
pub const OFFLINE_NOTICE: &str = "Unable to send message - not connected to server";

const MISSING_QUESTION: &str = "Question not available";

/// Result of a send attempt.
#[derive(Debug)]
pub enum SendOutcome {
    /// The optimistic user message that was appended and emitted.
    Sent(DisplayMessage),
    /// Nothing was emitted; the synthetic system notice that was appended.
    NotConnected(DisplayMessage),
}

/// Store effect of one inbound event.
#[derive(Debug)]
pub enum Applied {
    /// A system message was appended.
    SystemNotice(DisplayMessage),
    /// An assistant answer was appended; `adopted_group` is set when the
    /// response minted the group id for a conversation being created, in
    /// which case the group listing should be refreshed.
    Answer {
        message: DisplayMessage,
        adopted_group: Option<String>,
    },
    /// The typing indicator turned on.
    Typing,
    /// The transcript was replaced with this many hydrated messages.
    HistoryReplaced(usize),
    /// No store effect.
    Ignored,
}

/// Dispatcher for one conversation surface.
pub struct Dispatcher {
    store: ChatStore,
    handle: SocketHandle,
    curriculum: String,
    class_level: String,
    /// Scope of the most recent history request. A history response that
    /// does not match is stale and discarded.
    pending_history: Option<HistoryScope>,
}

impl Dispatcher {
    pub fn new(handle: SocketHandle, curriculum: &str, class_level: &str) -> Self {
        Self {
            store: ChatStore::new(),
            handle,
            curriculum: curriculum.to_string(),
            class_level: class_level.to_string(),
            pending_history: None,
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ChatStore {
        &mut self.store
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// Swap in a fresh handle after an explicit reconnect.
    pub fn set_handle(&mut self, handle: SocketHandle) {
        self.handle = handle;
    }

    /// Send a text message, attaching any staged media.
    ///
    /// Appends the optimistic user message, raises the typing flag, and
    /// emits the request. While disconnected nothing is emitted or queued;
    /// one synthetic system message lands in the transcript instead.
    pub fn send_text(&mut self, text: &str) -> SendOutcome {
        if !self.handle.is_connected() {
            let notice = DisplayMessage::system(OFFLINE_NOTICE);
            self.store.push(notice.clone());
            return SendOutcome::NotConnected(notice);
        }

        let attachment = self.store.take_pending_attachment();
        let is_new_chat = self.store.begin_creating();

        let request = ChatRequest {
            message: text.to_string(),
            curriculum: self.curriculum.clone(),
            class_level: self.class_level.clone(),
            group_id: self.store.active().group_id().map(str::to_string),
            is_new_chat: is_new_chat.then_some(true),
            media_url: attachment.as_ref().map(|a| a.url.clone()),
            message_type: message_type_for(attachment.as_ref()),
        };

        let message = DisplayMessage::user(text, attachment);
        self.store.push(message.clone());
        self.store.set_typing(true);

        match self.handle.emit(ClientEvent::Request(request)) {
            Ok(()) => SendOutcome::Sent(message),
            Err(err) => {
                // Connection raced away between the check and the emit.
                warn!(error = %err, "send failed after connectivity check");
                self.store.set_typing(false);
                let notice = DisplayMessage::system(OFFLINE_NOTICE);
                self.store.push(notice.clone());
                SendOutcome::NotConnected(notice)
            }
        }
    }

    /// Ask for the transcript of one conversation group.
    pub fn request_history(&mut self, group_id: &str) -> Result<(), SocketError> {
        let scope = HistoryScope::Group(group_id.to_string());
        self.handle
            .emit(ClientEvent::HistoryRequest(scope.clone()))?;
        self.pending_history = Some(scope);
        Ok(())
    }

    /// Ask for the most recent exchanges for the configured curriculum;
    /// used once at startup before any group is selected.
    pub fn request_history_for_new_session(&mut self) -> Result<(), SocketError> {
        let scope = HistoryScope::NewSession(self.curriculum.clone());
        self.handle
            .emit(ClientEvent::HistoryRequest(scope.clone()))?;
        self.pending_history = Some(scope);
        Ok(())
    }

    /// Apply one inbound event to the store.
    pub fn apply(&mut self, event: ServerEvent) -> Applied {
        match event {
            ServerEvent::Message(payload) => {
                debug!(?payload, "unhandled transport message");
                Applied::Ignored
            }
            ServerEvent::System(text) => {
                let message = DisplayMessage::system(text);
                self.store.push(message.clone());
                Applied::SystemNotice(message)
            }
            ServerEvent::Typing => {
                self.store.set_typing(true);
                Applied::Typing
            }
            ServerEvent::Response(payload) => {
                self.store.set_typing(false);
                if !payload.success {
                    return Applied::Ignored;
                }
                let Some(data) = payload.data else {
                    return Applied::Ignored;
                };

                let sent_at = data.timestamp.unwrap_or_else(Utc::now);
                let message = DisplayMessage::assistant(data.message, sent_at);
                self.store.push(message.clone());

                let adopted_group = match data.group_id {
                    Some(id) if self.store.active().is_creating() => {
                        self.store.adopt_group(&id);
                        Some(id)
                    }
                    _ => None,
                };

                Applied::Answer {
                    message,
                    adopted_group,
                }
            }
            ServerEvent::HistoryResponse(payload) => {
                let Some(scope) = self.pending_history.as_ref() else {
                    debug!("dropping history response with no outstanding request");
                    return Applied::Ignored;
                };
                if !payload.success {
                    self.pending_history = None;
                    return Applied::Ignored;
                }
                let items = payload.data.unwrap_or_default();
                if let HistoryScope::Group(wanted) = scope {
                    let stale = items
                        .iter()
                        .any(|item| item.group_id.as_deref().is_some_and(|g| g != wanted));
                    if stale {
                        debug!(group_id = %wanted, "discarding stale history response");
                        return Applied::Ignored;
                    }
                }
                self.pending_history = None;
                if items.is_empty() {
                    return Applied::Ignored;
                }

                let messages = hydrate(&items);
                let count = messages.len();
                self.store.replace_with_history(messages);
                Applied::HistoryReplaced(count)
            }
        }
    }
}

fn message_type_for(attachment: Option<&Attachment>) -> MessageType {
    match attachment.map(|a| a.kind) {
        None => MessageType::Text,
        Some(AttachmentKind::Image) => MessageType::Image,
        Some(AttachmentKind::Document) => MessageType::Document,
    }
}

/// Flatten history items into (question, answer) pairs in source order.
/// Both halves take the item's creation time unless per-field timestamps
/// are present.
fn hydrate(items: &[HistoryItem]) -> Vec<DisplayMessage> {
    let mut messages = Vec::with_capacity(items.len() * 2);
    for item in items {
        let question = item.question.as_deref().unwrap_or(MISSING_QUESTION);
        messages.push(DisplayMessage::hydrated(
            Role::User,
            question,
            item.question_at.unwrap_or(item.created_at),
        ));
        messages.push(DisplayMessage::hydrated(
            Role::Assistant,
            item.answer.clone(),
            item.answer_at.unwrap_or(item.created_at),
        ));
    }
    messages
}
