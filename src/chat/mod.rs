//! Conversation state and event dispatch.

mod dispatcher;
mod store;

pub use dispatcher::{Applied, Dispatcher, SendOutcome, OFFLINE_NOTICE};
pub use store::{
    ActiveConversation, Attachment, AttachmentKind, ChatStore, DisplayMessage, Role,
};
