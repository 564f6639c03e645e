//! Realtime channel: wire types and connection management.

mod manager;
mod wire;

pub use manager::{
    SocketConfig, SocketError, SocketHandle, SocketManager, MAX_RETRIES, RECONNECT_DELAY,
};
pub use wire::{
    ChatRequest, ClientEvent, HistoryItem, HistoryPayload, HistoryScope, MessageType,
    ResponseData, ResponsePayload, ServerEvent, NAMESPACE,
};
