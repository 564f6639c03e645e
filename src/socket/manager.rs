//! Connection management for the realtime channel.
//!
//! One [`SocketManager`] owns one websocket connection. The manager dials
//! the `/homework-assistant` namespace with the bearer token and
//! application id as query parameters, websocket transport only. Connect
//! errors are retried on a fixed delay up to a fixed ceiling; once the
//! ceiling is reached no further automatic dialing happens until
//! [`SocketManager::connect`] is called again. A server-initiated close
//! schedules exactly one reconnect attempt after the same fixed delay.
//!
//! Observers subscribe through [`SocketHandle`]: a clone-cheap handle
//! carrying the outbound sender and a `watch`-backed connected flag.
//! Dropping a handle unsubscribes it; there are no dangling listeners.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use super::wire::{ClientEvent, ServerEvent, NAMESPACE};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Delay before each reconnect attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Retry ceiling for a single `connect()` call.
pub const MAX_RETRIES: u32 = 5;

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("Invalid socket host: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Socket host cannot use scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("Connection failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("Websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Not connected")]
    NotConnected,
}

/// Connection parameters.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Base host, e.g. `https://api.brilliancelearn.com`.
    pub url: String,
    /// Bearer token, carried as a query parameter on the handshake.
    pub token: String,
    /// Application id, carried alongside the token.
    pub application_id: String,
    /// Fixed delay between reconnect attempts.
    pub retry_delay: Duration,
    /// Retry ceiling per `connect()` call.
    pub max_retries: u32,
}

impl SocketConfig {
    pub fn new(url: &str, token: &str, application_id: &str) -> Self {
        Self {
            url: url.to_string(),
            token: token.to_string(),
            application_id: application_id.to_string(),
            retry_delay: RECONNECT_DELAY,
            max_retries: MAX_RETRIES,
        }
    }

    /// Full websocket endpoint: scheme mapped to ws/wss, namespace path,
    /// credentials in the query string.
    pub fn endpoint(&self) -> Result<Url, SocketError> {
        let mut url = Url::parse(&self.url)?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(SocketError::UnsupportedScheme(other.to_string())),
        };
        url.set_scheme(scheme)
            .map_err(|_| SocketError::UnsupportedScheme(scheme.to_string()))?;
        url.set_path(NAMESPACE);
        url.query_pairs_mut()
            .append_pair("token", &self.token)
            .append_pair("hwaApplicationId", &self.application_id);
        Ok(url)
    }
}

/// Cheap cloneable view of the connection: emit capability plus the
/// connected flag. Emitting while disconnected fails instead of queueing.
#[derive(Clone)]
pub struct SocketHandle {
    outbound: mpsc::UnboundedSender<ClientEvent>,
    connected: watch::Receiver<bool>,
}

impl SocketHandle {
    pub(crate) fn from_parts(
        outbound: mpsc::UnboundedSender<ClientEvent>,
        connected: watch::Receiver<bool>,
    ) -> Self {
        Self { outbound, connected }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Send an event over the live connection.
    pub fn emit(&self, event: ClientEvent) -> Result<(), SocketError> {
        if !self.is_connected() {
            return Err(SocketError::NotConnected);
        }
        self.outbound
            .send(event)
            .map_err(|_| SocketError::NotConnected)
    }

    /// Watch connection transitions.
    pub fn connection_watch(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }
}

/// Owner of the websocket connection and its IO task.
pub struct SocketManager {
    config: SocketConfig,
    outbound_tx: mpsc::UnboundedSender<ClientEvent>,
    inbound_tx: mpsc::UnboundedSender<ServerEvent>,
    inbound_rx: Option<mpsc::UnboundedReceiver<ServerEvent>>,
    connected_tx: watch::Sender<bool>,
    io_task: Option<JoinHandle<()>>,
}

impl SocketManager {
    pub fn new(config: SocketConfig) -> Self {
        // Dead sender until the first connect; emits fail with NotConnected.
        let (outbound_tx, _) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (connected_tx, _) = watch::channel(false);
        Self {
            config,
            outbound_tx,
            inbound_tx,
            inbound_rx: Some(inbound_rx),
            connected_tx,
            io_task: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.connected_tx.borrow()
    }

    /// Current handle. Valid for the lifetime of the current connection;
    /// after a fresh `connect()` call, fetch a fresh handle.
    pub fn handle(&self) -> SocketHandle {
        SocketHandle::from_parts(self.outbound_tx.clone(), self.connected_tx.subscribe())
    }

    /// Take the inbound event stream. Yields decoded server events in
    /// arrival order, across reconnects. Can only be taken once.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ServerEvent>> {
        self.inbound_rx.take()
    }

    /// Connect, or return the existing handle if already connected.
    ///
    /// Dials with the fixed-delay bounded retry policy; after the ceiling
    /// is hit the error is returned and nothing further happens until the
    /// caller invokes `connect()` again.
    pub async fn connect(&mut self) -> Result<SocketHandle, SocketError> {
        if self.is_connected() {
            return Ok(self.handle());
        }
        if let Some(task) = self.io_task.take() {
            task.abort();
        }

        let ws = dial_with_retry(&self.config).await?;
        info!(host = %self.config.url, "socket connected");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.outbound_tx = outbound_tx;
        self.connected_tx.send_replace(true);

        self.io_task = Some(tokio::spawn(run_io(
            self.config.clone(),
            ws,
            outbound_rx,
            self.inbound_tx.clone(),
            self.connected_tx.clone(),
        )));

        Ok(self.handle())
    }

    /// Tear down the connection and clear state.
    pub fn disconnect(&mut self) {
        if let Some(task) = self.io_task.take() {
            task.abort();
        }
        if self.connected_tx.send_replace(false) {
            info!("socket disconnected");
        }
    }
}

impl Drop for SocketManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn dial_once(config: &SocketConfig) -> Result<WsStream, SocketError> {
    let endpoint = config.endpoint()?;
    let (ws, _response) = connect_async(endpoint.to_string()).await?;
    Ok(ws)
}

/// Fixed-delay bounded retry: every connect error schedules one retry
/// timer until the ceiling, then the last error is surfaced.
async fn dial_with_retry(config: &SocketConfig) -> Result<WsStream, SocketError> {
    let mut failures: u32 = 0;
    loop {
        match dial_once(config).await {
            Ok(ws) => return Ok(ws),
            Err(SocketError::Transport(err)) => {
                failures += 1;
                if failures > config.max_retries {
                    warn!(attempts = failures, "giving up on socket connection");
                    return Err(SocketError::RetriesExhausted {
                        attempts: failures,
                        source: err,
                    });
                }
                warn!(attempt = failures, error = %err, "socket connect failed, retrying");
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(other) => return Err(other),
        }
    }
}

enum CloseReason {
    /// Server sent a close frame or ended the stream cleanly.
    ServerClose,
    /// Transport-level failure.
    Transport,
    /// The manager dropped its sender; local teardown.
    Ended,
}

async fn run_io(
    config: SocketConfig,
    mut ws: WsStream,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientEvent>,
    inbound_tx: mpsc::UnboundedSender<ServerEvent>,
    connected_tx: watch::Sender<bool>,
) {
    loop {
        let reason = pump(ws, &mut outbound_rx, &inbound_tx).await;
        connected_tx.send_replace(false);
        match reason {
            CloseReason::ServerClose => {
                info!("server closed the connection, scheduling one reconnect");
                tokio::time::sleep(config.retry_delay).await;
                match dial_once(&config).await {
                    Ok(new_ws) => {
                        info!("socket reconnected");
                        connected_tx.send_replace(true);
                        ws = new_ws;
                    }
                    Err(err) => {
                        warn!(error = %err, "reconnect failed");
                        return;
                    }
                }
            }
            CloseReason::Transport | CloseReason::Ended => return,
        }
    }
}

/// Drive one connection: drain outbound events into the sink, decode
/// inbound frames and forward them in arrival order.
async fn pump(
    ws: WsStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
    inbound_tx: &mpsc::UnboundedSender<ServerEvent>,
) -> CloseReason {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            command = outbound_rx.recv() => match command {
                Some(event) => {
                    let frame = match event.to_frame() {
                        Ok(frame) => frame,
                        Err(err) => {
                            warn!(error = %err, "failed to encode outbound event");
                            continue;
                        }
                    };
                    if let Err(err) = sink.send(WsMessage::Text(frame)).await {
                        warn!(error = %err, "socket send failed");
                        return CloseReason::Transport;
                    }
                }
                None => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return CloseReason::Ended;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match ServerEvent::from_frame(&text) {
                    Some(event) => {
                        if inbound_tx.send(event).is_err() {
                            return CloseReason::Ended;
                        }
                    }
                    None => debug!(frame = %text, "dropping unrecognized frame"),
                },
                Some(Ok(WsMessage::Close(_))) | None => return CloseReason::ServerClose,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "socket read failed");
                    return CloseReason::Transport;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::wire::{ChatRequest, HistoryScope, MessageType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    fn test_config(addr: std::net::SocketAddr) -> SocketConfig {
        let mut config = SocketConfig::new(&format!("http://{addr}"), "tok", "app");
        config.retry_delay = Duration::from_millis(5);
        config
    }

    fn sample_request() -> ClientEvent {
        ClientEvent::Request(ChatRequest {
            message: "hello".to_string(),
            curriculum: "Biology".to_string(),
            class_level: "SSS 1".to_string(),
            group_id: None,
            is_new_chat: None,
            media_url: None,
            message_type: MessageType::Text,
        })
    }

    #[test]
    fn test_endpoint_carries_credentials() {
        let config = SocketConfig::new("https://api.example.com", "tok-1", "app-2");
        let endpoint = config.endpoint().unwrap();
        assert_eq!(endpoint.scheme(), "wss");
        assert_eq!(endpoint.path(), "/homework-assistant");
        let query: Vec<(String, String)> = endpoint
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("token".to_string(), "tok-1".to_string())));
        assert!(query.contains(&("hwaApplicationId".to_string(), "app-2".to_string())));
    }

    #[test]
    fn test_endpoint_rejects_odd_schemes() {
        let config = SocketConfig::new("ftp://api.example.com", "t", "a");
        assert!(matches!(
            config.endpoint(),
            Err(SocketError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_emit_before_connect_is_not_connected() {
        let manager = SocketManager::new(SocketConfig::new("http://127.0.0.1:1", "t", "a"));
        let handle = manager.handle();
        assert!(!handle.is_connected());
        assert!(matches!(
            handle.emit(sample_request()),
            Err(SocketError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_bounded_retry_dials_then_gives_up() {
        // A listener that accepts and immediately drops every connection,
        // so each dial fails during the websocket handshake.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let dials = Arc::new(AtomicUsize::new(0));
        let dials_srv = dials.clone();
        let server = tokio::spawn(async move {
            loop {
                let (sock, _) = listener.accept().await.unwrap();
                dials_srv.fetch_add(1, Ordering::SeqCst);
                drop(sock);
            }
        });

        let mut manager = SocketManager::new(test_config(addr));
        let err = match manager.connect().await {
            Ok(_) => panic!("connect unexpectedly succeeded"),
            Err(err) => err,
        };
        match err {
            SocketError::RetriesExhausted { attempts, .. } => {
                // Initial dial plus one per scheduled retry timer.
                assert_eq!(attempts, MAX_RETRIES + 1);
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }

        // No further dials happen without a new connect() call.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dials.load(Ordering::SeqCst) as u32, MAX_RETRIES + 1);
        assert!(!manager.is_connected());
        server.abort();
    }

    #[tokio::test]
    async fn test_connect_emit_and_receive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(sock).await.unwrap();

            // Expect the history request frame first.
            let frame = ws.next().await.unwrap().unwrap();
            let text = frame.into_text().unwrap();
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["event"], "homework_assistant:history:request");
            assert_eq!(value["data"]["curriculum"], "Biology");

            // Answer with a typing notification.
            ws.send(WsMessage::Text(
                r#"{"event":"homework_assistant:typing"}"#.to_string(),
            ))
            .await
            .unwrap();

            // Hold the connection open until the client goes away.
            while ws.next().await.is_some() {}
        });

        let mut manager = SocketManager::new(test_config(addr));
        let mut events = manager.take_events().unwrap();
        let handle = manager.connect().await.unwrap();
        assert!(handle.is_connected());

        handle
            .emit(ClientEvent::HistoryRequest(HistoryScope::NewSession(
                "Biology".to_string(),
            )))
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        assert_eq!(event, ServerEvent::Typing);

        manager.disconnect();
        assert!(!manager.is_connected());
        server.abort();
    }

    #[tokio::test]
    async fn test_server_close_schedules_one_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepts = Arc::new(AtomicUsize::new(0));
        let accepts_srv = accepts.clone();

        let server = tokio::spawn(async move {
            // First connection: close immediately from the server side.
            let (sock, _) = listener.accept().await.unwrap();
            accepts_srv.fetch_add(1, Ordering::SeqCst);
            let mut ws = tokio_tungstenite::accept_async(sock).await.unwrap();
            ws.close(None).await.unwrap();

            // Second connection: stay open.
            let (sock, _) = listener.accept().await.unwrap();
            accepts_srv.fetch_add(1, Ordering::SeqCst);
            let mut ws = tokio_tungstenite::accept_async(sock).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let mut config = test_config(addr);
        // Wide enough that the disconnected window cannot be missed.
        config.retry_delay = Duration::from_millis(200);
        let mut manager = SocketManager::new(config);
        let handle = manager.connect().await.unwrap();
        let mut watch = handle.connection_watch();

        // Disconnect observed...
        tokio::time::timeout(Duration::from_secs(5), watch.wait_for(|connected| !connected))
            .await
            .expect("never saw the disconnect")
            .unwrap();

        // ...followed by exactly one reconnect.
        tokio::time::timeout(Duration::from_secs(5), watch.wait_for(|connected| *connected))
            .await
            .expect("never saw the reconnect")
            .unwrap();

        assert_eq!(accepts.load(Ordering::SeqCst), 2);
        server.abort();
    }
}
