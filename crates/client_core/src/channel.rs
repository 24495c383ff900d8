//! Namespaced real-time channel over a WebSocket: named handlers for
//! inbound messages and fire-and-forget emission of outbound ones.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use shared::protocol::{namespace_route, ChannelFrame, CONNECT_EVENT, DISCONNECT_EVENT};
use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

pub type ChannelHandler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("server_url must start with http:// or https://, got '{0}'")]
    InvalidUrl(String),
    #[error("channel '{0}' is not connected")]
    NotConnected(String),
    #[error("channel '{0}' is already connected")]
    AlreadyConnected(String),
    #[error("websocket handshake with {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    #[error("failed to connect websocket {url}: {source}")]
    Connect {
        url: String,
        source: tokio_tungstenite::tungstenite::Error,
    },
}

/// How the background connector retries: each handshake is bounded by
/// `connect_timeout`, failures back off from `initial_delay` doubling up to
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub connect_timeout: Duration,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

pub struct RealtimeChannel {
    server_url: String,
    namespace: String,
    handlers: RwLock<HashMap<String, Vec<ChannelHandler>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<ChannelFrame>>>,
    connected: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    connector: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeChannel {
    pub fn new(server_url: impl Into<String>, namespace: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            server_url: server_url.into(),
            namespace: namespace.into(),
            handlers: RwLock::new(HashMap::new()),
            outbound: Mutex::new(None),
            connected: watch::channel(false).0,
            tasks: Mutex::new(Vec::new()),
            connector: Mutex::new(None),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Resolves once the channel is (or already was) not connected.
    pub async fn disconnected(&self) {
        let mut state = self.connected.subscribe();
        let _ = state.wait_for(|connected| !*connected).await;
    }

    /// Registers `handler` for messages named `event`. Handlers for the same
    /// name run in registration order.
    pub fn on<F>(&self, event: &str, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(event.to_string())
            .or_default()
            .push(Arc::new(handler));
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.read().get(event).map_or(0, Vec::len)
    }

    pub fn websocket_url(&self) -> Result<Url, ChannelError> {
        let mut url = Url::parse(&self.server_url)
            .map_err(|_| ChannelError::InvalidUrl(self.server_url.clone()))?;
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            _ => return Err(ChannelError::InvalidUrl(self.server_url.clone())),
        };
        url.set_scheme(scheme)
            .map_err(|()| ChannelError::InvalidUrl(self.server_url.clone()))?;
        let path = format!(
            "{}{}",
            url.path().trim_end_matches('/'),
            namespace_route(&self.namespace)
        );
        url.set_path(&path);
        Ok(url)
    }

    /// Opens the socket, starts the reader and writer tasks, then runs the
    /// `connect` handlers.
    pub async fn connect(self: &Arc<Self>) -> Result<(), ChannelError> {
        if self.is_connected() {
            return Err(ChannelError::AlreadyConnected(self.namespace.clone()));
        }
        let url = self.websocket_url()?;
        let (ws_stream, _) =
            connect_async(url.as_str())
                .await
                .map_err(|source| ChannelError::Connect {
                    url: url.to_string(),
                    source,
                })?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<ChannelFrame>();

        let namespace = self.namespace.clone();
        let writer = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(%namespace, event = %frame.event, %err, "dropping unencodable frame");
                        continue;
                    }
                };
                if ws_writer.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        });

        let channel: Weak<Self> = Arc::downgrade(self);
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                let Some(channel) = channel.upgrade() else {
                    return;
                };
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ChannelFrame>(&text) {
                        Ok(frame) => channel.fire(&frame.event, &frame.payload),
                        Err(err) => {
                            warn!(namespace = %channel.namespace, %err, "invalid channel frame");
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(namespace = %channel.namespace, %err, "websocket receive failed");
                        break;
                    }
                }
            }
            if let Some(channel) = channel.upgrade() {
                channel.mark_disconnected();
            }
        });

        *self.outbound.lock() = Some(tx);
        self.tasks.lock().extend([writer, reader]);
        self.connected.send_replace(true);
        info!(namespace = %self.namespace, %url, "channel connected");

        self.fire(CONNECT_EVENT, &Value::Null);
        Ok(())
    }

    /// Like [`connect`](Self::connect), but gives up on a handshake that
    /// does not complete within `limit`.
    pub async fn connect_within(self: &Arc<Self>, limit: Duration) -> Result<(), ChannelError> {
        match timeout(limit, self.connect()).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout {
                url: self.websocket_url()?.to_string(),
                after: limit,
            }),
        }
    }

    /// Keeps the channel connected from a background task: connects, waits
    /// for the socket to drop, and reconnects with backoff. Returns at once.
    /// A later call replaces the running connector; `disconnect` stops it.
    pub fn connect_in_background(self: &Arc<Self>, policy: ReconnectPolicy) {
        let channel = Arc::downgrade(self);
        let connector = tokio::spawn(async move {
            let mut delay = policy.initial_delay;
            loop {
                let Some(strong) = channel.upgrade() else {
                    return;
                };
                let attempt = strong.connect_within(policy.connect_timeout).await;
                match attempt {
                    Ok(()) | Err(ChannelError::AlreadyConnected(_)) => {
                        delay = policy.initial_delay;
                        let mut state = strong.connected.subscribe();
                        drop(strong);
                        if state.wait_for(|connected| !*connected).await.is_err() {
                            return;
                        }
                        debug!("socket dropped; reconnecting");
                    }
                    Err(ChannelError::InvalidUrl(url)) => {
                        warn!(%url, "not retrying realtime channel");
                        return;
                    }
                    Err(err) => {
                        warn!(namespace = %strong.namespace, %err, retry_in = ?delay, "realtime channel unavailable");
                        drop(strong);
                        sleep(delay).await;
                        delay = (delay * 2).min(policy.max_delay);
                    }
                }
            }
        });
        if let Some(previous) = self.connector.lock().replace(connector) {
            previous.abort();
        }
    }

    /// Queues a message for the server.
    pub fn emit(&self, event: &str, payload: Value) -> Result<(), ChannelError> {
        let outbound = self.outbound.lock();
        let tx = outbound
            .as_ref()
            .ok_or_else(|| ChannelError::NotConnected(self.namespace.clone()))?;
        debug!(namespace = %self.namespace, %event, "emitting");
        tx.send(ChannelFrame::new(event, payload))
            .map_err(|_| ChannelError::NotConnected(self.namespace.clone()))
    }

    /// Closes the socket without running `disconnect` handlers and stops
    /// the background connector.
    pub fn disconnect(&self) {
        if let Some(connector) = self.connector.lock().take() {
            connector.abort();
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.outbound.lock().take();
        self.connected.send_replace(false);
    }

    fn mark_disconnected(&self) {
        self.outbound.lock().take();
        if self.connected.send_replace(false) {
            info!(namespace = %self.namespace, "channel disconnected");
            self.fire(DISCONNECT_EVENT, &Value::Null);
        }
    }

    fn fire(&self, event: &str, payload: &Value) {
        let handlers = self.handlers.read().get(event).cloned().unwrap_or_default();
        if handlers.is_empty() {
            debug!(namespace = %self.namespace, %event, "no handler registered");
        }
        for handler in handlers {
            handler(payload);
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(connector) = self.connector.get_mut().take() {
            connector.abort();
        }
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/channel_tests.rs"]
mod tests;
