//! The application shell: owns the one MVC container and the real-time
//! channel, bootstraps them and then serves intents and console commands.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use client_core::{HttpComm, RealtimeChannel, ReconnectPolicy, RemoteFetch};
use mvc::{Document, Mvc, NodeId, Slots, View};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared::protocol::CONNECT_EVENT;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    console::{Command, HELP},
    controller::CameraController,
    media::{capture_for, MediaCapture},
    model::FilterModel,
    view::CameraView,
};

pub const MVC_NAME: &str = "myMVC";
pub const DUMMY_EVENT: &str = "dummy";
const HELLO_PATH: &str = "hello/everyone";

pub struct WebcamSlots;

impl Slots for WebcamSlots {
    type App = Application;
    type Model = FilterModel;
    type View = CameraView;
    type Controller = CameraController;
}

pub type WebcamMvc = Mvc<WebcamSlots>;

/// Everything the shell talks to outside of its own process state.
pub struct Collaborators {
    pub document: Arc<Document>,
    pub comm: Arc<dyn RemoteFetch>,
    pub channel: Arc<RealtimeChannel>,
    pub reconnect: ReconnectPolicy,
    pub media: Arc<dyn MediaCapture>,
}

impl Collaborators {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            document: Arc::new(Document::new()),
            comm: Arc::new(HttpComm::new(settings.server_url.as_str())),
            channel: RealtimeChannel::new(settings.server_url.as_str(), settings.namespace.as_str()),
            reconnect: ReconnectPolicy::default(),
            media: capture_for(settings.camera),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Application {
    mvc: Arc<WebcamMvc>,
    document: Arc<Document>,
    comm: Arc<dyn RemoteFetch>,
    channel: Arc<RealtimeChannel>,
    reconnect: ReconnectPolicy,
    dummy_registered: AtomicBool,
    received: Mutex<Vec<Value>>,
}

impl Application {
    pub fn new(collaborators: Collaborators) -> Arc<Self> {
        let Collaborators {
            document,
            comm,
            channel,
            reconnect,
            media,
        } = collaborators;

        Arc::new_cyclic(|app| Self {
            mvc: Mvc::new(
                MVC_NAME,
                app.clone(),
                FilterModel::new(Arc::clone(&comm)),
                CameraView::new(Arc::clone(&document), media),
                CameraController::new(),
            ),
            document,
            comm,
            channel,
            reconnect,
            dummy_registered: AtomicBool::new(false),
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn mvc(&self) -> &Arc<WebcamMvc> {
        &self.mvc
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn channel(&self) -> &Arc<RealtimeChannel> {
        &self.channel
    }

    /// Payloads of every inbound `dummy` message, in arrival order.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    /// Starts connecting the channel in the background, then initializes the
    /// container and puts the view on screen. The channel never holds up
    /// startup; any container failure aborts it.
    pub async fn bootstrap(self: &Arc<Self>) -> Result<()> {
        let app = Arc::downgrade(self);
        self.channel.on(CONNECT_EVENT, move |_| {
            if let Some(app) = app.upgrade() {
                app.on_io_connect();
            }
        });
        self.channel.connect_in_background(self.reconnect);

        self.mvc.initialize().await?;
        let view = self.mvc.view();
        view.attach(self.document.body())?;
        view.activate()?;
        info!(mvc = %self.mvc.name(), "application ready");
        Ok(())
    }

    fn on_io_connect(self: &Arc<Self>) {
        info!("yay IO connected");
        if !self.dummy_registered.swap(true, Ordering::SeqCst) {
            let app = Arc::downgrade(self);
            self.channel.on(DUMMY_EVENT, move |payload| {
                if let Some(app) = app.upgrade() {
                    app.on_dummy_data(payload);
                }
            });
        }
        if let Err(err) = self
            .channel
            .emit(DUMMY_EVENT, json!({ "value": "dummy data from client" }))
        {
            warn!(%err, "failed to send dummy message");
        }
    }

    fn on_dummy_data(&self, payload: &Value) {
        info!(%payload, "IO data");
        self.received.lock().push(payload.clone());
    }

    /// Asks the server to say hello; returns its response.
    pub async fn test(&self) -> Result<Value> {
        info!("test server hello method");
        let result = self.comm.get(HELLO_PATH).await?;
        info!(response = %result.response, "hello answered");
        Ok(result.response)
    }

    /// Serves queued intents and console lines until `quit`, end of input or
    /// Ctrl-C. Intents already queued are handled before the next line is
    /// read.
    pub async fn run<R, W>(self: &Arc<Self>, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                biased;
                Some(intent) = self.mvc.next_intent() => {
                    if let Err(err) = self.mvc.dispatch(intent).await {
                        warn!(error = %err, "intent failed");
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("input closed");
                        break;
                    };
                    if self.handle_line(&line, &mut output).await? == Flow::Quit {
                        break;
                    }
                }
                _ = &mut ctrl_c => {
                    info!("interrupted");
                    break;
                }
            }
        }

        if let Err(err) = self.mvc.dispatch_pending().await {
            warn!(error = %err, "intent failed during shutdown");
        }
        self.shutdown();
        output.flush().await?;
        Ok(())
    }

    pub fn shutdown(&self) {
        self.mvc.view().deactivate();
        self.channel.disconnect();
        info!(mvc = %self.mvc.name(), "application stopped");
    }

    async fn handle_line<W>(&self, line: &str, output: &mut W) -> Result<Flow>
    where
        W: AsyncWrite + Unpin,
    {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                say(output, &err.to_string()).await?;
                return Ok(Flow::Continue);
            }
        };

        let view = self.mvc.view();
        match command {
            Command::Filter(name) => match view.filter_button(&name) {
                Some(button) => self.click(button),
                None => say(output, &format!("no filter button '{name}'")).await?,
            },
            Command::Camera => self.click(view.camera_button()?),
            Command::Photo => self.click(view.photo_button()?),
            Command::Show => say(output, self.document.outline().trim_end()).await?,
            Command::Hello => match self.test().await {
                Ok(response) => say(output, &response.to_string()).await?,
                Err(err) => {
                    warn!(error = %err, "hello failed");
                    say(output, &format!("hello failed: {err:#}")).await?;
                }
            },
            Command::Data => {
                let data = self.mvc.model().data().unwrap_or(Value::Null);
                say(output, &data.to_string()).await?;
            }
            Command::Inbox => {
                for payload in self.received() {
                    say(output, &payload.to_string()).await?;
                }
            }
            Command::Help => say(output, HELP).await?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn click(&self, node: NodeId) {
        match self.document.dispatch_event(node, "click") {
            Ok(0) => debug!(%node, "click reached no listener"),
            Ok(_) => {}
            Err(err) => warn!(%node, %err, "click failed"),
        }
    }
}

async fn say<W>(output: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
