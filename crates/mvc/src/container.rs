use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock, Weak,
    },
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::{dom::NodeId, view::LifecycleError};

/// Binds the concrete application, model, view and controller types of one
/// MVC triad together.
pub trait Slots: Sized + Send + Sync + 'static {
    type App: Send + Sync + 'static;
    type Model: Model<Self>;
    type View: View<Self>;
    type Controller: Controller<Self>;
}

pub type IntentOf<S> = <<S as Slots>::Controller as Controller<S>>::Intent;

#[async_trait]
pub trait Model<S: Slots>: Send + Sync + 'static {
    async fn initialize(&self, mvc: &Arc<Mvc<S>>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait View<S: Slots>: Send + Sync + 'static {
    /// Builds the element tree. Must be called exactly once.
    async fn initialize(&self, mvc: &Arc<Mvc<S>>) -> anyhow::Result<()>;
    fn attach(&self, host: NodeId) -> Result<(), LifecycleError>;
    fn activate(&self) -> Result<(), LifecycleError>;
    fn deactivate(&self);
}

#[async_trait]
pub trait Controller<S: Slots>: Send + Sync + 'static {
    type Intent: fmt::Debug + Send + 'static;

    async fn initialize(&self, mvc: &Arc<Mvc<S>>) -> anyhow::Result<()>;
    async fn dispatch(&self, intent: Self::Intent) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Model,
    View,
    Controller,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Model => "model",
            Phase::View => "view",
            Phase::Controller => "controller",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum MvcError {
    #[error("mvc '{name}': {phase} initialization failed")]
    Initialize {
        name: String,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },
    #[error("mvc '{0}' is already initialized")]
    AlreadyInitialized(String),
    #[error("component is not bound to an mvc container")]
    Detached,
    #[error("component is already bound to another mvc container")]
    AlreadyBound,
}

/// The composition root: one model, one view, one controller and a weak
/// reference to the application that owns the container.
pub struct Mvc<S: Slots> {
    name: String,
    app: Weak<S::App>,
    model: S::Model,
    view: S::View,
    controller: S::Controller,
    initialized: AtomicBool,
    intents_tx: mpsc::UnboundedSender<IntentOf<S>>,
    intents_rx: Mutex<mpsc::UnboundedReceiver<IntentOf<S>>>,
}

impl<S: Slots> Mvc<S> {
    pub fn new(
        name: impl Into<String>,
        app: Weak<S::App>,
        model: S::Model,
        view: S::View,
        controller: S::Controller,
    ) -> Arc<Self> {
        let (intents_tx, intents_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            name: name.into(),
            app,
            model,
            view,
            controller,
            initialized: AtomicBool::new(false),
            intents_tx,
            intents_rx: Mutex::new(intents_rx),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning application, if it is still alive.
    pub fn app(&self) -> Option<Arc<S::App>> {
        self.app.upgrade()
    }

    pub fn model(&self) -> &S::Model {
        &self.model
    }

    pub fn view(&self) -> &S::View {
        &self.view
    }

    pub fn controller(&self) -> &S::Controller {
        &self.controller
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Initializes model, view and controller in that order, each after the
    /// previous one completed. Stops at the first failure.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), MvcError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(MvcError::AlreadyInitialized(self.name.clone()));
        }

        info!(mvc = %self.name, phase = %Phase::Model, "initializing");
        self.model
            .initialize(self)
            .await
            .map_err(|source| self.phase_error(Phase::Model, source))?;

        info!(mvc = %self.name, phase = %Phase::View, "initializing");
        self.view
            .initialize(self)
            .await
            .map_err(|source| self.phase_error(Phase::View, source))?;

        info!(mvc = %self.name, phase = %Phase::Controller, "initializing");
        self.controller
            .initialize(self)
            .await
            .map_err(|source| self.phase_error(Phase::Controller, source))?;

        info!(mvc = %self.name, "initialized");
        Ok(())
    }

    fn phase_error(&self, phase: Phase, source: anyhow::Error) -> MvcError {
        warn!(mvc = %self.name, %phase, error = %source, "initialization failed");
        MvcError::Initialize {
            name: self.name.clone(),
            phase,
            source,
        }
    }

    /// Queues an intent for the controller. Intents are handed over one at
    /// a time, in submission order.
    pub fn submit(&self, intent: IntentOf<S>) {
        debug!(mvc = %self.name, ?intent, "intent submitted");
        if self.intents_tx.send(intent).is_err() {
            warn!(mvc = %self.name, "intent queue closed; dropping intent");
        }
    }

    /// Waits for the next queued intent. Cancel-safe.
    pub async fn next_intent(&self) -> Option<IntentOf<S>> {
        self.intents_rx.lock().await.recv().await
    }

    pub async fn dispatch(&self, intent: IntentOf<S>) -> anyhow::Result<()> {
        self.controller.dispatch(intent).await
    }

    /// Dispatches everything already queued without waiting for more.
    pub async fn dispatch_pending(&self) -> anyhow::Result<usize> {
        let mut dispatched = 0;
        loop {
            let next = self.intents_rx.lock().await.try_recv().ok();
            let Some(intent) = next else {
                return Ok(dispatched);
            };
            self.controller.dispatch(intent).await?;
            dispatched += 1;
        }
    }
}

/// A member's reference back to its container, set once during
/// `initialize` and resolved lazily afterwards.
pub struct BackRef<S: Slots> {
    mvc: OnceLock<Weak<Mvc<S>>>,
}

impl<S: Slots> Default for BackRef<S> {
    fn default() -> Self {
        Self {
            mvc: OnceLock::new(),
        }
    }
}

impl<S: Slots> BackRef<S> {
    pub fn bind(&self, mvc: &Arc<Mvc<S>>) -> Result<(), MvcError> {
        let weak = Arc::downgrade(mvc);
        match self.mvc.get() {
            Some(existing) if Weak::ptr_eq(existing, &weak) => Ok(()),
            Some(_) => Err(MvcError::AlreadyBound),
            None => self.mvc.set(weak).map_err(|_| MvcError::AlreadyBound),
        }
    }

    pub fn get(&self) -> Result<Arc<Mvc<S>>, MvcError> {
        self.mvc
            .get()
            .and_then(Weak::upgrade)
            .ok_or(MvcError::Detached)
    }

    pub fn is_bound(&self) -> bool {
        self.mvc.get().is_some()
    }
}

#[cfg(test)]
#[path = "tests/container_tests.rs"]
mod tests;
