//! View lifecycle: constructed → initialized → attached → active ⇄ inactive.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    dom::{Document, DomError, NodeId},
    listeners::ListenerSet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Constructed,
    Initialized,
    Attached,
    Active,
    Inactive,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("view is not initialized")]
    NotInitialized,
    #[error("view is already initialized")]
    AlreadyInitialized,
    #[error("view is not attached to a host node")]
    NotAttached,
    #[error("view is already attached under {0}")]
    AlreadyAttached(NodeId),
    #[error("view is already active")]
    AlreadyActive,
    #[error(transparent)]
    Dom(#[from] DomError),
}

struct ViewBaseState {
    state: ViewState,
    host: Option<NodeId>,
    listeners: ListenerSet,
}

/// Shared plumbing for concrete views: owns the stage element, enforces
/// the lifecycle transitions and tracks listeners registered on activation.
pub struct ViewBase {
    document: Arc<Document>,
    stage: OnceLock<NodeId>,
    inner: Mutex<ViewBaseState>,
}

impl ViewBase {
    pub fn new(document: Arc<Document>) -> Self {
        Self {
            document,
            stage: OnceLock::new(),
            inner: Mutex::new(ViewBaseState {
                state: ViewState::Constructed,
                host: None,
                listeners: ListenerSet::default(),
            }),
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// Creates the detached stage element every other element hangs from.
    pub fn initialize(&self) -> Result<NodeId, LifecycleError> {
        let mut inner = self.inner.lock();
        if inner.state != ViewState::Constructed {
            return Err(LifecycleError::AlreadyInitialized);
        }
        let stage = self.document.create_element("div");
        self.document.set_class_name(stage, "Stage")?;
        self.stage
            .set(stage)
            .map_err(|_| LifecycleError::AlreadyInitialized)?;
        inner.state = ViewState::Initialized;
        Ok(stage)
    }

    pub fn stage(&self) -> Result<NodeId, LifecycleError> {
        self.stage.get().copied().ok_or(LifecycleError::NotInitialized)
    }

    pub fn state(&self) -> ViewState {
        self.inner.lock().state
    }

    pub fn host(&self) -> Option<NodeId> {
        self.inner.lock().host
    }

    pub fn attach(&self, host: NodeId) -> Result<(), LifecycleError> {
        let mut inner = self.inner.lock();
        match inner.state {
            ViewState::Constructed => return Err(LifecycleError::NotInitialized),
            ViewState::Initialized => {}
            ViewState::Attached | ViewState::Active | ViewState::Inactive => {
                return Err(LifecycleError::AlreadyAttached(
                    inner.host.unwrap_or(host),
                ));
            }
        }
        let stage = self.stage()?;
        self.document.append_child(host, stage)?;
        inner.host = Some(host);
        inner.state = ViewState::Attached;
        info!(%host, %stage, "view attached");
        Ok(())
    }

    /// Runs `register` against a fresh listener set. On failure, whatever
    /// was registered is released again and the view stays inert.
    pub fn activate<F>(&self, register: F) -> Result<usize, LifecycleError>
    where
        F: FnOnce(&Document, &mut ListenerSet) -> Result<(), DomError>,
    {
        let mut inner = self.inner.lock();
        match inner.state {
            ViewState::Constructed | ViewState::Initialized => {
                return Err(LifecycleError::NotAttached)
            }
            ViewState::Active => return Err(LifecycleError::AlreadyActive),
            ViewState::Attached | ViewState::Inactive => {}
        }

        let mut listeners = ListenerSet::default();
        if let Err(err) = register(&self.document, &mut listeners) {
            listeners.release(&self.document);
            return Err(err.into());
        }

        let registered = listeners.len();
        inner.listeners = listeners;
        inner.state = ViewState::Active;
        info!(listeners = registered, "view activated");
        Ok(registered)
    }

    /// Removes the listeners registered by the last `activate`. A no-op
    /// unless the view is active.
    pub fn deactivate(&self) -> usize {
        let mut inner = self.inner.lock();
        if inner.state != ViewState::Active {
            debug!(state = ?inner.state, "deactivate ignored; view not active");
            return 0;
        }
        let removed = inner.listeners.release(&self.document);
        inner.state = ViewState::Inactive;
        info!(removed, "view deactivated");
        removed
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
