//! Model-View-Controller composition harness.
//!
//! An [`Mvc`] container owns one model, one view and one controller and
//! initializes them in that order. Every member receives the shared
//! container during `initialize` and keeps a [`BackRef`] to it, which is how
//! siblings find each other afterwards. Views render into an in-memory
//! [`dom::Document`] and go through the lifecycle tracked by [`ViewBase`].

mod container;
pub mod dom;
pub mod listeners;
mod view;

pub use container::{BackRef, Controller, IntentOf, Model, Mvc, MvcError, Phase, Slots, View};
pub use dom::{Document, DomError, Event, Listener, ListenerId, NodeId};
pub use listeners::{ListenerSet, TrackedListener};
pub use view::{LifecycleError, ViewBase, ViewState};
