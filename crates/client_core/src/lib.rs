//! Client-side collaborators of the webcam application: the HTTP fetch
//! helper and the namespaced real-time channel.

pub mod channel;
pub mod comm;

pub use channel::{ChannelError, ChannelHandler, RealtimeChannel, ReconnectPolicy};
pub use comm::{HttpComm, RemoteFetch};
