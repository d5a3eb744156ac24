//! Viewer relay
//!
//! The transport side of the crate stops here: a [`ViewerFeed`] turns a
//! stream's freshest frames into [`ViewerMessage`]s at a fixed cadence. How
//! those messages reach a browser (WebSocket, SSE, ...) is up to the host.

pub mod feed;
pub mod message;

pub use feed::ViewerFeed;
pub use message::ViewerMessage;
