//! arview - Load glTF models from a URL into an AR scene
//!
//! The crate holds both halves of the shell-core split that run on the
//! rendering owner's thread:
//!
//! - [`ViewerCore`]: the event-driven state machine. It turns URL
//!   submissions into load requests and finished loads into scene commands.
//! - [`ArView`]: the rendering owner. It applies commands to the
//!   [`SceneGraph`], the [`ArSession`] and the [`UrlField`].
//!
//! Fetching, persisting and parsing live in `arview-loader`; the shell
//! wires the two together.
//!
//! # Example
//!
//! ```rust,ignore
//! use arview::{ArView, HeadlessSession, ViewerCore};
//! use arview::protocol::{Core, Event, LifecycleEvent};
//!
//! let mut core = ViewerCore::new();
//! let mut view = ArView::new(HeadlessSession::new());
//!
//! for command in core.handle(Event::Lifecycle(LifecycleEvent::Init)) {
//!     view.apply(command);
//! }
//! ```

mod scene;
mod session;
mod view;
mod viewer;

pub use arview_protocol as protocol;

pub use scene::{BoundAnimation, Node, NodeHandle, SceneGraph};
pub use session::{ArSession, HeadlessSession, SessionState};
pub use view::{ArView, UrlField};
pub use viewer::{LoadStatus, ViewerConfig, ViewerCore};

use thiserror::Error;

/// Error types for view operations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Animation not found: {0}")]
    AnimationNotFound(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),
}

pub type Result<T> = std::result::Result<T, Error>;
