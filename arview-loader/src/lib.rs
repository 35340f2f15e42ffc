//! Model loading for arview
//!
//! One load is three steps, each behind its own type:
//! - [`Fetcher`]: one HTTP GET, success is status 200 and nothing else
//! - [`ModelStore`]: write the body to a fixed file, overwriting it
//! - [`AssetParser`]: hand the file to the glTF library off the calling thread
//!
//! [`ModelLoader`] runs them in order and reduces the result to a
//! [`LoadOutcome`]. Every failure is logged where it happens and then
//! returned; nothing here retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use arview_loader::{GltfParser, HttpFetcher, ModelLoader, ModelStore};
//!
//! let loader = ModelLoader::new(
//!     HttpFetcher::new()?,
//!     ModelStore::new(ModelStore::default_documents_dir()),
//!     GltfParser,
//! );
//! let outcome = loader.load("https://example.com/robot.glb").await;
//! ```

mod asset_loader;
mod fetch;
mod pipeline;
mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use arview_protocol::{LoadErrorKind, LoadFailure, LoadOutcome, LoadedAsset};
pub use asset_loader::{AssetParser, GltfParser, ParseOptions};
pub use fetch::{Fetcher, HttpFetcher};
pub use pipeline::ModelLoader;
pub use store::{MODEL_FILE_NAME, ModelStore};

use thiserror::Error;

/// Error types for load operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid URL {0:?}: {1}")]
    InvalidUrl(String, String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("glTF document has no scene")]
    NoScene,

    #[error("Node {0} appears more than once in the scene hierarchy")]
    InvalidHierarchy(usize),

    #[error("Load task failed: {0}")]
    Task(String),

    #[error("Load task was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Error::InvalidUrl(..) => LoadErrorKind::InvalidUrl,
            Error::Transport(_) => LoadErrorKind::Transport,
            Error::Status(_) => LoadErrorKind::HttpStatus,
            Error::Io(_) => LoadErrorKind::Write,
            Error::Gltf(_) | Error::InvalidHierarchy(_) => LoadErrorKind::Parse,
            Error::NoScene => LoadErrorKind::NoScene,
            Error::Task(_) | Error::Cancelled => LoadErrorKind::Task,
        }
    }

    /// Serializable form for the protocol.
    pub fn to_failure(&self) -> LoadFailure {
        LoadFailure {
            kind: self.kind(),
            message: self.to_string(),
            status_code: match self {
                Error::Status(code) => Some(*code),
                _ => None,
            },
        }
    }
}
