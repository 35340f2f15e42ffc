//! arview-shell - headless shell for the arview model viewer
//!
//! Plays the part of the view controller: sends lifecycle events, types
//! each URL into the field and presses "Done", then reports where the last
//! load ended up.
//!
//! # Usage
//!
//! ```text
//! arview-shell [--home DIR] [--hide-statistics] [--timeout-secs N] [URL]...
//! ```
//!
//! With no URLs, one URL is read from each stdin line.

pub mod config;
pub mod runtime;

pub use config::{Args, HOME_ENV, ShellConfig};
pub use runtime::{Loader, Runtime};

use arview::LoadStatus;
use arview::protocol::{Event, LifecycleEvent};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Loader error: {0}")]
    Loader(#[from] arview_loader::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Where a run ended up.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: LoadStatus,
    pub models_attached: u32,
    pub root_children: usize,
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.status {
            LoadStatus::Idle => write!(f, "No model requested")?,
            LoadStatus::Loading { load_id, url } => write!(f, "{} still loading {}", load_id, url)?,
            LoadStatus::Complete { load_id } => write!(f, "{} complete", load_id)?,
            LoadStatus::Failed { load_id, failure } => write!(f, "{} failed: {}", load_id, failure)?,
            LoadStatus::Cancelled { load_id } => write!(f, "{} cancelled", load_id)?,
        }
        write!(
            f,
            " ({} models attached, {} root children)",
            self.models_attached, self.root_children
        )
    }
}

/// Run the viewer over `config.urls`, or over stdin lines if there are none.
///
/// Each URL is submitted after the previous load has finished.
pub async fn run(config: ShellConfig) -> Result<RunReport> {
    let mut runtime = Runtime::new(&config)?;

    runtime.dispatch(Event::Lifecycle(LifecycleEvent::Init));
    runtime.dispatch(Event::Lifecycle(LifecycleEvent::Appear));

    if config.urls.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let url = line.trim();
            if url.is_empty() {
                continue;
            }
            runtime.submit(url);
            runtime.wait_for_loads().await;
        }
    } else {
        for url in &config.urls {
            runtime.submit(url);
            runtime.wait_for_loads().await;
        }
    }

    runtime.dispatch(Event::Lifecycle(LifecycleEvent::Disappear));
    runtime.shutdown().await;

    Ok(RunReport {
        status: runtime.status().clone(),
        models_attached: runtime.core().attached_models(),
        root_children: runtime.view().scene().root_child_count(),
    })
}
