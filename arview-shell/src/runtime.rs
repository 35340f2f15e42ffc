//! Runtime - owns the core, the view and the load workers
//!
//! The core and the view live on the caller's task. Loads run as tokio
//! tasks and report back through a channel; their results reach the core
//! only when the runtime drains that channel.

use std::collections::HashMap;
use std::sync::Arc;

use arview::protocol::*;
use arview::{ArView, HeadlessSession, LoadStatus, ViewerConfig, ViewerCore};
use arview_loader::{GltfParser, HttpFetcher, ModelLoader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

use crate::Result;
use crate::config::ShellConfig;

pub type Loader = ModelLoader<HttpFetcher, GltfParser>;

pub struct Runtime {
    core: ViewerCore,
    view: ArView<HeadlessSession>,
    loader: Arc<Loader>,
    tx: UnboundedSender<Event>,
    rx: UnboundedReceiver<Event>,
    tasks: JoinSet<()>,
    /// Loads whose result has not reached the core yet, by id
    pending: HashMap<LoadId, String>,
}

impl Runtime {
    pub fn new(config: &ShellConfig) -> Result<Self> {
        let fetcher = HttpFetcher::with_timeout(config.timeout)?;
        let loader = ModelLoader::new(fetcher, config.model_store(), GltfParser);
        let viewer = ViewerConfig {
            show_statistics: config.show_statistics,
            ..ViewerConfig::default()
        };

        log::info!("Model file: {}", loader.store().path().display());
        Ok(Self::with_parts(ViewerCore::with_config(viewer), loader))
    }

    pub fn with_parts(core: ViewerCore, loader: Loader) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            core,
            view: ArView::new(HeadlessSession::new()),
            loader: Arc::new(loader),
            tx,
            rx,
            tasks: JoinSet::new(),
            pending: HashMap::new(),
        }
    }

    pub fn core(&self) -> &ViewerCore {
        &self.core
    }

    pub fn view(&self) -> &ArView<HeadlessSession> {
        &self.view
    }

    pub fn status(&self) -> &LoadStatus {
        self.core.status()
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Number of loads started but not yet reported to the core.
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// Feed one event to the core and execute what it returns.
    pub fn dispatch(&mut self, event: Event) {
        if let Event::Load(LoadEvent::Finished(data)) = &event {
            self.pending.remove(&data.load_id);
        }

        for command in self.core.handle(event) {
            if let Some(LoadCommand::Start { load_id, url }) = self.view.apply(command) {
                self.spawn_load(load_id, url);
            }
        }
    }

    /// Replace the URL field's text, as typing would.
    pub fn type_url(&mut self, text: &str) {
        self.view.url_field_mut().set_text(text);
        self.dispatch(Event::Input(InputEvent::UrlChanged {
            text: text.to_string(),
        }));
    }

    /// Press "Done" on the keyboard.
    pub fn press_done(&mut self) {
        self.dispatch(Event::Input(InputEvent::DonePressed));
    }

    pub fn submit(&mut self, url: &str) {
        self.type_url(url);
        self.press_done();
    }

    fn spawn_load(&mut self, load_id: LoadId, url: String) {
        log::debug!("Spawning {} for {}", load_id, url);
        self.pending.insert(load_id.clone(), url.clone());

        let loader = self.loader.clone();
        let tx = self.tx.clone();
        self.tasks.spawn(async move {
            let outcome = loader.load(&url).await;
            let event = Event::Load(LoadEvent::Finished(LoadFinishedData {
                load_id,
                url,
                outcome,
            }));
            if tx.send(event).is_err() {
                log::warn!("Runtime dropped before load finished");
            }
        });
    }

    /// Deliver every finished load without waiting. Returns how many were delivered.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.dispatch(event);
            delivered += 1;
        }
        delivered
    }

    /// Wait for every in-flight load and deliver its result.
    ///
    /// A task that died without reporting is delivered as a failed load.
    pub async fn wait_for_loads(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                log::error!("Load task ended abnormally: {}", e);
            }
        }
        self.pump();

        for (load_id, url) in std::mem::take(&mut self.pending) {
            let failure = LoadFailure::new(LoadErrorKind::Task, "Load task ended without a result");
            self.finish(load_id, url, LoadOutcome::Failed(failure));
        }
    }

    /// Abort in-flight loads, report them as cancelled, then send `Shutdown`.
    pub async fn shutdown(&mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
        // Loads that finished before the abort still count
        self.pump();

        for (load_id, url) in std::mem::take(&mut self.pending) {
            self.finish(load_id, url, LoadOutcome::Cancelled);
        }

        self.dispatch(Event::Lifecycle(LifecycleEvent::Shutdown));
    }

    fn finish(&mut self, load_id: LoadId, url: String, outcome: LoadOutcome) {
        self.dispatch(Event::Load(LoadEvent::Finished(LoadFinishedData {
            load_id,
            url,
            outcome,
        })));
    }
}
