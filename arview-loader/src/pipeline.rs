//! Fetch -> persist -> parse

use std::sync::Arc;

use arview_protocol::{LoadOutcome, LoadedAsset};

use crate::asset_loader::{AssetParser, ParseOptions};
use crate::fetch::Fetcher;
use crate::store::ModelStore;
use crate::{Error, Result};

/// Runs one model load at a time per call; calls may overlap.
pub struct ModelLoader<F, P> {
    fetcher: F,
    store: ModelStore,
    parser: Arc<P>,
    options: ParseOptions,
}

impl<F: Fetcher, P: AssetParser> ModelLoader<F, P> {
    pub fn new(fetcher: F, store: ModelStore, parser: P) -> Self {
        Self {
            fetcher,
            store,
            parser: Arc::new(parser),
            options: ParseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Load `url` and report the result as a [`LoadOutcome`].
    pub async fn load(&self, url: &str) -> LoadOutcome {
        match self.try_load(url).await {
            Ok(asset) => LoadOutcome::Complete(asset),
            Err(Error::Cancelled) => LoadOutcome::Cancelled,
            Err(e) => LoadOutcome::Failed(e.to_failure()),
        }
    }

    /// Fetch the body, overwrite the model file with it, then parse that file.
    ///
    /// Nothing is written unless the fetch succeeded.
    pub async fn try_load(&self, url: &str) -> Result<LoadedAsset> {
        log::info!("Loading model from {}", url);

        let bytes = self.fetcher.fetch(url).await?;

        self.store.write(&bytes).await.map_err(|e| {
            log::error!("Failed to write {}: {}", self.store.path().display(), e);
            e
        })?;

        let parser = self.parser.clone();
        let path = self.store.path().to_path_buf();
        let options = self.options.clone();
        let parsed = tokio::task::spawn_blocking(move || parser.parse(&path, &options))
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    Error::Cancelled
                } else {
                    Error::Task(e.to_string())
                }
            })?;

        parsed.map_err(|e| {
            log::error!("Failed to parse model from {}: {}", url, e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Route, TestServer, animated_glb, cyclic_glb, temp_dir, unused_port};
    use crate::{GltfParser, HttpFetcher};
    use arview_protocol::LoadErrorKind;

    fn loader(name: &str) -> ModelLoader<HttpFetcher, GltfParser> {
        ModelLoader::new(
            HttpFetcher::new().unwrap(),
            ModelStore::new(temp_dir(name)),
            GltfParser,
        )
    }

    #[tokio::test]
    async fn test_load_writes_then_parses() {
        let body = animated_glb();
        let server = TestServer::start(vec![Route::ok("/robot.glb", body.clone())]);
        let loader = loader("pipeline-ok");

        let outcome = loader.load(&server.url("/robot.glb")).await;
        let LoadOutcome::Complete(asset) = outcome else {
            panic!("Expected Complete, got {:?}", outcome);
        };

        let written = std::fs::read(loader.store().path()).unwrap();
        assert_eq!(written, body);
        assert_eq!(asset.path, loader.store().path().display().to_string());
        assert_eq!(asset.animations.len(), 2);
    }

    #[tokio::test]
    async fn test_404_writes_nothing() {
        let server = TestServer::start(vec![]);
        let loader = loader("pipeline-404");

        let outcome = loader.load(&server.url("/missing.glb")).await;
        match outcome {
            LoadOutcome::Failed(failure) => {
                assert_eq!(failure.kind, LoadErrorKind::HttpStatus);
                assert_eq!(failure.status_code, Some(404));
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert!(!loader.store().path().exists());
    }

    #[tokio::test]
    async fn test_connection_refused_writes_nothing() {
        let loader = loader("pipeline-refused");
        let url = format!("http://127.0.0.1:{}/model.glb", unused_port());

        match loader.load(&url).await {
            LoadOutcome::Failed(failure) => assert_eq!(failure.kind, LoadErrorKind::Transport),
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert!(!loader.store().path().exists());
    }

    #[tokio::test]
    async fn test_unparseable_body_is_still_written() {
        let server = TestServer::start(vec![Route::ok("/page.glb", b"<html></html>".to_vec())]);
        let loader = loader("pipeline-garbage");

        match loader.load(&server.url("/page.glb")).await {
            LoadOutcome::Failed(failure) => assert_eq!(failure.kind, LoadErrorKind::Parse),
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert_eq!(std::fs::read(loader.store().path()).unwrap(), b"<html></html>");
    }

    #[tokio::test]
    async fn test_cyclic_nodes_fail_as_parse_error() {
        let server = TestServer::start(vec![Route::ok("/cycle.glb", cyclic_glb())]);
        let loader = loader("pipeline-cycle");

        match loader.load(&server.url("/cycle.glb")).await {
            LoadOutcome::Failed(failure) => {
                assert_eq!(failure.kind, LoadErrorKind::Parse);
                assert!(failure.message.contains("more than once"));
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_load_overwrites_file() {
        let server = TestServer::start(vec![
            Route::ok("/a.glb", animated_glb()),
            Route::ok("/b.glb", b"bbbb".to_vec()),
        ]);
        let loader = loader("pipeline-overwrite");

        assert!(matches!(
            loader.load(&server.url("/a.glb")).await,
            LoadOutcome::Complete(_)
        ));
        let _ = loader.load(&server.url("/b.glb")).await;
        assert_eq!(std::fs::read(loader.store().path()).unwrap(), b"bbbb");
    }
}
