//! Shell configuration from command-line arguments and the environment

use std::path::PathBuf;
use std::time::Duration;

use arview_loader::{MODEL_FILE_NAME, ModelStore};
use clap::Parser;

/// Overrides the default documents directory when `--home` is not given.
pub const HOME_ENV: &str = "ARVIEW_HOME";

#[derive(Parser, Debug)]
#[command(name = "arview-shell")]
#[command(about = "Load glTF models from URLs into a headless AR scene", long_about = None)]
pub struct Args {
    /// Directory the downloaded model is written to
    #[arg(long)]
    pub home: Option<PathBuf>,

    /// File name of the downloaded model inside the home directory
    #[arg(long, default_value = MODEL_FILE_NAME)]
    pub model_file: String,

    /// Turn off the statistics overlay
    #[arg(long)]
    pub hide_statistics: bool,

    /// Request timeout in seconds (no timeout if omitted)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Model URLs, loaded in order. Read from stdin, one per line, if none are given.
    pub urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub home: PathBuf,
    pub model_file: String,
    pub show_statistics: bool,
    pub timeout: Option<Duration>,
    pub urls: Vec<String>,
}

impl ShellConfig {
    /// Defaults for everything except the documents directory.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            model_file: MODEL_FILE_NAME.to_string(),
            show_statistics: true,
            timeout: None,
            urls: Vec::new(),
        }
    }

    pub fn from_args(args: Args) -> Self {
        let home = resolve_home(args.home, std::env::var(HOME_ENV).ok());
        Self {
            home,
            model_file: args.model_file,
            show_statistics: !args.hide_statistics,
            timeout: args.timeout_secs.map(Duration::from_secs),
            urls: args.urls,
        }
    }

    pub fn model_store(&self) -> ModelStore {
        ModelStore::with_file_name(&self.home, &self.model_file)
    }
}

/// `--home` wins over the environment, which wins over the platform default.
fn resolve_home(flag: Option<PathBuf>, env: Option<String>) -> PathBuf {
    flag.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(ModelStore::default_documents_dir)
}
