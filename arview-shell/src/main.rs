//! arview-shell CLI binary
//!
//! Usage: arview-shell [OPTIONS] [URL]...

use arview_shell::{Args, ShellConfig};
use clap::Parser;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ShellConfig::from_args(Args::parse());

    match arview_shell::run(config).await {
        Ok(report) => println!("{}", report),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
