//! cli
//!
//! Command-line interface layer for cforest.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Set up logging and load configuration
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers build a [`TreeCorpusManager`] over a
//! [`FileStore`] from the [`Context`] and run one manager operation on a
//! tokio runtime. All forest changes flow through the manager.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::manager::{ManagerSettings, TreeCorpusManager};
use crate::normalize::BasicNormalizer;
use crate::store::FileStore;

/// Everything a command handler needs.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    /// File given with `--config`, if any
    pub config_path: Option<PathBuf>,
    pub store_root: PathBuf,
    pub quiet: bool,
}

impl Context {
    /// Open the store and build a manager over it.
    pub fn manager(&self) -> Result<TreeCorpusManager> {
        let store = FileStore::open(self.store_root.clone())
            .with_context(|| format!("failed to open store at {}", self.store_root.display()))?
            .with_offload_threshold(self.config.offload_threshold());

        Ok(
            TreeCorpusManager::new(Arc::new(store), Arc::new(BasicNormalizer))
                .with_settings(ManagerSettings::from_config(&self.config)),
        )
    }

    /// Run an async operation to completion.
    pub fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        Ok(runtime.block_on(future))
    }
}

/// Install the log subscriber. `RUST_LOG` wins over the flags.
///
/// Returns `false`, after a warning on stderr, if one was already installed.
fn init_tracing(debug: bool, quiet: bool) -> bool {
    let default = if debug {
        "corpus_forest=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .try_init();
    if let Err(e) = installed {
        eprintln!("warning: logging not initialized: {}", e);
        return false;
    }
    true
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug, cli.quiet);

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let store_root = cli.store.clone().unwrap_or_else(|| config.store_root());

    let ctx = Context {
        config,
        config_path: cli.config.clone(),
        store_root,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}
