// SPDX-License-Identifier: MIT OR Apache-2.0
//! `EventGraph` driver.
//!
//! Loads the engine configuration, builds the demo workspace, fires
//! "Execute Main" on each demo graph and then pumps deferred continuations
//! until none are left.
//!
//! Usage: `eventgraph [config.ron]`

mod demo;

use eventgraph_engine::config::{ConfigError, CONFIG_FILE_NAME};
use eventgraph_engine::graph::GraphError;
use eventgraph_engine::node::RegistryError;
use eventgraph_engine::ops::create_default_registry;
use eventgraph_engine::{Engine, EngineConfig, ExecuteMain, MemoryHost, Workspace};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Driver failure
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration could not be loaded
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// Catalogue failed to register
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    /// Demo graph could not be built
    #[error("graph: {0}")]
    Graph(#[from] GraphError),

    /// Node type missing from the registry
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// Async runtime could not start
    #[error("runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() {
    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), PathBuf::from);

    // Config is read before logging starts so the filter can come from it
    let loaded = EngineConfig::load(&path);
    let filter_source = loaded
        .as_ref()
        .map_or_else(|_| EngineConfig::default().log_filter, |c| c.log_filter.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_source));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EventGraph v{}", env!("CARGO_PKG_VERSION"));

    let result = loaded.map_err(AppError::from).and_then(run);
    if let Err(e) = result {
        tracing::error!("EventGraph failed: {e}");
        std::process::exit(1);
    }
}

fn run(config: EngineConfig) -> Result<(), AppError> {
    let registry = Arc::new(create_default_registry()?);
    tracing::info!(types = registry.len(), "node catalogue loaded");

    let (mut workspace, order) = demo::workspace(&registry)?;
    let host = MemoryHost::new().with_echo(true);
    let mut engine = Engine::new(registry, config, Box::new(host));

    for name in &order {
        workspace.set_active(name);
        let report = ExecuteMain.invoke(&mut engine, &mut workspace);
        if report.is_warning() {
            tracing::warn!(graph = %name, "{}", report.message());
        } else {
            tracing::info!(graph = %name, "{}", report.message());
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(pump(&mut engine, &workspace));
    Ok(())
}

/// Resume deferred continuations as they fall due
async fn pump(engine: &mut Engine, workspace: &Workspace) {
    let mut last = Instant::now();
    while let Some(wait) = engine.next_due() {
        tokio::time::sleep(wait).await;
        let now = Instant::now();
        let summary = engine.tick(workspace, now.duration_since(last));
        last = now;
        tracing::info!(%summary, "deferred continuations resumed");
    }
    tracing::info!("no pending continuations, exiting");
}
