//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the schema and add the built-in monitoring module
//! - Load and validate the initial running configuration
//! - Assemble the dispatcher, start metrics and bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, so traffic only arrives once state is ready

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::{AgentConfig, DatastoreConfig};
use crate::datastore::Datastores;
use crate::edit::{EditApplier, EditError};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::model::{ConfigTree, Operation};
use crate::net::load_tls_config;
use crate::observability::metrics;
use crate::rpc::{decode_tree, DecodeError, Dispatcher, WireNode};
use crate::schema::builtin::monitoring_module;
use crate::schema::{load_schema, Schema, SchemaError};
use crate::session::SessionRegistry;
use crate::validate::{SchemaValidator, Validator};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Initial configuration {path} is not valid JSON: {source}")]
    InitialJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Initial configuration does not match the schema: {0}")]
    InitialDecode(#[from] DecodeError),
    #[error("Initial configuration rejected: {0}")]
    InitialInvalid(#[from] EditError),
    #[error("Invalid address '{0}'")]
    Address(String),
    #[error("Metrics exporter failed: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// The configured modules plus `ietf-netconf-monitoring`.
pub fn load_agent_schema(config: &DatastoreConfig) -> Result<Schema, StartupError> {
    let mut schema = match &config.schema_path {
        Some(path) => load_schema(Path::new(path))?,
        None => {
            tracing::warn!("No schema_path configured; only the monitoring module is loaded");
            Schema::new(Vec::new())?
        }
    };
    schema.add_module(monitoring_module())?;
    Ok(schema)
}

/// Read a JSON wire tree and apply it to an empty datastore, which both
/// resolves operations and validates the result.
pub fn load_initial_config(
    schema: &Schema,
    validator: &dyn Validator,
    path: &Path,
) -> Result<ConfigTree, StartupError> {
    let content = fs::read_to_string(path).map_err(|source| StartupError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let nodes: Vec<WireNode> =
        serde_json::from_str(&content).map_err(|source| StartupError::InitialJson {
            path: path.to_path_buf(),
            source,
        })?;
    let patch = decode_tree(schema, &nodes)?;
    let tree = EditApplier::new(schema, validator).apply(&ConfigTree::new(), &patch, Operation::Merge)?;
    tracing::info!(path = %path.display(), nodes = tree.node_count(), "Initial configuration loaded");
    Ok(tree)
}

pub fn build_dispatcher(config: &AgentConfig) -> Result<Dispatcher, StartupError> {
    let schema = Arc::new(load_agent_schema(&config.datastore)?);
    let validator = Arc::new(SchemaValidator::new(schema.clone()));

    let initial = match &config.datastore.initial_config_path {
        Some(path) => load_initial_config(&schema, validator.as_ref(), Path::new(path))?,
        None => ConfigTree::new(),
    };

    tracing::info!(
        modules = schema.modules().len(),
        candidate = config.datastore.candidate_enabled,
        max_sessions = config.sessions.max_sessions,
        "Datastores initialized"
    );

    Ok(Dispatcher::new(
        schema,
        validator,
        Datastores::new(initial, config.datastore.candidate_enabled),
        SessionRegistry::new(config.sessions.max_sessions),
    ))
}

/// Run the agent until SIGINT/SIGTERM.
pub async fn run(config: AgentConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let dispatcher = Arc::new(build_dispatcher(&config)?);
    let server = HttpServer::new(&config, dispatcher);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config
                .listener
                .bind_address
                .parse()
                .map_err(|_| StartupError::Address(config.listener.bind_address.clone()))?;
            let rustls = load_tls_config(tls).await?;
            server.run_tls(addr, rustls, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, server_shutdown).await?;
        }
    }
    Ok(())
}
