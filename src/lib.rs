//! NETCONF configuration agent library.

// Core
pub mod datastore;
pub mod edit;
pub mod filter;
pub mod lock;
pub mod model;
pub mod schema;
pub mod session;
pub mod validate;

// Protocol and transport
pub mod http;
pub mod net;
pub mod rpc;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::AgentConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rpc::Dispatcher;
