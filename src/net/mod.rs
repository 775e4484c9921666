//! Network layer.
//!
//! # Design Decisions
//! - TLS is optional and terminated by `axum-server` with rustls
//! - Certificates are checked at startup; a missing file is fatal

pub mod tls;

pub use tls::load_tls_config;
