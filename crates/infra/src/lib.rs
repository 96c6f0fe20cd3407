//! # SpBridge Infrastructure
//!
//! Everything in SpBridge that performs I/O.
//!
//! This crate contains:
//! - The transport gateway and its reqwest implementation
//! - Environment classification (live vs local)
//! - The write-token session with background renewal
//! - The list client and its directory/mail passthroughs
//! - Configuration loading from environment variables and files
//!
//! ## Architecture
//! - Wire rules and types come from `spbridge-domain`
//! - Every remote call goes through the [`http::Transport`] trait
//! - The library never installs a tracing subscriber

pub mod api;
pub mod config;
pub mod environment;
pub mod errors;
pub mod http;
pub mod session;

// Re-export commonly used items
pub use api::ListClient;
pub use environment::{Environment, LocalDelay};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, Transport, TransportRequest, TransportResponse};
pub use session::SessionTokenManager;
