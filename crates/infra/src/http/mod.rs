//! Transport gateway
//!
//! The request engine only shapes calls; executing them is the job of a
//! [`Transport`]. [`HttpClient`] is the reqwest-backed implementation used in
//! production, tests substitute mock servers behind it.

pub mod client;
pub mod transport;

pub use client::{HttpClient, HttpClientBuilder};
pub use transport::{Transport, TransportRequest, TransportResponse};
