//! List and directory client
//!
//! [`ListClient`] is the request engine: it shapes calls, attaches the write
//! token from its session and unwraps responses. The people-directory and
//! mail passthroughs live in [`directory`] and share the same client.

pub mod client;
pub mod directory;

pub use client::ListClient;
