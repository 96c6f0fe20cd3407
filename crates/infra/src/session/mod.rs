//! Write-token session
//!
//! Mutating calls must carry a short-lived form digest obtained from the
//! context-info endpoint. [`SessionTokenManager`] acquires it, keeps it
//! fresh in the background and reports readiness.

pub mod token_manager;

pub use token_manager::SessionTokenManager;
