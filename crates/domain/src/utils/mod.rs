//! Pure helpers for the wire format

pub mod codec;
pub mod filter;
pub mod odata;
