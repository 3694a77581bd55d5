//! Helpers shared across the client: protocol constants and URL handling.

pub mod constants;
pub mod url;

pub use constants::*;
