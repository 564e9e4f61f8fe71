//! Shared types for the betting-pool limit platform

pub mod constants;
pub mod errors;
pub mod types;

pub use errors::*;
pub use types::*;
