//! Command implementations

pub mod identity;
pub mod resolve;
