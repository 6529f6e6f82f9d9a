//! CLI command implementations

pub mod config;
pub mod id;

pub use config::execute as config;
pub use id::execute as id;
