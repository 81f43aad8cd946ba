//! Command handlers for CLI operations

pub mod work;

pub use work::WorkCommandHandler;
