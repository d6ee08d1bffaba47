// Core modules
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod notify;
pub mod risk;
pub mod strategy;

// Re-export commonly used types
pub use api::{AccountSource, MarketData};
pub use engine::{CycleOutcome, Engine, HaltReason};
pub use error::{FatalError, VenueError};
pub use models::*;
pub use strategy::Strategy;
