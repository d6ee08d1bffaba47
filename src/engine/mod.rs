// Trading loop: gates, retries and the single-position session
pub mod retry;
pub mod runner;
pub mod session;

pub use retry::RetryPolicy;
pub use runner::{CycleOutcome, CycleReport, Engine, HaltReason};
pub use session::TradingSession;
