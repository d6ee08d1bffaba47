// Order execution and position tracking
pub mod gateway;
pub mod paper;
pub mod position_manager;

pub use gateway::ExecutionGateway;
pub use paper::PaperVenue;
pub use position_manager::{
    EntryOutcome, ExitReason, PositionManager, PositionState, TrailOutcome, TrailingRule,
};
