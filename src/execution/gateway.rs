use crate::error::VenueError;
use crate::models::{EntryRequest, OrderResult, StopModifyRequest};

/// Order transport to the trading venue
///
/// A `Rejected` status is a normal answer, not an error; `Err` means the request
/// did not get a definite answer.
#[allow(async_fn_in_trait)]
pub trait ExecutionGateway {
    async fn submit_entry(&mut self, request: &EntryRequest) -> Result<OrderResult, VenueError>;

    async fn modify_stop_loss(
        &mut self,
        request: &StopModifyRequest,
    ) -> Result<OrderResult, VenueError>;

    /// Close every open position on `symbol`
    async fn close_all(&mut self, symbol: &str) -> Result<OrderResult, VenueError>;

    /// Whether `ticket` is still open at the venue
    async fn is_position_open(&mut self, ticket: u64) -> Result<bool, VenueError>;
}
