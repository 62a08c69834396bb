//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

use super::time::SIMULATION_TPS;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Command messages per second allowed on one session. A well-behaved
/// peer sends one input and at most one collision report per tick.
pub const COMMAND_RATE_LIMIT: u32 = SIMULATION_TPS * 2 + 10;

/// Per-session rate limiter state
#[derive(Clone)]
pub struct SessionRateLimiter {
    command_limiter: Arc<Limiter>,
}

impl SessionRateLimiter {
    pub fn new() -> Self {
        Self {
            command_limiter: create_limiter(COMMAND_RATE_LIMIT),
        }
    }

    /// Check if a command message is allowed (returns true if allowed)
    pub fn check_command(&self) -> bool {
        self.command_limiter.check().is_ok()
    }
}

impl Default for SessionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
