//! Rate limiting logic and state management.

mod cleanup;
mod clock;
mod key;
mod limiter;
mod record;
mod registry;

pub use cleanup::spawn_cleanup;
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::LimitKey;
pub use limiter::RateLimiter;
pub use record::{RateLimitRecord, RateLimitStatus, MAX_WINDOW_MS};
pub use registry::{ActionClass, LimiterSet};
