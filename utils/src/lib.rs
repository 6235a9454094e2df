//! Shared utilities for stakeward.

pub mod logging;
pub mod throttle;
pub mod time;

pub use logging::{init_logging, LogFormat, LoggingError};
pub use throttle::{LogThrottle, ThrottleDecision};
pub use time::format_duration;
