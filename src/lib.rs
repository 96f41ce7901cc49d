//! AgendaPRO action throttle
//!
//! Fixed-window rate limiting for repeated client actions (sign-in attempts,
//! backend calls, uploads) before they reach the hosted backend. Each action
//! class has its own limiter and key space; a background task sweeps expired
//! windows so key maps stay bounded.
//!
//! This is a UX throttle, not a security boundary: state lives in memory for
//! the life of the process.

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod telemetry;
