//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Rate limiter, rejects early
//! 2. Gate, session cookie + role check
//! 3. Audit logger, logs after the gate so it has the user id

pub mod audit;
pub mod auth;
pub mod rate;
