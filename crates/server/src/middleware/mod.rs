//! HTTP middleware stack for the loyalty server.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors and transactions)
//! 2. `TraceLayer` (request span with `request_id` and `caller` fields)
//! 3. Request ID (add unique ID to each request)
//!
//! Caller identity is an extractor rather than a layer so that `/health`
//! stays reachable without it.

pub mod caller;
pub mod request_id;

pub use caller::{CALLER_HEADER, Caller, MissingCaller};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
