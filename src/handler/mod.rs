//! Request handler module
//!
//! Responsible for request routing and invoking the wrapped function.

pub mod invoke;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
