//! HTTP protocol layer module
//!
//! Provides HTTP response builders, decoupled from the request handler.

pub mod response;

// Re-export commonly used types
pub use response::{
    build_404_response, build_405_response, build_health_response, build_json_response,
};
