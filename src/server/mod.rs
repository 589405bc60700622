// Server module entry
// Listener creation, accept loop, connection serving and signal handling

pub mod connection;
pub mod listener;
pub mod serve;
pub mod signal;

// Re-export commonly used items
pub use listener::create_listener;
pub use serve::run;
pub use signal::shutdown_signal;
