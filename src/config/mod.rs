// Configuration module entry point
// Loads layered configuration and holds the shared application state

mod state;
mod types;

use hyper::header::HeaderValue;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

// Re-export public types
pub use state::AppState;
pub use types::{Config, FunctionConfig};

/// Config file used when `WATCHDOG_CONFIG` is not set
pub const DEFAULT_CONFIG_FILE: &str = "watchdog.toml";

/// Upper bound on the time kept between the function deadline and the
/// connection deadline for writing the envelope
const MAX_RESPONSE_MARGIN: Duration = Duration::from_secs(5);

impl Config {
    /// Load configuration from the process environment
    ///
    /// `WATCHDOG_CONFIG` selects the config file, `PORT` overrides the listening port.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("WATCHDOG_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&config_path, std::env::var("PORT").ok())
    }

    /// Load configuration from specified file path, with an optional port override
    ///
    /// Priority: defaults < file < `WATCHDOG__*` environment < `port`.
    pub fn load_from(config_path: &str, port: Option<String>) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("WATCHDOG")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(" ")
                    .with_list_parse_key("function.args")
                    .try_parsing(true),
            )
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "watchdog")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_override_option("server.port", port)?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would break requests at runtime
    fn validate(&self) -> Result<(), config::ConfigError> {
        HeaderValue::from_str(&self.http.server_name).map_err(|e| {
            config::ConfigError::Message(format!(
                "invalid http.server_name {:?}: {e}",
                self.http.server_name
            ))
        })?;

        let connection_secs = self.connection_deadline().as_secs();
        if connection_secs == 0 {
            return Err(config::ConfigError::Message(
                "performance.read_timeout or performance.write_timeout must be non-zero"
                    .to_string(),
            ));
        }
        if self.function.timeout >= connection_secs {
            return Err(config::ConfigError::Message(format!(
                "function.timeout ({}s) must be below the connection deadline ({connection_secs}s)",
                self.function.timeout
            )));
        }
        Ok(())
    }

    /// Lifetime of a single connection: the larger of read and write timeout
    pub fn connection_deadline(&self) -> Duration {
        Duration::from_secs(std::cmp::max(
            self.performance.read_timeout,
            self.performance.write_timeout,
        ))
    }

    /// Time one function call may take
    ///
    /// Always ends before the connection deadline, leaving a quarter of it
    /// (at most 5s) to send the envelope.
    pub fn function_deadline(&self) -> Duration {
        let connection = self.connection_deadline();
        let ceiling = connection - std::cmp::min(connection / 4, MAX_RESPONSE_MARGIN);
        match self.function.timeout {
            0 => ceiling,
            secs => std::cmp::min(Duration::from_secs(secs), ceiling),
        }
    }

    pub const fn keep_alive_enabled(&self) -> bool {
        self.performance.keep_alive_timeout > 0
    }

    /// Address the watchdog binds: all interfaces on the configured port
    pub fn get_socket_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.server.port))
    }
}
