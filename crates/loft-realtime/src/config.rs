//! Realtime client configuration and endpoint derivation.

use std::time::Duration;

use crate::backoff::BackoffConfig;

/// Fixed, well-known endpoint suffix for the realtime socket.
pub const ENDPOINT_PATH: &str = "/ws";

/// Configuration for the realtime client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    // Endpoint
    /// Host (and optional port) of the server.
    pub host: String,
    /// Use `wss` instead of `ws`.
    pub secure: bool,
    /// Explicit development host; overrides `host` when set.
    pub dev_host: Option<String>,

    // Connection
    /// Hard timeout for the initial `connect` call.
    pub connect_timeout: Duration,

    // Heartbeat
    /// Interval between liveness probes while connected.
    pub heartbeat_interval: Duration,

    // Reconnection
    /// Delay before the first reconnection attempt.
    pub reconnect_initial_delay: Duration,
    /// Cap on the delay between reconnection attempts. Never reached with
    /// the default attempt ceiling; kept as a safety bound.
    pub reconnect_max_delay: Duration,
    /// Backoff multiplier for reconnection delays.
    pub reconnect_backoff_factor: f64,
    /// Number of reconnection attempts before giving up.
    pub reconnect_max_attempts: u32,
    /// Random jitter factor (0.0-1.0) for reconnection delays.
    pub reconnect_jitter: f64,

    // Channels
    /// Capacity of the outbound frame channel.
    pub command_channel_capacity: usize,
    /// Capacity of the control channel.
    pub control_channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            secure: true,
            dev_host: None,
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            reconnect_initial_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(300),
            reconnect_backoff_factor: 2.0,
            reconnect_max_attempts: 5,
            reconnect_jitter: 0.0,
            command_channel_capacity: 64,
            control_channel_capacity: 4,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration for the given host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set whether to use a secure (`wss`) endpoint.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set an explicit development host, overriding `host`.
    #[must_use]
    pub fn dev_host(mut self, host: impl Into<String>) -> Self {
        self.dev_host = Some(host.into());
        self
    }

    /// Set the initial connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the heartbeat interval.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the initial reconnection delay.
    #[must_use]
    pub fn reconnect_initial_delay(mut self, delay: Duration) -> Self {
        self.reconnect_initial_delay = delay;
        self
    }

    /// Set the reconnection backoff factor.
    #[must_use]
    pub fn reconnect_backoff_factor(mut self, factor: f64) -> Self {
        self.reconnect_backoff_factor = factor;
        self
    }

    /// Set the reconnection attempt ceiling.
    #[must_use]
    pub fn reconnect_max_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_max_attempts = attempts;
        self
    }

    /// Set the reconnection jitter factor.
    #[must_use]
    pub fn reconnect_jitter(mut self, jitter: f64) -> Self {
        self.reconnect_jitter = jitter;
        self
    }

    /// Derive the full endpoint URL.
    ///
    /// Scheme follows the `secure` flag; the host is the development
    /// override when one is set; the path is the fixed [`ENDPOINT_PATH`].
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        let host = self.dev_host.as_deref().unwrap_or(&self.host);
        format!("{scheme}://{host}{ENDPOINT_PATH}")
    }

    pub(crate) fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: self.reconnect_initial_delay,
            max_delay: self.reconnect_max_delay,
            factor: self.reconnect_backoff_factor,
            jitter: self.reconnect_jitter,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() && self.dev_host.is_none() {
            return Err("Host cannot be empty".to_string());
        }
        self.backoff().validate()?;
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout must be > 0".to_string());
        }
        if self.heartbeat_interval.is_zero() {
            return Err("Heartbeat interval must be > 0".to_string());
        }
        if self.command_channel_capacity == 0 {
            return Err("Command channel capacity must be > 0".to_string());
        }
        if self.control_channel_capacity == 0 {
            return Err("Control channel capacity must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.host.is_empty());
        assert!(config.secure);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.reconnect_initial_delay, Duration::from_secs(1));
        assert_eq!(config.reconnect_backoff_factor, 2.0);
        assert_eq!(config.reconnect_max_attempts, 5);
        assert_eq!(config.reconnect_jitter, 0.0);
    }

    #[test]
    fn test_url_derivation() {
        let config = ClientConfig::new("chat.example.com");
        assert_eq!(config.url(), "wss://chat.example.com/ws");

        let config = ClientConfig::new("chat.example.com").secure(false);
        assert_eq!(config.url(), "ws://chat.example.com/ws");

        let config = ClientConfig::new("chat.example.com").dev_host("localhost:8080");
        assert_eq!(config.url(), "wss://localhost:8080/ws");
    }

    #[test]
    fn test_builder_pattern() {
        let config = ClientConfig::new("chat.example.com")
            .heartbeat_interval(Duration::from_secs(15))
            .reconnect_initial_delay(Duration::from_millis(500))
            .reconnect_max_attempts(3)
            .reconnect_jitter(0.1);

        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.reconnect_initial_delay, Duration::from_millis(500));
        assert_eq!(config.reconnect_max_attempts, 3);
        assert_eq!(config.reconnect_jitter, 0.1);
    }

    #[test]
    fn test_validation_empty_host() {
        let config = ClientConfig::default();
        let result = config.validate();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), "Host cannot be empty");

        // A dev host alone is enough.
        let config = ClientConfig::default().dev_host("localhost:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_backoff() {
        let config = ClientConfig::new("chat.example.com").reconnect_backoff_factor(0.5);
        let result = config.validate();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), "Backoff factor must be >= 1.0");
    }

    #[test]
    fn test_validation_zero_heartbeat() {
        let config = ClientConfig::new("chat.example.com").heartbeat_interval(Duration::ZERO);
        let result = config.validate();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), "Heartbeat interval must be > 0");
    }
}
