use std::time::Duration;

/// Static parameters of one CONEX-CC axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisConfig {
    /// Controller address prefixed to every command.
    pub controller_address: u8,
    /// Hardware velocity ceiling in mm/s.
    pub max_velocity: f64,
    /// Empirical position ceiling in micrometers.
    pub max_run: f64,
    pub poll_interval: Duration,
    pub default_timeout: Duration,
    pub default_retries: u32,
}

impl AxisConfig {
    pub const MAX_VELOCITY: f64 = 0.4;
    pub const MAX_RUN: f64 = 37_000.0; // empirically measured
    pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_RETRIES: u32 = 3;

    pub fn with_controller_address(mut self, address: u8) -> Self {
        self.controller_address = address;
        self
    }

    pub fn with_max_velocity(mut self, max_velocity: f64) -> Self {
        self.max_velocity = max_velocity;
        self
    }

    pub fn with_max_run(mut self, max_run: f64) -> Self {
        self.max_run = max_run;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_default_retries(mut self, retries: u32) -> Self {
        self.default_retries = retries;
        self
    }
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            controller_address: 1,
            max_velocity: Self::MAX_VELOCITY,
            max_run: Self::MAX_RUN,
            poll_interval: Self::POLL_INTERVAL,
            default_timeout: Self::DEFAULT_TIMEOUT,
            default_retries: Self::DEFAULT_RETRIES,
        }
    }
}
