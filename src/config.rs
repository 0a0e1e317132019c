use std::time::Duration;

/// Configuration for drivers.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Config {
    /// Configures the maximum amount of time to wait for an attempted voice
    /// connection (or resumption) to complete.
    ///
    /// Defaults to 10 seconds. If set to `None`, connections will never
    /// time out.
    pub driver_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl Config {
    /// Sets this `Config`'s timeout for establishing a voice connection.
    #[must_use]
    pub fn driver_timeout(mut self, driver_timeout: Option<Duration>) -> Self {
        self.driver_timeout = driver_timeout;

        self
    }
}
