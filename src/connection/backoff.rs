use std::time::Duration;

use crate::types::ConnectionConfig;

/// Capped exponential delay between connection attempts
///
/// Yields `initial`, then multiplies by `multiplier` each step until `max`.
/// The sequence never ends; the supervisor stops consuming it on shutdown.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    multiplier: f64,
    max: Duration,
    current: Duration,
    attempt: u32,
}

impl Backoff {
    /// Create a schedule
    #[must_use]
    pub fn new(initial: Duration, multiplier: f64, max: Duration) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        Self {
            initial,
            multiplier,
            max,
            current: initial.min(max),
            attempt: 0,
        }
    }

    /// Schedule from connection settings
    #[must_use]
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(
            config.initial_backoff,
            config.backoff_multiplier,
            config.max_backoff,
        )
    }

    /// Delay to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.attempt = self.attempt.saturating_add(1);
        self.current = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max)
            .min(self.max);
        delay
    }

    /// Number of delays handed out since the last reset
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Start over after a successful connection
    pub fn reset(&mut self) {
        self.current = self.initial.min(self.max);
        self.attempt = 0;
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}
