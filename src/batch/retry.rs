//! Retry with backoff for store round trips
//!
//! Every query and commit goes through [`RetryExecutor::execute`], which
//! bounds each attempt with a timeout and retries transient store errors
//! with a configurable backoff. Permanent errors are returned at once.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::store::{StoreError, StoreResult};

/// Retry configuration with backoff strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first one
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    #[serde(default)]
    pub backoff: BackoffStrategy,

    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,

    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    #[serde(default)]
    pub jitter: bool,

    /// Jitter factor (0.0 to 1.0)
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff: BackoffStrategy::default(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            jitter: false,
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetryConfig {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }

    /// Reject settings that cannot produce a sane delay
    pub fn validate(&self) -> Result<(), String> {
        if self.attempts == 0 {
            return Err("attempts must be at least 1".to_string());
        }
        if let BackoffStrategy::Exponential { base } = self.backoff {
            if !base.is_finite() || base <= 0.0 {
                return Err(format!("exponential base must be a positive number, got {base}"));
            }
        }
        if !self.jitter_factor.is_finite() || !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(format!(
                "jitter_factor must be between 0.0 and 1.0, got {}",
                self.jitter_factor
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(format!(
                "initial_delay {:?} exceeds max_delay {:?}",
                self.initial_delay, self.max_delay
            ));
        }
        Ok(())
    }
}

/// Backoff strategies for retry delays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Linear increase in delay
    Linear {
        #[serde(with = "humantime_serde")]
        increment: Duration,
    },
    /// Exponential increase in delay
    Exponential {
        #[serde(default = "default_exponential_base")]
        base: f64,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential {
            base: default_exponential_base(),
        }
    }
}

/// Runs store calls with a per-attempt timeout and bounded retries
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    call_timeout: Duration,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig, call_timeout: Duration) -> Self {
        Self {
            config,
            call_timeout,
        }
    }

    /// Execute a store call with timeout and retry
    pub async fn execute<F, Fut, T>(&self, mut operation: F, context: &str) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let max_attempts = self.config.attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match tokio::time::timeout(self.call_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(self.call_timeout)),
            };

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", context, attempt);
                    }
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.apply_jitter(self.calculate_delay(attempt));
                    warn!(
                        "Retrying {} (attempt {}/{}) after {:?}: {}",
                        context, attempt, max_attempts, delay, err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Calculate delay before the retry that follows `attempt`.
    /// Saturates at `max_delay` instead of overflowing.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let max_delay = self.config.max_delay;
        let steps = attempt.saturating_sub(1);
        let base_delay = match &self.config.backoff {
            BackoffStrategy::Fixed => self.config.initial_delay,
            BackoffStrategy::Linear { increment } => increment
                .checked_mul(steps)
                .and_then(|extra| self.config.initial_delay.checked_add(extra))
                .unwrap_or(max_delay),
            BackoffStrategy::Exponential { base } => {
                let exponent = i32::try_from(steps).unwrap_or(i32::MAX);
                let secs = self.config.initial_delay.as_secs_f64() * base.powi(exponent);
                Duration::try_from_secs_f64(secs).unwrap_or(max_delay)
            }
        };

        base_delay.min(max_delay)
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        let factor = self.config.jitter_factor;
        if !self.config.jitter || !factor.is_finite() || factor <= 0.0 {
            return delay;
        }

        let mut rng = rand::rng();
        let jitter_range = delay.as_secs_f64() * factor.min(1.0);
        let jitter = rng.random_range(-jitter_range / 2.0..=jitter_range / 2.0);
        Duration::try_from_secs_f64((delay.as_secs_f64() + jitter).max(0.0)).unwrap_or(delay)
    }
}

// Default functions for serde
fn default_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_jitter_factor() -> f64 {
    0.3
}

fn default_exponential_base() -> f64 {
    2.0
}
