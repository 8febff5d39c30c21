//! Node configuration: the ring position of a node and its protocol timings.

use crate::error::RingError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8083;

/// Timings of the token protocol, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Lower bound of the randomized think time before entering the critical section.
    pub think_min_ms: u64,
    /// Upper bound (inclusive) of the think time.
    pub think_max_ms: u64,
    /// Time spent inside the critical section.
    pub hold_ms: u64,
    /// Delay before a received PONG is forwarded.
    pub pong_delay_ms: u64,
    /// Pause between two dial attempts to the next node.
    pub retry_backoff_ms: u64,
    pub retry_attempts: u32,
    /// Received values that may be handled concurrently.
    pub max_in_flight: usize,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            think_min_ms: 1_000,
            think_max_ms: 5_000,
            hold_ms: 5_000,
            pong_delay_ms: 1_000,
            retry_backoff_ms: 2_000,
            retry_attempts: 5,
            max_in_flight: 64,
        }
    }
}

impl Timings {
    /// Function that draws a think time uniformly from `[think_min, think_max]`.
    pub fn think_time<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.random_range(self.think_min_ms..=self.think_max_ms))
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    pub fn pong_delay(&self) -> Duration {
        Duration::from_millis(self.pong_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), RingError> {
        if self.think_min_ms > self.think_max_ms {
            return Err(RingError::Config(format!(
                "think_min_ms ({}) is larger than think_max_ms ({})",
                self.think_min_ms, self.think_max_ms
            )));
        }
        if self.retry_attempts == 0 {
            return Err(RingError::Config("retry_attempts must be at least 1".into()));
        }
        if self.max_in_flight == 0 {
            return Err(RingError::Config("max_in_flight must be at least 1".into()));
        }
        Ok(())
    }

    /// Function that returns the timings as a JSON formatted `String`.
    pub fn to_json_string(&self) -> Result<String, RingError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Function that parses the timings from a JSON formatted `String`.
    pub fn from_json_string(timings: &str) -> Result<Self, RingError> {
        let timings = serde_json::from_str::<Self>(timings)?;
        timings.validate()?;
        Ok(timings)
    }
}

/// Where a node listens, who comes next on the ring, and whether it seeds the tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub port: u16,
    pub next_address: String,
    pub next_port: u16,
    pub init: bool,
    #[serde(default)]
    pub timings: Timings,
}

impl NodeConfig {
    pub fn new(port: u16, next_address: String, next_port: u16, init: bool) -> Self {
        Self {
            port,
            next_address,
            next_port,
            init,
            timings: Timings::default(),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn listen_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn next_node_address(&self) -> String {
        format!("{}:{}", self.next_address, self.next_port)
    }

    pub fn validate(&self) -> Result<(), RingError> {
        if self.next_address.is_empty() {
            return Err(RingError::Config("next node address is required".into()));
        }
        if self.next_port == 0 {
            return Err(RingError::Config("next node port is required".into()));
        }
        self.timings.validate()
    }

    /// Function that returns the configuration as a JSON formatted `String`.
    pub fn to_json_string(&self) -> Result<String, RingError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Function that parses the configuration from a JSON formatted `String`.
    pub fn from_json_string(config: &str) -> Result<Self, RingError> {
        let config = serde_json::from_str::<Self>(config)?;
        config.validate()?;
        Ok(config)
    }
}
