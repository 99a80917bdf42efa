use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::common::utils::time::duration_from_secs;
use crate::politeness::BackoffConfig;

/// Smallest multiplicative jitter factor applied to a backoff delay.
pub const JITTER_MIN: f64 = 0.5;
/// Largest multiplicative jitter factor applied to a backoff delay.
pub const JITTER_MAX: f64 = 1.5;

/// Source of multiplicative jitter factors.
///
/// Values outside of `[JITTER_MIN, JITTER_MAX]` are clamped by the controller.
pub trait JitterSource {
    fn next_factor(&mut self) -> f64;
}

impl<F: FnMut() -> f64> JitterSource for F {
    fn next_factor(&mut self) -> f64 {
        self()
    }
}

/// Jitter drawn uniformly from `[JITTER_MIN, JITTER_MAX]`.
pub struct RandomJitter {
    rng: SmallRng,
}

impl RandomJitter {
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Deterministic jitter, useful for reproducing a run.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl JitterSource for RandomJitter {
    fn next_factor(&mut self) -> f64 {
        self.rng.random_range(JITTER_MIN..=JITTER_MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffState {
    Idle,
    Waiting { attempt: u32 },
    Exhausted { attempts: u32 },
}

/// What should happen after a unit was deferred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStep {
    Wait { attempt: u32, delay: Duration },
    Exhausted { attempts: u32 },
}

/// Unjittered delay (in seconds) of the given attempt, `attempt` starts at 1.
pub fn base_delay(config: &BackoffConfig, attempt: u32) -> f64 {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let delay = config.initial_seconds * config.multiplier.powi(exponent);
    // powi can overflow to infinity for large attempts
    if delay.is_finite() {
        delay.min(config.max_seconds)
    } else {
        config.max_seconds
    }
}

/// Exponential backoff of a single unit.
///
/// Each defer increments the attempt counter. When the counter reaches `max_attempts`,
/// the controller becomes exhausted and stays exhausted until it is reset.
pub struct BackoffController {
    config: BackoffConfig,
    state: BackoffState,
    total_wait: Duration,
}

impl BackoffController {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            config: config.clone(),
            state: BackoffState::Idle,
            total_wait: Duration::ZERO,
        }
    }

    pub fn state(&self) -> BackoffState {
        self.state
    }

    /// Sum of all delays handed out since the last reset.
    pub fn total_wait(&self) -> Duration {
        self.total_wait
    }

    pub fn on_defer(&mut self, jitter: &mut dyn JitterSource) -> BackoffStep {
        let attempt = match self.state {
            BackoffState::Idle => 1,
            BackoffState::Waiting { attempt } => attempt + 1,
            BackoffState::Exhausted { attempts } => return BackoffStep::Exhausted { attempts },
        };
        if attempt >= self.config.max_attempts {
            self.state = BackoffState::Exhausted { attempts: attempt };
            return BackoffStep::Exhausted { attempts: attempt };
        }

        let factor = jitter.next_factor().clamp(JITTER_MIN, JITTER_MAX);
        let seconds = (base_delay(&self.config, attempt) * factor).min(self.config.max_seconds);
        let delay = duration_from_secs(seconds);

        self.state = BackoffState::Waiting { attempt };
        self.total_wait += delay;
        BackoffStep::Wait { attempt, delay }
    }

    pub fn reset(&mut self) {
        self.state = BackoffState::Idle;
        self.total_wait = Duration::ZERO;
    }
}
