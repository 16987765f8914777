use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

// Largest span chrono accepts.
const MAX_COOLDOWN_SECS: i64 = i64::MAX / 1_000;

/// Alert state of one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CooldownState {
    #[default]
    Armed,
    Cooling { last_fired_at: DateTime<Utc> },
}

/// Per-symbol cooldown. Owned by a single monitor task, so no locking.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    cooldown: Duration,
    states: HashMap<String, CooldownState>,
}

impl CooldownGate {
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown: Duration::seconds(
                i64::try_from(cooldown_secs)
                    .unwrap_or(i64::MAX)
                    .min(MAX_COOLDOWN_SECS),
            ),
            states: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn state(&self, key: &str) -> CooldownState {
        self.states.get(key).copied().unwrap_or_default()
    }

    /// True when `key` is armed or its cooldown has fully elapsed at `now`.
    /// An elapsed cooldown re-arms the key.
    pub fn allows(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        match self.state(key) {
            CooldownState::Armed => true,
            CooldownState::Cooling { last_fired_at } => {
                if now - last_fired_at >= self.cooldown {
                    debug!(symbol = key, "Cooldown elapsed, re-armed");
                    self.states.insert(key.to_string(), CooldownState::Armed);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_fire(&mut self, key: &str, now: DateTime<Utc>) {
        self.states
            .insert(key.to_string(), CooldownState::Cooling { last_fired_at: now });
    }

    pub fn last_fired_at(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.state(key) {
            CooldownState::Cooling { last_fired_at } => Some(last_fired_at),
            CooldownState::Armed => None,
        }
    }

    /// Time left before `key` may fire again; zero when armed.
    pub fn remaining(&self, key: &str, now: DateTime<Utc>) -> Duration {
        match self.state(key) {
            CooldownState::Armed => Duration::zero(),
            CooldownState::Cooling { last_fired_at } => {
                (self.cooldown - (now - last_fired_at)).max(Duration::zero())
            }
        }
    }
}
