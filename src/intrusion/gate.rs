use std::time::{Duration, Instant};

/// Enforces a minimum interval between two externally visible alerts
#[derive(Debug, Clone)]
pub struct AlertGate {
    cooldown: Duration,
    last_alert: Option<Instant>,
    fired: u64,
}

impl AlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert: None,
            fired: 0,
        }
    }

    /// Whether an alert may fire at `now`. Does not change state.
    pub fn can_fire(&self, now: Instant) -> bool {
        match self.last_alert {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.cooldown,
        }
    }

    /// Fire if the cooldown has elapsed, recording `now` as the last alert
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if !self.can_fire(now) {
            return false;
        }
        self.last_alert = Some(now);
        self.fired += 1;
        true
    }

    pub fn last_alert(&self) -> Option<Instant> {
        self.last_alert
    }

    /// Alerts fired over the gate's lifetime
    pub fn fired(&self) -> u64 {
        self.fired
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
