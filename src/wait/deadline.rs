//! Deadlines for waits

use std::time::Duration;

use tokio::time::Instant;

/// A point in time a wait gives up at, plus the budget it was created with
/// (kept for error messages). The timer backing it only exists while a race
/// is polling `expired()`, so settling the race early is what cancels it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    expires_at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
            budget,
        }
    }

    /// The full duration this deadline was created with
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Time left (zero once expired)
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Completes when the deadline passes
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.expires_at).await
    }
}
