use std::time::Duration;

use chrono::{DateTime, Utc};

/// Longest single sleep, so a wall-clock adjustment is noticed within a
/// minute.
const MAX_NAP: Duration = Duration::from_secs(60);

/// Source of wall-clock time for scheduling.
#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Resolve once `now()` has reached `deadline`.
    async fn sleep_until(&self, deadline: DateTime<Utc>);
}

/// The real clock, backed by the system time and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait::async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        loop {
            let remaining = match (deadline - Utc::now()).to_std() {
                Ok(remaining) if !remaining.is_zero() => remaining,
                _ => return,
            };
            tokio::time::sleep(remaining.min(MAX_NAP)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_until_past_deadline_returns_immediately() {
        let clock = SystemClock;
        let deadline = clock.now() - chrono::Duration::seconds(5);
        tokio::time::timeout(Duration::from_secs(1), clock.sleep_until(deadline))
            .await
            .expect("past deadline should not block");
    }
}
