use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior, interval};

use crate::error::InitError;

/// Fixed-interval throttle: at most `limit` acquisitions per second.
#[derive(Debug)]
pub struct RateLimiter {
    period: Duration,
    ticker: Option<Interval>,
}

impl RateLimiter {
    /// Throttle to `limit` acquisitions per second. Zero is rejected.
    pub fn per_second(limit: u32) -> Result<Self, InitError> {
        if limit == 0 {
            return Err(InitError::InvalidSetting {
                key: "request-limit",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            period: Duration::from_secs(1) / limit,
            ticker: None,
        })
    }

    /// Minimum spacing between two acquisitions.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next slot. The first call returns immediately.
    pub async fn acquire(&mut self) {
        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(
            RateLimiter::per_second(0),
            Err(InitError::InvalidSetting {
                key: "request-limit",
                ..
            })
        ));
    }

    #[test]
    fn period_is_one_second_over_limit() {
        assert_eq!(
            RateLimiter::per_second(10).unwrap().period(),
            Duration::from_millis(100)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn acquisitions_are_spaced_by_period() {
        let mut limiter = RateLimiter::per_second(4).unwrap();
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(750), "{elapsed:?}");
    }
}
