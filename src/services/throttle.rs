//! Fixed pause after every external request.
//!
//! There is exactly one caller at a time, so no token bucket is needed: the
//! pause alone keeps the request rate under the public APIs' limits.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// No pause at all.
    #[cfg(test)]
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
