//! One-shot capture lifecycle for download events and interceptions.

use std::future::Future;
use std::time::Duration;

/// State of a single capture attempt.
///
/// A capture is armed before the triggering script runs and settles
/// exactly once, either on the first matching event or on timeout.
/// Settled captures ignore further events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState<T> {
    Armed,
    Fired(T),
    TimedOut,
}

impl<T> CaptureState<T> {
    pub fn arm() -> Self {
        Self::Armed
    }

    /// Wait for `event` within `timeout`.
    ///
    /// An event source that ends without producing a value counts as a
    /// timeout. Already-settled states are returned unchanged.
    pub async fn settle<F>(self, event: F, timeout: Duration) -> Self
    where
        F: Future<Output = Option<T>>,
    {
        match self {
            Self::Armed => match tokio::time::timeout(timeout, event).await {
                Ok(Some(value)) => Self::Fired(value),
                Ok(None) | Err(_) => Self::TimedOut,
            },
            settled => settled,
        }
    }

    pub fn is_fired(&self) -> bool {
        matches!(self, Self::Fired(_))
    }

    pub fn into_fired(self) -> Option<T> {
        match self {
            Self::Fired(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fires_on_event() {
        let state = CaptureState::arm()
            .settle(async { Some(7) }, Duration::from_millis(50))
            .await;
        assert_eq!(state, CaptureState::Fired(7));
    }

    #[tokio::test]
    async fn test_times_out() {
        let state: CaptureState<u8> = CaptureState::arm()
            .settle(std::future::pending(), Duration::from_millis(20))
            .await;
        assert_eq!(state, CaptureState::TimedOut);
    }

    #[tokio::test]
    async fn test_ended_source_is_timeout() {
        let state: CaptureState<u8> = CaptureState::arm()
            .settle(async { None }, Duration::from_millis(20))
            .await;
        assert_eq!(state, CaptureState::TimedOut);
    }

    #[tokio::test]
    async fn test_settled_state_is_one_shot() {
        let fired = CaptureState::Fired(1)
            .settle(async { Some(2) }, Duration::from_millis(20))
            .await;
        assert_eq!(fired.into_fired(), Some(1));

        let timed_out = CaptureState::TimedOut
            .settle(async { Some(3) }, Duration::from_millis(20))
            .await;
        assert!(!timed_out.is_fired());
    }
}
