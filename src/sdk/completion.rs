use crate::UspError;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed(UspError),
}

impl TurnOutcome {
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Set-once turn outcome shared between the event task and the waiter.
///
/// The first terminal event wins; later ones are logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal {
    outcome: Arc<OnceLock<TurnOutcome>>,
}

impl CompletionSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome. Returns `false` if one was already recorded.
    pub fn complete(&self, outcome: TurnOutcome) -> bool {
        match self.outcome.set(outcome) {
            Ok(()) => true,
            Err(ignored) => {
                tracing::warn!(?ignored, "Turn already finished; ignoring second terminal event");
                false
            }
        }
    }

    #[must_use]
    pub fn outcome(&self) -> Option<TurnOutcome> {
        self.outcome.get().cloned()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// Poll until a terminal event has been recorded.
    ///
    /// There is no timeout: a silent service keeps the caller waiting.
    pub async fn wait(&self, poll_interval: Duration) -> TurnOutcome {
        loop {
            if let Some(outcome) = self.outcome() {
                return outcome;
            }
            if poll_interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_terminal_event_wins() {
        let signal = CompletionSignal::new();
        assert!(!signal.is_complete());
        assert!(signal.complete(TurnOutcome::Failed(UspError::new(1, "boom"))));
        assert!(!signal.complete(TurnOutcome::Completed));
        assert_eq!(signal.outcome(), Some(TurnOutcome::Failed(UspError::new(1, "boom"))));
    }

    #[tokio::test]
    async fn wait_returns_after_completion_from_another_task() {
        let signal = CompletionSignal::new();
        let writer = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.complete(TurnOutcome::Completed);
        });

        let outcome = tokio::time::timeout(Duration::from_secs(1), signal.wait(Duration::from_millis(5)))
            .await
            .unwrap();
        assert!(outcome.is_completed());
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_complete() {
        let signal = CompletionSignal::new();
        signal.complete(TurnOutcome::Completed);
        let outcome = tokio::time::timeout(Duration::from_millis(50), signal.wait(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Completed);
    }
}
