//! Waiting for asynchronous provider actions.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use super::ActionApi;
use super::error::ActionError;
use super::types::{Action, ActionStatus};

/// Default interval between two status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default upper bound for a single wait.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Polls actions until they succeed, fail or run out of time.
///
/// The waiter holds no state besides its timing, so it is freely copyable.
/// Dropping the future returned by [`ActionWaiter::wait`] stops polling at the
/// next suspension point.
#[derive(Debug, Clone, Copy)]
pub struct ActionWaiter {
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for ActionWaiter {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_ACTION_TIMEOUT)
    }
}

impl ActionWaiter {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for `action` to finish. An absent action counts as finished.
    pub async fn wait<A>(&self, api: &A, action: Option<&Action>) -> Result<(), ActionError>
    where
        A: ActionApi + ?Sized,
    {
        let Some(action) = action else {
            return Ok(());
        };

        let deadline = Instant::now() + self.timeout;
        debug!(action = action.id, command = %action.command, "Waiting for action");

        loop {
            sleep(self.poll_interval).await;

            if Instant::now() >= deadline {
                return Err(ActionError::TimedOut {
                    id: action.id,
                    timeout: self.timeout,
                });
            }

            let current = api
                .get_action(action.id)
                .await
                .map_err(|source| ActionError::Poll {
                    id: action.id,
                    source,
                })?;

            match current.status {
                ActionStatus::Success => {
                    debug!(action = action.id, command = %action.command, "Action completed");
                    return Ok(());
                }
                ActionStatus::Error => {
                    let failure = current.error.unwrap_or_default();
                    return Err(ActionError::Failed {
                        id: action.id,
                        command: current.command,
                        code: failure.code,
                        message: failure.message,
                    });
                }
                ActionStatus::Running => {
                    debug!(action = action.id, "Action still running");
                }
            }
        }
    }

    /// Wait for every action in order, stopping at the first failure.
    pub async fn wait_all<A>(&self, api: &A, actions: &[Action]) -> Result<(), ActionError>
    where
        A: ActionApi + ?Sized,
    {
        for action in actions {
            self.wait(api, Some(action)).await?;
        }
        Ok(())
    }
}
