use std::future::Future;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollUntilError {
    #[error("Condition error: {0:?}")]
    ConditionError(String),

    #[error("Condition not satisfied")]
    ConditionNotSatisfied,

    #[error("Timeout reached")]
    Timeout,
}

/// Re-evaluate `condition` every `delay` until it succeeds, fails with something other than
/// [`PollUntilError::ConditionNotSatisfied`], or `timeout` passes.
pub async fn poll_until<F, Fut, R>(
    condition: F,
    timeout: tokio::time::Duration,
    delay: tokio::time::Duration,
) -> Result<R, PollUntilError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<R, PollUntilError>>,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < timeout {
        match condition().await {
            Err(PollUntilError::ConditionNotSatisfied) => tokio::time::sleep(delay).await,
            result => return result,
        }
    }
    Err(PollUntilError::Timeout)
}
