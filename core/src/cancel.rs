//! Racing futures against a [`CancellationToken`].
//!
//! The select is `biased` toward the token. A poller cancelled between two
//! awaits must stop at the next one, even when that future is already
//! ready: a zero retry delay, or a `/wait` answered from a buffer, would
//! otherwise let an unbiased select pick the future and run one more
//! iteration after shutdown was requested.

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// The token fired before the future finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

#[async_trait]
pub trait OrCancelExt: Sized {
    type Output;

    /// `Ok(output)` if the future completes first, `Err(Cancelled)` if the
    /// token fires first. An already-cancelled token always wins.
    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, Cancelled>;
}

#[async_trait]
impl<F> OrCancelExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, Cancelled> {
        tokio::select! {
            biased;
            () = token.cancelled() => Err(Cancelled),
            res = self => Ok(res),
        }
    }
}
