//! Catch-up followed by the long-poll loop.

use std::sync::Arc;
use std::time::Duration;

use burp_backend_client::ChatBackend;
use burp_backend_client::ClientError;
use burp_protocol::ChannelId;
use burp_protocol::Nickname;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::cancel::OrCancelExt;
use crate::dispatcher::Reconciler;
use crate::transcript::DisplayLine;
use crate::transcript::TranscriptSink;
use crate::transcript::append_line;

/// Pause after a failed `/wait` before polling again.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Drives one channel subscription until cancelled.
///
/// Only one `/wait` is ever in flight; the next one is issued after the
/// previous response has been reconciled, so the cursor sent is always the
/// newest one seen.
pub struct PollDriver<B: ?Sized> {
    backend: Arc<B>,
    sink: Arc<dyn TranscriptSink>,
    channel: ChannelId,
    reconciler: Reconciler,
    retry_delay: Duration,
    catch_up: bool,
    nickname: Option<watch::Receiver<Nickname>>,
}

impl<B> PollDriver<B>
where
    B: ChatBackend + ?Sized,
{
    pub fn new(
        backend: Arc<B>,
        sink: Arc<dyn TranscriptSink>,
        channel: ChannelId,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            backend,
            sink,
            channel,
            reconciler,
            retry_delay: DEFAULT_RETRY_DELAY,
            catch_up: true,
            nickname: None,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Skip or keep the `/recent` replay before the live loop.
    pub fn with_catch_up(mut self, catch_up: bool) -> Self {
        self.catch_up = catch_up;
        self
    }

    /// Pick up nickname changes made while the loop is running.
    pub fn follow_nickname(mut self, rx: watch::Receiver<Nickname>) -> Self {
        self.nickname = Some(rx);
        self
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Replay recent history, oldest first.
    pub async fn catch_up(&mut self) -> Result<(), ClientError> {
        let events = self.backend.recent(&self.channel).await?;
        debug!(channel = %self.channel, count = events.len(), "replaying history");
        self.sync_nickname();
        self.reconciler.replay_recent(&events, self.sink.as_ref());
        Ok(())
    }

    /// One `/wait` round trip from the current cursor.
    pub async fn poll_once(&mut self) -> Result<(), ClientError> {
        let event = self
            .backend
            .wait(&self.channel, self.reconciler.cursor().after())
            .await?;
        self.sync_nickname();
        self.reconciler.reconcile(&event, self.sink.as_ref());
        Ok(())
    }

    /// Run until `cancel` fires and hand back the final state.
    ///
    /// Failures never end the loop: each one is reported as a help line and
    /// retried after `retry_delay` from the unchanged cursor.
    pub async fn run(mut self, cancel: CancellationToken) -> Reconciler {
        info!(channel = %self.channel, "poller started");

        if self.catch_up {
            match self.catch_up().or_cancel(&cancel).await {
                Err(_) => return self.stop(),
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(channel = %self.channel, error = %e, "history load failed");
                    self.help(format!("history load failed: {e}"));
                }
            }
        }

        loop {
            match self.poll_once().or_cancel(&cancel).await {
                Err(_) => break,
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    let secs = self.retry_delay.as_secs_f64();
                    warn!(channel = %self.channel, error = %e, "poll failed");
                    self.help(format!("poll failed; retrying in {secs}s: {e}"));
                    if tokio::time::sleep(self.retry_delay)
                        .or_cancel(&cancel)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }

        self.stop()
    }

    fn stop(self) -> Reconciler {
        info!(
            channel = %self.channel,
            after = self.reconciler.cursor().after(),
            "poller stopped"
        );
        self.reconciler
    }

    fn help(&self, text: String) {
        append_line(self.sink.as_ref(), DisplayLine::help(text));
    }

    fn sync_nickname(&mut self) {
        if let Some(rx) = self.nickname.as_mut()
            && rx.has_changed().unwrap_or(false)
        {
            self.reconciler.set_nickname(rx.borrow_and_update().clone());
        }
    }
}
