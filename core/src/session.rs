use std::sync::Arc;
use std::time::Duration;

use burp_backend_client::AskRequest;
use burp_backend_client::ChatBackend;
use burp_protocol::ChannelId;
use burp_protocol::GenerationParams;
use burp_protocol::MAX_MESSAGE_BYTES;
use burp_protocol::ModelId;
use burp_protocol::Nickname;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::dispatcher::Reconciler;
use crate::error::CoreError;
use crate::error::Result;
use crate::poll::PollDriver;
use crate::segmenter::LineSegmenter;
use crate::transcript::DisplayLine;
use crate::transcript::TranscriptSink;
use crate::transcript::append_line;

/// One user's view of one channel.
///
/// The poller runs in its own task and owns the reconciler while it runs;
/// [`ChatSession::restore`] hands the state back so a later
/// [`ChatSession::spawn_poller`] resumes from the same cursor instead of
/// replaying history again.
pub struct ChatSession<B: ?Sized> {
    backend: Arc<B>,
    sink: Arc<dyn TranscriptSink>,
    channel: ChannelId,
    model: ModelId,
    params: GenerationParams,
    nickname: watch::Sender<Nickname>,
    retry_delay: Duration,
    load_history: bool,
    max_pending_bytes: Option<usize>,
    reconciler: Option<Reconciler>,
}

impl<B> ChatSession<B>
where
    B: ChatBackend + ?Sized + 'static,
{
    pub fn new(config: &AppConfig, backend: Arc<B>, sink: Arc<dyn TranscriptSink>) -> Result<Self> {
        config.validate()?;
        let (nickname, _) = watch::channel(config.nickname());
        Ok(Self {
            backend,
            sink,
            channel: config.channel(),
            model: config.model()?,
            params: config.generation,
            nickname,
            retry_delay: config.retry_delay(),
            load_history: config.session.load_history,
            max_pending_bytes: config.max_pending_bytes(),
            reconciler: None,
        })
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// `!status` or `#name`.
    pub fn channel_label(&self) -> String {
        self.channel.label()
    }

    pub fn nickname(&self) -> Nickname {
        self.nickname.borrow().clone()
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    pub fn set_model(&mut self, model: ModelId) {
        self.model = model;
    }

    pub fn params(&self) -> GenerationParams {
        self.params
    }

    pub fn set_params(&mut self, params: GenerationParams) {
        self.params = params;
    }

    /// Returns `false` and keeps the old name when nothing survives
    /// sanitising. A running poller picks the new name up on its next event.
    pub fn set_nickname(&self, raw: &str) -> bool {
        let Some(nick) = Nickname::sanitize(raw) else {
            return false;
        };
        debug!(nickname = %nick, "nickname changed");
        self.nickname.send_replace(nick);
        true
    }

    /// Switch channels. Takes effect on the next [`ChatSession::spawn_poller`];
    /// the saved cursor belongs to the old channel and is dropped.
    pub fn set_channel(&mut self, raw: &str) -> bool {
        let Some(channel) = ChannelId::sanitize(raw) else {
            return false;
        };
        if channel != self.channel {
            info!(from = %self.channel, to = %channel, "switching channel");
            self.channel = channel;
            self.reconciler = None;
        }
        true
    }

    /// Publish one raw message body. HTTP rejections become
    /// [`CoreError::Rejected`].
    pub async fn send(&self, body: &str) -> Result<()> {
        let request = AskRequest {
            channel: self.channel.clone(),
            model: self.model.clone(),
            params: self.params,
            body: body.to_string(),
        };
        let receipt = self.backend.ask(&request).await?;
        if !receipt.is_success() {
            return Err(CoreError::Rejected {
                status: receipt.status,
            });
        }
        Ok(())
    }

    /// Send what the user typed. Returns `Ok(false)` when there was nothing
    /// to send. Failures are also reported in the transcript.
    pub async fn submit(&self, text: &str) -> Result<bool> {
        let body = text.trim();
        if body.is_empty() {
            return Ok(false);
        }
        if body.len() > MAX_MESSAGE_BYTES {
            let err = CoreError::MessageTooLong {
                len: body.len(),
                max: MAX_MESSAGE_BYTES,
            };
            append_line(self.sink.as_ref(), DisplayLine::help(err.to_string()));
            return Err(err);
        }

        self.sink.set_busy(true);
        if let Err(err) = self.send(body).await {
            warn!(channel = %self.channel, error = %err, "send failed");
            self.sink.set_busy(false);
            append_line(
                self.sink.as_ref(),
                DisplayLine::help(format!("try again; send failed: {err}")),
            );
            return Err(err);
        }
        Ok(true)
    }

    /// Start following the channel. History is replayed only when there is
    /// no saved cursor to resume from.
    pub fn spawn_poller(&mut self, cancel: CancellationToken) -> JoinHandle<Reconciler> {
        let nickname = self.nickname();
        let mut reconciler = self.reconciler.take().unwrap_or_else(|| {
            Reconciler::new(nickname.clone(), LineSegmenter::new(self.max_pending_bytes))
        });
        reconciler.set_nickname(nickname);
        let catch_up = self.load_history && reconciler.cursor().after().is_none();
        let driver = PollDriver::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.sink),
            self.channel.clone(),
            reconciler,
        )
        .with_retry_delay(self.retry_delay)
        .with_catch_up(catch_up)
        .follow_nickname(self.nickname.subscribe());
        tokio::spawn(driver.run(cancel))
    }

    /// Keep the state a finished poller returned.
    pub fn restore(&mut self, reconciler: Reconciler) {
        self.reconciler = Some(reconciler);
    }
}
