use async_trait::async_trait;
use burp_protocol::ChannelId;
use burp_protocol::Event;
use burp_protocol::paths;
use burp_protocol::query;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::trace;
use url::Url;

use crate::AskReceipt;
use crate::AskRequest;
use crate::ChatBackend;
use crate::ClientError;
use crate::Result;

const USER_AGENT: &str = concat!("burp/", env!("CARGO_PKG_VERSION"));

/// HTTP implementation of [`ChatBackend`].
///
/// Reads (`/recent`, `/wait`) go to the subscribe base, writes (`/ask`) to
/// the publish base. Both usually point at the same server. No request
/// timeout is set: `/wait` is expected to hang until the server's own
/// long-poll deadline.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: reqwest::Client,
    subscribe_url: Url,
    publish_url: Url,
}

impl HttpChatClient {
    /// Build a client for `subscribe_url`, publishing to `publish_url` when
    /// given and to the subscribe base otherwise.
    pub fn new(subscribe_url: &str, publish_url: Option<&str>) -> Result<Self> {
        let subscribe_url = Url::parse(subscribe_url)?;
        let publish_url = match publish_url {
            Some(url) => Url::parse(url)?,
            None => subscribe_url.clone(),
        };
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, subscribe_url, publish_url))
    }

    /// Use a preconfigured reqwest client.
    pub fn with_client(client: reqwest::Client, subscribe_url: Url, publish_url: Url) -> Self {
        Self {
            client,
            subscribe_url,
            publish_url,
        }
    }

    pub fn subscribe_url(&self) -> &Url {
        &self.subscribe_url
    }

    pub fn publish_url(&self) -> &Url {
        &self.publish_url
    }

    /// `path` is absolute, so any path on the base is replaced.
    fn endpoint(base: &Url, path: &str, pairs: &[(&str, &str)]) -> Result<Url> {
        let mut url = base.join(path)?;
        {
            let mut q = url.query_pairs_mut();
            for (key, value) in pairs {
                q.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        trace!(body = %text, "response");
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ChatBackend for HttpChatClient {
    async fn recent(&self, channel: &ChannelId) -> Result<Vec<Event>> {
        let url = Self::endpoint(
            &self.subscribe_url,
            paths::RECENT,
            &[(query::ID, channel.as_str())],
        )?;
        self.get_json(url).await
    }

    async fn wait(&self, channel: &ChannelId, after: Option<&str>) -> Result<Event> {
        let mut pairs = vec![(query::ID, channel.as_str())];
        if let Some(after) = after {
            pairs.push((query::AFTER, after));
        }
        let url = Self::endpoint(&self.subscribe_url, paths::WAIT, &pairs)?;
        self.get_json(url).await
    }

    async fn ask(&self, request: &AskRequest) -> Result<AskReceipt> {
        let params = request.params.query_pairs();
        let mut pairs = vec![
            (query::ID, request.channel.as_str()),
            (query::MODEL, request.model.as_str()),
        ];
        pairs.extend(params.iter().map(|(key, value)| (*key, value.as_str())));
        let url = Self::endpoint(&self.publish_url, paths::ASK, &pairs)?;

        debug!(%url, bytes = request.body.len(), "POST");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .body(request.body.clone())
            .send()
            .await?;
        Ok(AskReceipt {
            status: response.status().as_u16(),
        })
    }
}
