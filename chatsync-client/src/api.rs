//! REST collaborator consumed by the synchronizer.
//!
//! The core only depends on [`StreamApi`]; [`HttpStreamApi`] is the reqwest
//! implementation used by real hosts.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    config::ClientConfig,
    models::{
        ErrorResponse, LikeState, Message, MessageId, MessagePage, PostMessageRequest,
        StreamAccessResponse, SubjectId,
    },
};
use tracing::{debug, instrument};
use url::Url;

use crate::error::ApiError;

/// The five operations the synchronizer needs from the server.
///
/// Page 1 of [`StreamApi::list_messages`] is the most recent page; items in
/// a page come back in display order.
#[async_trait]
pub trait StreamApi: Send + Sync {
    /// Fetches one page of top-level messages.
    async fn list_messages(
        &self,
        subject: SubjectId,
        page: u32,
        page_size: usize,
    ) -> Result<MessagePage, ApiError>;

    /// Fetches one page of replies under `message`, oldest first.
    async fn list_replies(
        &self,
        message: MessageId,
        page: u32,
        page_size: usize,
    ) -> Result<MessagePage, ApiError>;

    /// Posts a top-level message, or a reply when `parent` is set.
    async fn post_message(
        &self,
        subject: SubjectId,
        content: &str,
        parent: Option<MessageId>,
    ) -> Result<Message, ApiError>;

    /// Flips the viewer's like and returns the authoritative state.
    async fn toggle_like(&self, message: MessageId) -> Result<LikeState, ApiError>;

    /// Fetches chat access metadata for `subject`.
    async fn stream_access(&self, subject: SubjectId) -> Result<StreamAccessResponse, ApiError>;
}

/// HTTP client for the stream API.
#[derive(Clone, Debug)]
pub struct HttpStreamApi {
    base_url: Url,
    client: Client,
}

impl HttpStreamApi {
    /// Create a client rooted at `base_url`. A trailing `/` is added when
    /// missing so endpoint joins keep the last path segment.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidUrl`] if the normalized URL does not parse.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut raw = base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Self::with_client(Url::parse(&raw)?, Client::new()))
    }

    /// Create a client from an existing reqwest client, e.g. one carrying a
    /// cookie jar or custom timeouts.
    #[must_use]
    pub fn with_client(base_url: Url, client: Client) -> Self {
        Self { base_url, client }
    }

    /// Build a client from the resolved configuration.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidUrl`] if the configured base URL is invalid.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url)
    }

    /// Base URL every endpoint is joined onto.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn paged(request: RequestBuilder, page: u32, page_size: usize) -> RequestBuilder {
        request.query(&[("page", page.to_string()), ("page_size", page_size.to_string())])
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                error: ErrorResponse::from_body(&body),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl StreamApi for HttpStreamApi {
    #[instrument(name = "api.list_messages", skip(self), err)]
    async fn list_messages(
        &self,
        subject: SubjectId,
        page: u32,
        page_size: usize,
    ) -> Result<MessagePage, ApiError> {
        let url = self.api_url(&format!("subjects/{subject}/messages"))?;
        let response = Self::paged(self.client.get(url), page, page_size)
            .send()
            .await?;
        Self::decode(response).await
    }

    #[instrument(name = "api.list_replies", skip(self), err)]
    async fn list_replies(
        &self,
        message: MessageId,
        page: u32,
        page_size: usize,
    ) -> Result<MessagePage, ApiError> {
        let url = self.api_url(&format!("messages/{message}/replies"))?;
        let response = Self::paged(self.client.get(url), page, page_size)
            .send()
            .await?;
        Self::decode(response).await
    }

    #[instrument(name = "api.post_message", skip(self, content), err)]
    async fn post_message(
        &self,
        subject: SubjectId,
        content: &str,
        parent: Option<MessageId>,
    ) -> Result<Message, ApiError> {
        let url = self.api_url(&format!("subjects/{subject}/messages"))?;
        let payload = PostMessageRequest {
            content: content.to_string(),
            parent_id: parent,
        };
        let response = self.client.post(url).json(&payload).send().await?;
        let message: Message = Self::decode(response).await?;
        debug!(message_id = %message.id, "message posted");
        Ok(message)
    }

    #[instrument(name = "api.toggle_like", skip(self), err)]
    async fn toggle_like(&self, message: MessageId) -> Result<LikeState, ApiError> {
        let url = self.api_url(&format!("messages/{message}/like"))?;
        let response = self.client.post(url).send().await?;
        Self::decode(response).await
    }

    #[instrument(name = "api.stream_access", skip(self), err)]
    async fn stream_access(&self, subject: SubjectId) -> Result<StreamAccessResponse, ApiError> {
        let url = self.api_url(&format!("subjects/{subject}/access"))?;
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }
}
