//! Authenticated JSON client for the site backend.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::application::{BackendError, BackendResult};
use crate::config::BackendSettings;

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(client: Client, base: Url, token: Option<String>) -> Self {
        Self {
            client,
            base,
            token,
        }
    }

    pub fn user_agent() -> &'static str {
        concat!("vetrina/", env!("CARGO_PKG_VERSION"))
    }

    /// Shared connection pool configured from settings.
    pub fn build_http(settings: &BackendSettings) -> BackendResult<Client> {
        Client::builder()
            .user_agent(Self::user_agent())
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()
            .map_err(BackendError::transport)
    }

    /// Same connection pool, different credential.
    pub fn with_token(&self, token: Option<String>) -> Self {
        Self {
            client: self.client.clone(),
            base: self.base.clone(),
            token,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve path segments under the base URL. Segments are percent-encoded.
    pub fn url(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                BackendError::Transport(format!("base url `{}` cannot hold a path", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn request(&self, method: Method, segments: &[&str]) -> BackendResult<RequestBuilder> {
        let url = self.url(segments)?;
        debug!(method = %method, url = %url, "Backend request");
        let req = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> BackendResult<T> {
        let resp = self
            .request(Method::GET, segments)?
            .send()
            .await
            .map_err(BackendError::transport)?;
        Self::handle(resp, segments).await
    }

    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> BackendResult<()> {
        let resp = self
            .request(method, segments)?
            .json(body)
            .send()
            .await
            .map_err(BackendError::transport)?;
        Self::check(resp, segments).await.map(drop)
    }

    pub async fn post_json_for<B, T>(&self, segments: &[&str], body: &B) -> BackendResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .request(Method::POST, segments)?
            .json(body)
            .send()
            .await
            .map_err(BackendError::transport)?;
        Self::handle(resp, segments).await
    }

    pub async fn send_no_body(&self, method: Method, segments: &[&str]) -> BackendResult<()> {
        let resp = self
            .request(method, segments)?
            .send()
            .await
            .map_err(BackendError::transport)?;
        Self::check(resp, segments).await.map(drop)
    }

    pub(crate) async fn handle<T: DeserializeOwned>(
        resp: Response,
        segments: &[&str],
    ) -> BackendResult<T> {
        let resp = Self::check(resp, segments).await?;
        let bytes = resp.bytes().await.map_err(BackendError::transport)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| BackendError::Rejected(format!("failed to parse body: {e}")))
    }

    pub(crate) async fn check(resp: Response, segments: &[&str]) -> BackendResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        Err(status_error(status, &segments.join("/"), &text))
    }
}

pub(crate) fn status_error(status: StatusCode, path: &str, body: &str) -> BackendError {
    match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(path.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
        _ => BackendError::Rejected(format!("status {status} body {body}")),
    }
}
