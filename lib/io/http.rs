use async_trait::async_trait;
use derive_more::{Display, Error};
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

/// The reason why an http exchange failed.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
pub enum HttpError {
    #[display(fmt = "the request timed out")]
    Timeout,

    #[display(fmt = "failed to reach the remote host")]
    Connectivity,

    #[display(fmt = "the remote host replied with status code `{_0}`")]
    Status(#[error(not(source))] u16),

    #[display(fmt = "the response body could not be decoded")]
    Malformed,
}

#[doc(hidden)]
impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_decode() {
            HttpError::Malformed
        } else {
            HttpError::Connectivity
        }
    }
}

/// A json-over-http interface.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Http {
    /// Issues a read request.
    async fn get(&self, url: String, query: Vec<(String, String)>) -> Result<Value, HttpError>;

    /// Issues a write request.
    async fn post(&self, url: String, body: Value) -> Result<Value, HttpError>;
}

/// An [`Http`] interface backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct Api {
    client: reqwest::Client,
    timeout: Duration,
}

impl Api {
    /// Constructs [`Api`] with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        Api {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn decode(rsp: reqwest::Response) -> Result<Value, HttpError> {
        let status = rsp.status();

        if !status.is_success() {
            return Err(HttpError::Status(status.as_u16()));
        }

        Ok(rsp.json().await?)
    }
}

#[async_trait]
impl Http for Api {
    #[instrument(level = "trace", skip(self), err)]
    async fn get(&self, url: String, query: Vec<(String, String)>) -> Result<Value, HttpError> {
        let rsp = self
            .client
            .get(&url)
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await?;

        Self::decode(rsp).await
    }

    #[instrument(level = "trace", skip(self, body), err)]
    async fn post(&self, url: String, body: Value) -> Result<Value, HttpError> {
        let rsp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await?;

        Self::decode(rsp).await
    }
}
