use super::{Analysis, BackendError, Evaluate};
use crate::chess::Position;
use crate::io::{Http, HttpError};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::instrument;

/// A client for analysis services whose schema the frontend consumes as is.
///
/// The decoded reply is forwarded without normalization. This is a
/// deliberate escape hatch for integrations that understand the
/// third-party schema directly, so the usual move legality screening does
/// not apply here.
pub struct Passthrough<T: Http> {
    http: T,
    url: String,
    depth: u8,
    budget: Duration,
}

impl<T: Http> Passthrough<T> {
    pub const TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(http: T, url: String, depth: u8, budget: Duration) -> Self {
        Passthrough {
            http,
            url,
            depth,
            budget,
        }
    }
}

#[async_trait]
impl<T: Http + Send + Sync> Evaluate for Passthrough<T> {
    #[instrument(level = "debug", skip(self, pos), err, fields(%pos))]
    async fn evaluate(&self, pos: &Position) -> Result<Analysis, BackendError> {
        let body = json!({
            "fen": pos.to_string(),
            "depth": self.depth,
            "maxThinkingTime": self.budget.as_millis() as u64,
        });

        let reply = match self.http.post(self.url.clone(), body).await {
            Err(HttpError::Status(code)) => return Err(BackendError::RemoteError(code)),
            reply => reply?,
        };

        Ok(Analysis::Verbatim(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MockHttp;
    use mockall::predicate::eq;
    use std::future::ready;
    use test_strategy::proptest;
    use tokio::runtime;

    #[proptest]
    fn evaluate_forwards_the_reply_unmodified(
        url: String,
        depth: u8,
        #[strategy(1u64..60000)] ms: u64,
        pos: Position,
        text: String,
    ) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        let budget = Duration::from_millis(ms);
        let body = json!({
            "fen": pos.to_string(),
            "depth": depth,
            "maxThinkingTime": ms,
        });

        let reply = json!({ "lan": "g1f3", "text": text, "anything": [1, 2, 3] });

        let expected = reply.clone();
        http.expect_post()
            .once()
            .with(eq(url.clone()), eq(body))
            .return_once(move |_, _| Box::pin(ready(Ok(reply))));

        assert_eq!(
            rt.block_on(Passthrough::new(http, url, depth, budget).evaluate(&pos)),
            Ok(Analysis::Verbatim(expected))
        );
    }

    #[proptest]
    fn unsuccessful_statuses_are_remote_errors(
        url: String,
        pos: Position,
        #[strategy(400u16..600)] code: u16,
    ) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        http.expect_post()
            .once()
            .return_once(move |_, _| Box::pin(ready(Err(HttpError::Status(code)))));

        let backend = Passthrough::new(http, url, 12, Duration::from_secs(1));

        assert_eq!(
            rt.block_on(backend.evaluate(&pos)),
            Err(BackendError::RemoteError(code))
        );
    }

    #[proptest]
    fn transport_failures_propagate(url: String, pos: Position) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        http.expect_post()
            .once()
            .return_once(|_, _| Box::pin(ready(Err(HttpError::Connectivity))));

        let backend = Passthrough::new(http, url, 12, Duration::from_secs(1));

        assert_eq!(
            rt.block_on(backend.evaluate(&pos)),
            Err(BackendError::Connectivity)
        );
    }
}
