use super::{Analysis, BackendError, Evaluate};
use crate::chess::Position;
use crate::eval::Score;
use crate::io::{Http, HttpError};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::instrument;

/// A client for the depth and time limited analysis API.
///
/// Replies come wrapped in an envelope with an explicit success flag and a
/// nested payload. When the flag is false the payload carries the remote
/// error detail, which is surfaced to the caller verbatim.
pub struct DepthV2<T: Http> {
    http: T,
    url: String,
    depth: u8,
    budget: Duration,
}

impl<T: Http> DepthV2<T> {
    pub const TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(http: T, url: String, depth: u8, budget: Duration) -> Self {
        DepthV2 {
            http,
            url,
            depth,
            budget,
        }
    }
}

#[async_trait]
impl<T: Http + Send + Sync> Evaluate for DepthV2<T> {
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

        let data = &reply["data"];

        match reply["success"].as_bool() {
            Some(true) => {}
            Some(false) => {
                let detail = data["error"].as_str().unwrap_or("request rejected");
                return Err(BackendError::RemoteRejected(detail.to_string()));
            }
            None => return Err(BackendError::MalformedResponse),
        }

        let best = match data["bestmove"].as_str() {
            None | Some("") => return Err(BackendError::NoMoveReturned),
            Some(m) => m
                .parse()
                .map_err(|_| BackendError::MalformedMove(m.to_string()))?,
        };

        let cp = data["evaluation"]
            .as_i64()
            .ok_or(BackendError::MalformedResponse)?;

        Ok(Analysis::Evaluation {
            best,
            score: Score::saturate(cp),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Move;
    use crate::io::MockHttp;
    use mockall::predicate::eq;
    use std::future::ready;
    use test_strategy::proptest;
    use tokio::runtime;

    #[proptest]
    fn evaluate_posts_the_position_with_both_limits(
        url: String,
        depth: u8,
        #[strategy(1u64..60000)] ms: u64,
        pos: Position,
        m: Move,
        #[strategy(-10000i64..=10000)] cp: i64,
    ) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        let budget = Duration::from_millis(ms);
        let body = json!({
            "fen": pos.to_string(),
            "depth": depth,
            "maxThinkingTime": ms,
        });

        let reply = json!({
            "success": true,
            "data": { "bestmove": m.to_string(), "evaluation": cp },
        });

        http.expect_post()
            .once()
            .with(eq(url.clone()), eq(body))
            .return_once(move |_, _| Box::pin(ready(Ok(reply))));

        assert_eq!(
            rt.block_on(DepthV2::new(http, url, depth, budget).evaluate(&pos)),
            Ok(Analysis::Evaluation {
                best: m,
                score: Score::saturate(cp)
            })
        );
    }

    #[proptest]
    fn rejections_surface_the_remote_detail_verbatim(
        url: String,
        depth: u8,
        pos: Position,
        detail: String,
    ) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        let reply = json!({ "success": false, "data": { "error": detail.clone() } });
        http.expect_post()
            .once()
            .return_once(move |_, _| Box::pin(ready(Ok(reply))));

        let backend = DepthV2::new(http, url, depth, Duration::from_secs(1));

        assert_eq!(
            rt.block_on(backend.evaluate(&pos)),
            Err(BackendError::RemoteRejected(detail))
        );
    }

    #[proptest]
    fn envelopes_without_a_success_flag_are_malformed(
        url: String,
        depth: u8,
        pos: Position,
        m: Move,
    ) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        let reply = json!({ "data": { "bestmove": m.to_string(), "evaluation": 35 } });
        http.expect_post()
            .once()
            .return_once(move |_, _| Box::pin(ready(Ok(reply))));

        let backend = DepthV2::new(http, url, depth, Duration::from_secs(1));

        assert_eq!(
            rt.block_on(backend.evaluate(&pos)),
            Err(BackendError::MalformedResponse)
        );
    }

    #[proptest]
    fn missing_best_move_is_reported(url: String, depth: u8, pos: Position) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        let reply = json!({ "success": true, "data": { "evaluation": 35 } });
        http.expect_post()
            .once()
            .return_once(move |_, _| Box::pin(ready(Ok(reply))));

        let backend = DepthV2::new(http, url, depth, Duration::from_secs(1));

        assert_eq!(
            rt.block_on(backend.evaluate(&pos)),
            Err(BackendError::NoMoveReturned)
        );
    }

    #[proptest]
    fn unsuccessful_statuses_are_remote_errors(
        url: String,
        depth: u8,
        pos: Position,
        #[strategy(400u16..600)] code: u16,
    ) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        http.expect_post()
            .once()
            .return_once(move |_, _| Box::pin(ready(Err(HttpError::Status(code)))));

        let backend = DepthV2::new(http, url, depth, Duration::from_secs(1));

        assert_eq!(
            rt.block_on(backend.evaluate(&pos)),
            Err(BackendError::RemoteError(code))
        );
    }

    #[proptest]
    fn unintelligible_moves_are_rejected(
        url: String,
        depth: u8,
        pos: Position,
        #[strategy("[!-+]{4}")] junk: String,
    ) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        let reply = json!({ "success": true, "data": { "bestmove": junk.clone(), "evaluation": 0 } });
        http.expect_post()
            .once()
            .return_once(move |_, _| Box::pin(ready(Ok(reply))));

        let backend = DepthV2::new(http, url, depth, Duration::from_secs(1));

        assert_eq!(
            rt.block_on(backend.evaluate(&pos)),
            Err(BackendError::MalformedMove(junk))
        );
    }
}
