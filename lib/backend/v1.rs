use super::{Analysis, BackendError, Evaluate};
use crate::chess::Position;
use crate::eval::Score;
use crate::io::{Http, HttpError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

/// A client for the depth-limited analysis API.
///
/// The remote service reports scores in whole pawns and wraps the best
/// move in an engine-style `bestmove <move> [ponder <move>]` line.
pub struct DepthV1<T: Http> {
    http: T,
    url: String,
    depth: u8,
}

impl<T: Http> DepthV1<T> {
    pub const TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(http: T, url: String, depth: u8) -> Self {
        DepthV1 { http, url, depth }
    }
}

#[async_trait]
impl<T: Http + Send + Sync> Evaluate for DepthV1<T> {
    #[instrument(level = "debug", skip(self, pos), err, fields(%pos))]
    async fn evaluate(&self, pos: &Position) -> Result<Analysis, BackendError> {
        let query = vec![
            ("fen".to_string(), pos.to_string()),
            ("depth".to_string(), self.depth.to_string()),
        ];

        let reply = match self.http.get(self.url.clone(), query).await {
            Err(HttpError::Status(code)) => return Err(BackendError::RemoteError(code)),
            reply => reply?,
        };

        let line = match reply["bestmove"].as_str() {
            None | Some("") => return Err(BackendError::NoMoveReturned),
            Some(line) => line,
        };

        // the move follows the `bestmove` keyword, or stands alone
        let token = line
            .split_whitespace()
            .find(|t| *t != "bestmove")
            .ok_or(BackendError::NoMoveReturned)?;

        let best = token
            .parse()
            .map_err(|_| BackendError::MalformedMove(token.to_string()))?;

        let pawns = reply["evaluation"]
            .as_f64()
            .ok_or(BackendError::MalformedResponse)?;

        Ok(Analysis::Evaluation {
            best,
            score: Score::saturate((pawns * 100.).round() as i64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Move;
    use crate::io::MockHttp;
    use mockall::predicate::eq;
    use serde_json::json;
    use std::future::ready;
    use test_strategy::proptest;
    use tokio::runtime;

    #[proptest]
    fn evaluate_requests_analysis_at_the_configured_depth(
        url: String,
        depth: u8,
        pos: Position,
        m: Move,
        #[strategy(-100f64..=100.)] pawns: f64,
    ) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        let reply = json!({ "bestmove": format!("bestmove {} ponder e7e5", m), "evaluation": pawns });
        http.expect_get()
            .once()
            .with(
                eq(url.clone()),
                eq(vec![
                    ("fen".to_string(), pos.to_string()),
                    ("depth".to_string(), depth.to_string()),
                ]),
            )
            .return_once(move |_, _| Box::pin(ready(Ok(reply))));

        assert_eq!(
            rt.block_on(DepthV1::new(http, url, depth).evaluate(&pos)),
            Ok(Analysis::Evaluation {
                best: m,
                score: Score::saturate((pawns * 100.).round() as i64)
            })
        );
    }

    #[proptest]
    fn bare_move_strings_are_also_accepted(url: String, depth: u8, pos: Position, m: Move) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        let reply = json!({ "bestmove": m.to_string(), "evaluation": 0.0 });
        http.expect_get()
            .once()
            .return_once(move |_, _| Box::pin(ready(Ok(reply))));

        assert_eq!(
            rt.block_on(DepthV1::new(http, url, depth).evaluate(&pos)),
            Ok(Analysis::Evaluation {
                best: m,
                score: Score::default()
            })
        );
    }

    #[proptest]
    fn missing_best_move_is_reported(url: String, depth: u8, pos: Position) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut http = MockHttp::new();

        http.expect_get()
            .once()
            .return_once(|_, _| Box::pin(ready(Ok(json!({ "evaluation": 0.35 })))));

        assert_eq!(
            rt.block_on(DepthV1::new(http, url, depth).evaluate(&pos)),
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

        http.expect_get()
            .once()
            .return_once(move |_, _| Box::pin(ready(Err(HttpError::Status(code)))));

        assert_eq!(
            rt.block_on(DepthV1::new(http, url, depth).evaluate(&pos)),
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

        let reply = json!({ "bestmove": format!("bestmove {}", junk), "evaluation": 0.0 });
        http.expect_get()
            .once()
            .return_once(move |_, _| Box::pin(ready(Ok(reply))));

        assert_eq!(
            rt.block_on(DepthV1::new(http, url, depth).evaluate(&pos)),
            Err(BackendError::MalformedMove(junk))
        );
    }
}
