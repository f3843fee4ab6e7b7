use super::{Analysis, BackendError, Evaluate};
use crate::chess::Position;
use crate::eval::Score;
use crate::io::{Http, HttpError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

/// A client for the cloud evaluation cache.
///
/// Positions are looked up by FEN; only previously analyzed positions are
/// ever present, so a miss is reported as the lack of analysis rather than
/// as a failure of the service.
pub struct Cloud<T: Http> {
    http: T,
    url: String,
}

impl<T: Http> Cloud<T> {
    /// How long to wait for the cache before giving up.
    pub const TIMEOUT: Duration = Duration::from_secs(3);

    pub fn new(http: T, url: String) -> Self {
        Cloud { http, url }
    }
}

#[async_trait]
impl<T: Http + Send + Sync> Evaluate for Cloud<T> {
    #[instrument(level = "debug", skip(self, pos), err, fields(%pos))]
    async fn evaluate(&self, pos: &Position) -> Result<Analysis, BackendError> {
        let query = vec![("fen".to_string(), pos.to_string())];

        let reply = match self.http.get(self.url.clone(), query).await {
            Err(HttpError::Status(404)) => return Err(BackendError::NoAnalysisAvailable),
            reply => reply?,
        };

        let pvs = reply["pvs"]
            .as_array()
            .ok_or(BackendError::MalformedResponse)?;

        let pv = match pvs.first() {
            None => return Err(BackendError::NoAnalysisAvailable),
            Some(pv) => pv,
        };

        let moves = pv["moves"].as_str().ok_or(BackendError::MalformedResponse)?;
        let best = match moves.split_whitespace().next() {
            None => return Err(BackendError::MalformedResponse),
            Some(m) => m
                .parse()
                .map_err(|_| BackendError::MalformedMove(m.to_string()))?,
        };

        let score = match (pv["cp"].as_i64(), pv["mate"].as_i64()) {
            (Some(cp), _) => Score::saturate(cp),
            (None, Some(m)) if m > 0 => Score::upper(),
            (None, Some(_)) => Score::lower(),
            (None, None) => return Err(BackendError::MalformedResponse),
        };

        Ok(Analysis::Evaluation { best, score })
    }
}
