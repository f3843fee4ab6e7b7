use crate::backend::{Analysis, Backend, BackendError, Evaluate};
use crate::chess::{Color, Outcome, ParsePositionError, Position};
use crate::eval::Score;
use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// A request to resolve the best move in a position.
#[derive(Debug, Default, Clone, Eq, PartialEq, Deserialize)]
pub struct Request {
    pub fen: Option<String>,
}

/// The terminal state of a resolved position.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Checkmate,
    Stalemate,
    Draw,
}

/// The reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// A normalized resolution.
    ///
    /// The move is empty if and only if the position is terminal.
    Resolution {
        #[serde(rename = "move")]
        best: String,
        score: Score,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<Status>,
    },

    /// An unnormalized third-party reply, forwarded as is.
    Verbatim(Value),
}

impl Reply {
    fn terminal(outcome: Outcome) -> Self {
        let (score, status) = match outcome {
            Outcome::Checkmate(Color::White) => (Score::upper(), Status::Checkmate),
            Outcome::Checkmate(Color::Black) => (Score::lower(), Status::Checkmate),
            Outcome::Stalemate => (Score::default(), Status::Stalemate),
            Outcome::DrawByInsufficientMaterial => (Score::default(), Status::Draw),
        };

        Reply::Resolution {
            best: String::new(),
            score,
            status: Some(status),
        }
    }
}

/// The reason why resolving a [`Request`] failed.
#[derive(Debug, Display, PartialEq, Error, From)]
pub enum ResolverError {
    #[display(fmt = "FEN position required")]
    MissingFen,
    InvalidPosition(ParsePositionError),
    Backend(BackendError),
}

impl ResolverError {
    /// The HTTP-equivalent status code of this failure.
    pub fn status(&self) -> u16 {
        match self {
            ResolverError::MissingFen => 400,
            ResolverError::InvalidPosition(_) => 400,

            ResolverError::Backend(e) => match e {
                BackendError::NoAnalysisAvailable => 400,
                BackendError::NoMoveReturned => 400,
                BackendError::MalformedMove(_) => 400,
                BackendError::MalformedResponse => 500,
                _ => 503,
            },
        }
    }
}

/// The orchestrating entry point for move resolution.
///
/// Terminal positions are detected up front and never reach the backend.
pub struct Resolver<E: Evaluate = Backend> {
    backend: E,
}

impl<E: Evaluate + Sync> Resolver<E> {
    pub fn new(backend: E) -> Self {
        Resolver { backend }
    }

    #[instrument(level = "debug", skip(self, request), err)]
    pub async fn resolve(&self, request: &Request) -> Result<Reply, ResolverError> {
        let fen = match request.fen.as_deref().map(str::trim) {
            None | Some("") => return Err(ResolverError::MissingFen),
            Some(fen) => fen,
        };

        let pos: Position = fen.parse()?;

        if let Some(outcome) = pos.outcome() {
            debug!(%outcome, "terminal position");
            return Ok(Reply::terminal(outcome));
        }

        let analysis = match self.backend.evaluate(&pos).await {
            Err(e @ (BackendError::EngineUnavailable(_) | BackendError::EngineCrashed(_))) => {
                // one fresh discovery before giving up
                debug!("retrying, {}", e);
                self.backend.evaluate(&pos).await?
            }

            analysis => analysis?,
        };

        match analysis {
            Analysis::Verbatim(reply) => Ok(Reply::Verbatim(reply)),

            Analysis::Evaluation { best, score } => {
                // never trust backend legality claims
                if !pos.is_legal(&best) {
                    return Err(BackendError::MalformedMove(best.to_string()).into());
                }

                Ok(Reply::Resolution {
                    best: best.to_string(),
                    score,
                    status: None,
                })
            }
        }
    }
}
