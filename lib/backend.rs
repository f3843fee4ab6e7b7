use crate::chess::{Move, Position};
use crate::eval::Score;
use crate::io::{Api, HttpError};
use async_trait::async_trait;
use derive_more::{Display, Error, From};
use proptest::strategy::Strategy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{str::FromStr, time::Duration};
use test_strategy::Arbitrary;

mod cloud;
mod limits;
mod locate;
mod passthrough;
mod uci;
mod v1;
mod v2;

pub use cloud::*;
pub use limits::*;
pub use locate::*;
pub use passthrough::*;
pub use uci::*;
pub use v1::*;
pub use v2::*;

/// The outcome of a successful backend evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    /// A normalized best move and its score in centipawns.
    Evaluation { best: Move, score: Score },

    /// An unnormalized third-party reply, forwarded as is.
    Verbatim(Value),
}

/// The reason why a backend failed to evaluate a position.
#[derive(Debug, Display, Error, From)]
pub enum BackendError {
    /// No usable local engine could be discovered.
    #[display(fmt = "Stockfish not available")]
    EngineUnavailable(LocateError),

    /// The local engine session failed and was torn down.
    #[display(fmt = "the local engine encountered an error")]
    EngineCrashed(UciError),

    /// The remote service did not answer in time.
    #[display(fmt = "API request timed out")]
    #[from(ignore)]
    Timeout,

    /// The remote service could not be reached.
    #[display(fmt = "API connection failed")]
    #[from(ignore)]
    Connectivity,

    /// The position is absent from the remote analysis index.
    #[display(fmt = "No analysis available")]
    #[from(ignore)]
    NoAnalysisAvailable,

    /// The remote service answered without a best move.
    #[display(fmt = "No valid moves found")]
    #[from(ignore)]
    NoMoveReturned,

    /// The returned move does not parse or is illegal in the position.
    #[display(fmt = "Invalid move format returned by API")]
    #[from(ignore)]
    MalformedMove(#[error(not(source))] String),

    /// The remote service rejected the request with the given detail.
    #[display(fmt = "{}", _0)]
    #[from(ignore)]
    RemoteRejected(#[error(not(source))] String),

    /// The remote service answered with an unsuccessful status code.
    #[display(fmt = "API returned status {}", _0)]
    #[from(ignore)]
    RemoteError(#[error(not(source))] u16),

    /// The remote service answered with an unintelligible body.
    #[display(fmt = "API returned an unintelligible response")]
    #[from(ignore)]
    MalformedResponse,
}

impl From<HttpError> for BackendError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Timeout => BackendError::Timeout,
            HttpError::Connectivity => BackendError::Connectivity,
            HttpError::Status(code) => BackendError::RemoteError(code),
            HttpError::Malformed => BackendError::MalformedResponse,
        }
    }
}

impl PartialEq for BackendError {
    fn eq(&self, other: &Self) -> bool {
        use BackendError::*;
        match (self, other) {
            (EngineUnavailable(_), EngineUnavailable(_)) => true,
            (EngineCrashed(a), EngineCrashed(b)) => a.kind() == b.kind(),
            (Timeout, Timeout) => true,
            (Connectivity, Connectivity) => true,
            (NoAnalysisAvailable, NoAnalysisAvailable) => true,
            (NoMoveReturned, NoMoveReturned) => true,
            (MalformedMove(a), MalformedMove(b)) => a == b,
            (RemoteRejected(a), RemoteRejected(b)) => a == b,
            (RemoteError(a), RemoteError(b)) => a == b,
            (MalformedResponse, MalformedResponse) => true,
            _ => false,
        }
    }
}

/// Trait for services that find the best move in a position.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Evaluate {
    async fn evaluate(&self, pos: &Position) -> Result<Analysis, BackendError>;
}

/// The reason why parsing backend configuration failed.
#[derive(Debug, Display, Eq, PartialEq, Error, From)]
#[display(fmt = "failed to parse backend configuration")]
pub struct ParseBackendConfigError(ron::de::SpannedError);

/// Runtime configuration for a [`Backend`].
#[derive(Debug, Display, Clone, PartialEq, Arbitrary, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "lowercase")]
pub enum BackendConfig {
    /// A locally discovered engine binary, with an optional path override.
    #[display(fmt = "{}", "ron::ser::to_string(self).unwrap()")]
    Uci(
        Option<String>,
        #[serde(default)] Limits,
        #[serde(default)] UciOptions,
    ),

    /// The cloud evaluation cache at the given endpoint.
    #[display(fmt = "{}", "ron::ser::to_string(self).unwrap()")]
    Cloud(String),

    /// The depth-limited analysis API at the given endpoint.
    #[display(fmt = "{}", "ron::ser::to_string(self).unwrap()")]
    V1(String, u8),

    /// The depth and time limited analysis API at the given endpoint.
    #[display(fmt = "{}", "ron::ser::to_string(self).unwrap()")]
    V2(
        String,
        u8,
        #[strategy((1u64..60000).prop_map(Duration::from_millis))]
        #[serde(with = "humantime_serde")]
        Duration,
    ),

    /// The unnormalized analysis API at the given endpoint.
    #[display(fmt = "{}", "ron::ser::to_string(self).unwrap()")]
    Passthrough(
        String,
        u8,
        #[strategy((1u64..60000).prop_map(Duration::from_millis))]
        #[serde(with = "humantime_serde")]
        Duration,
    ),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Uci(None, Limits::default(), UciOptions::default())
    }
}

impl FromStr for BackendConfig {
    type Err = ParseBackendConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ron::de::from_str(s)?)
    }
}

impl BackendConfig {
    /// Constructs the configured [`Backend`].
    pub fn build(self) -> Backend {
        match self {
            BackendConfig::Uci(path, limits, options) => {
                Locator::new(path, limits, options).into()
            }

            BackendConfig::Cloud(url) => Cloud::new(Api::new(Cloud::<Api>::TIMEOUT), url).into(),

            BackendConfig::V1(url, depth) => {
                DepthV1::new(Api::new(DepthV1::<Api>::TIMEOUT), url, depth).into()
            }

            BackendConfig::V2(url, depth, budget) => {
                DepthV2::new(Api::new(DepthV2::<Api>::TIMEOUT), url, depth, budget).into()
            }

            BackendConfig::Passthrough(url, depth, budget) => {
                Passthrough::new(Api::new(Passthrough::<Api>::TIMEOUT), url, depth, budget).into()
            }
        }
    }
}

/// A generic evaluation backend.
#[derive(From)]
pub enum Backend {
    Local(Locator),
    Cloud(Cloud<Api>),
    V1(DepthV1<Api>),
    V2(DepthV2<Api>),
    Passthrough(Passthrough<Api>),
}

#[async_trait]
impl Evaluate for Backend {
    async fn evaluate(&self, pos: &Position) -> Result<Analysis, BackendError> {
        match self {
            Backend::Local(b) => {
                let (best, score) = b.evaluate(pos).await?;
                Ok(Analysis::Evaluation { best, score })
            }

            Backend::Cloud(b) => b.evaluate(pos).await,
            Backend::V1(b) => b.evaluate(pos).await,
            Backend::V2(b) => b.evaluate(pos).await,
            Backend::Passthrough(b) => b.evaluate(pos).await,
        }
    }
}
