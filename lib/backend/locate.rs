use super::uci::{Uci, UciError, UciOptions};
use super::{BackendError, Limits};
use crate::chess::{Move, Position};
use crate::eval::Score;
use crate::io::Process;
use derive_more::{Display, Error};
use std::{io, time::Duration};
use tokio::{sync::Mutex, time::timeout};
use tracing::{debug, info, instrument, warn};

/// The reason why no usable engine could be discovered.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
#[display(fmt = "no usable engine was found in any of the well known locations")]
pub struct LocateError;

/// Discovers a local engine binary and owns the live session.
///
/// The handle is created on the first successful probe, memoized for the
/// lifetime of the process, and torn down whenever a request against it
/// fails, so that the next request probes again. A transient absence at
/// boot therefore does not permanently disable local evaluation.
pub struct Locator {
    path: Option<String>,
    limits: Limits,
    options: UciOptions,
    handle: Mutex<Option<Uci<Process>>>,
}

impl Locator {
    #[cfg(test)]
    const PROBE: Duration = Duration::ZERO;

    #[cfg(not(test))]
    const PROBE: Duration = Duration::from_millis(1000);

    const WELL_KNOWN: [&'static str; 5] = [
        "/opt/stockfish/stockfish",
        "/usr/games/stockfish",
        "/usr/bin/stockfish",
        "/usr/local/bin/stockfish",
        "stockfish",
    ];

    /// Constructs [`Locator`] with an optional path override.
    pub fn new(path: Option<String>, limits: Limits, options: UciOptions) -> Self {
        Locator {
            path,
            limits,
            options,
            handle: Mutex::new(None),
        }
    }

    fn candidates(&self) -> Vec<String> {
        Self::candidates_from(self.path.as_deref(), std::env::var("STOCKFISH_PATH").ok())
    }

    fn candidates_from(configured: Option<&str>, env: Option<String>) -> Vec<String> {
        configured
            .map(str::to_string)
            .into_iter()
            .chain(env)
            .chain(Self::WELL_KNOWN.iter().map(|p| p.to_string()))
            .collect()
    }

    async fn probe(&self, path: &str) -> Result<Uci<Process>, UciError> {
        let io = Process::spawn(path)?;
        let mut uci = Uci::new(io, self.limits, self.options.clone());

        match timeout(Self::PROBE, uci.ensure()).await {
            Ok(handshake) => handshake?,
            Err(_) => return Err(io::ErrorKind::TimedOut.into()),
        }

        Ok(uci)
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn locate(&self) -> Result<(String, Uci<Process>), LocateError> {
        for path in self.candidates() {
            match self.probe(&path).await {
                Err(e) => debug!(candidate = %path, "probe failed, {}", e),
                Ok(uci) => {
                    info!(engine = %path, "engine located");
                    return Ok((path, uci));
                }
            }
        }

        Err(LocateError)
    }

    /// Discovers a usable engine and memoizes the resulting handle.
    pub async fn discover(&self) -> Result<String, LocateError> {
        let mut handle = self.handle.lock().await;
        let (path, uci) = self.locate().await?;
        *handle = Some(uci);
        Ok(path)
    }

    /// Tears down the memoized handle, forcing a re-probe on the next use.
    pub async fn invalidate(&self) {
        self.handle.lock().await.take();
    }

    /// Evaluates a position on the discovered engine.
    ///
    /// The engine drives a single conversation at a time; concurrent
    /// requests serialize on the handle.
    #[instrument(level = "debug", skip(self, pos), err, fields(%pos))]
    pub async fn evaluate(&self, pos: &Position) -> Result<(Move, Score), BackendError> {
        let mut handle = self.handle.lock().await;

        // the session stays out of the slot while the search is in flight;
        // a request dropped mid-search takes the session down with it
        let mut uci = match handle.take() {
            Some(uci) => uci,
            None => self.locate().await?.1,
        };

        match uci.evaluate(pos).await {
            Ok(best) => {
                *handle = Some(uci);
                Ok(best)
            }

            Err(e) => {
                warn!("tearing down engine handle, {}", e);
                Err(e.into())
            }
        }
    }
}
