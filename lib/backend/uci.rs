use super::Limits;
use crate::chess::{Move, Position};
use crate::eval::Score;
use crate::io::Io;
use anyhow::{Context, Error as Anyhow};
use derive_more::{Display, Error, From};
use std::{collections::HashMap, future::Future, io, pin::Pin};
use tokio::{runtime, task::block_in_place};
use tracing::{error, instrument};
use vampirc_uci::{self as uci, UciFen, UciInfoAttribute, UciMessage, UciSearchControl};

/// Engine options forwarded verbatim during the handshake.
pub type UciOptions = HashMap<String, Option<String>>;

enum Lazy<T, E> {
    Initialized(T),
    Uninitialized(Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>),
}

impl<T, E> Lazy<T, E> {
    async fn get_or_init(&mut self) -> Result<&mut T, E> {
        match self {
            Lazy::Initialized(v) => Ok(v),
            Lazy::Uninitialized(f) => {
                *self = Lazy::Initialized(f.await?);
                match self {
                    Lazy::Initialized(v) => Ok(v),
                    Lazy::Uninitialized(_) => unreachable!(),
                }
            }
        }
    }
}

/// The reason why the engine failed to evaluate the position.
#[derive(Debug, Display, Error, From)]
#[display(fmt = "the uci engine encountered an error")]
pub struct UciError(#[from(forward)] io::Error);

impl UciError {
    /// The kind of the underlying io failure.
    pub fn kind(&self) -> io::ErrorKind {
        self.0.kind()
    }
}

/// A Universal Chess Interface client for a local engine process.
pub struct Uci<T: Io> {
    io: Lazy<T, UciError>,
    limits: Limits,
}

impl<T: Io + Send + 'static> Uci<T> {
    /// Constructs [`Uci`] with the given search [`Limits`] and [`UciOptions`].
    ///
    /// The handshake is deferred until the engine is first used.
    pub fn new(mut io: T, limits: Limits, options: UciOptions) -> Self {
        Uci {
            limits,
            io: Lazy::Uninitialized(Box::pin(async move {
                io.send(&UciMessage::Uci.to_string()).await?;
                io.flush().await?;

                while !matches!(uci::parse_one(io.recv().await?.trim()), UciMessage::UciOk) {}

                for (name, value) in options {
                    let set_option = UciMessage::SetOption { name, value };
                    io.send(&set_option.to_string()).await?;
                }

                io.send(&UciMessage::UciNewGame.to_string()).await?;
                io.send(&UciMessage::IsReady.to_string()).await?;
                io.flush().await?;

                while !matches!(uci::parse_one(io.recv().await?.trim()), UciMessage::ReadyOk) {}

                Ok(io)
            })),
        }
    }

    /// Forces the deferred handshake to completion.
    pub async fn ensure(&mut self) -> Result<(), UciError> {
        self.io.get_or_init().await?;
        Ok(())
    }

    async fn go(&mut self, pos: &Position) -> Result<(), UciError> {
        let position = UciMessage::Position {
            startpos: false,
            fen: Some(UciFen(pos.to_string())),
            moves: Vec::new(),
        };

        let go = match self.limits {
            Limits::None => UciMessage::go(),
            Limits::Depth(d) => UciMessage::Go {
                search_control: Some(UciSearchControl::depth(d)),
                time_control: None,
            },
            Limits::Time(t) => UciMessage::go_movetime(
                uci::Duration::from_std(t).unwrap_or_else(|_| uci::Duration::max_value()),
            ),
        };

        let io = self.io.get_or_init().await?;
        io.send(&position.to_string()).await?;
        io.send(&go.to_string()).await?;
        io.flush().await?;

        Ok(())
    }

    /// Searches for the best [`Move`] and its [`Score`].
    ///
    /// The score is reported from the engine's point of view, i.e. relative
    /// to the side to move, as the last `info` line before `bestmove`.
    #[instrument(level = "debug", skip(self, pos), err, fields(%pos))]
    pub async fn evaluate(&mut self, pos: &Position) -> Result<(Move, Score), UciError> {
        self.go(pos).await?;

        let io = self.io.get_or_init().await?;
        let mut score = Score::default();

        loop {
            match uci::parse_one(io.recv().await?.trim()) {
                UciMessage::Info(attrs) => {
                    for attr in attrs {
                        if let UciInfoAttribute::Score { mate: Some(m), .. } = attr {
                            score = if m > 0 { Score::upper() } else { Score::lower() };
                        }

                        if let UciInfoAttribute::Score { cp: Some(cp), .. } = attr {
                            score = Score::saturate(cp.into());
                        }
                    }
                }

                UciMessage::BestMove { best_move: m, .. } => {
                    let best = m
                        .to_string()
                        .parse()
                        .map_err(|_| io::Error::from(io::ErrorKind::InvalidData))?;

                    break Ok((best, score));
                }

                _ => {}
            }
        }
    }
}

impl<T: Io> Drop for Uci<T> {
    #[instrument(level = "trace", skip(self))]
    fn drop(&mut self) {
        // an engine that was never spoken to has nothing to shut down
        let io = match &mut self.io {
            Lazy::Initialized(io) => io,
            Lazy::Uninitialized(_) => return,
        };

        let result: Result<(), Anyhow> = block_in_place(|| {
            runtime::Handle::try_current()?.block_on(async {
                io.send(&UciMessage::Stop.to_string()).await?;
                io.send(&UciMessage::Quit.to_string()).await?;
                io.flush().await?;
                Ok(())
            })
        });

        if let Err(e) = result.context("failed to gracefully shutdown the uci engine") {
            error!("{:?}", e);
        }
    }
}
