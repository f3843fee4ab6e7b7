use super::Io;
use anyhow::{bail, Context, Error as Anyhow};
use async_trait::async_trait;
use std::{io, time::Duration};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::{runtime, task::block_in_place, time::timeout};
use tracing::{error, field::display, instrument, Span};

#[cfg(test)]
#[async_trait]
#[mockall::automock]
trait Child {
    async fn wait(&mut self) -> io::Result<String>;
    async fn kill(&mut self) -> io::Result<()>;
}

#[cfg(test)]
type Stdin = tokio::io::DuplexStream;
#[cfg(test)]
type Stdout = tokio::io::DuplexStream;

#[cfg(not(test))]
type Stdin = tokio::process::ChildStdin;
#[cfg(not(test))]
type Stdout = tokio::process::ChildStdout;

/// An [`Io`] interface over the standard streams of a child process.
#[derive(Debug)]
pub struct Process {
    writer: Stdin,
    reader: Lines<BufReader<Stdout>>,

    #[cfg(test)]
    child: MockChild,

    #[cfg(not(test))]
    child: tokio::process::Child,
}

impl Process {
    #[cfg(test)]
    const TIMEOUT: Duration = Duration::ZERO;

    #[cfg(not(test))]
    const TIMEOUT: Duration = Duration::from_millis(1000);

    /// Spawns a child process.
    #[instrument(level = "trace", err)]
    pub fn spawn(path: &str) -> io::Result<Self> {
        #[cfg(test)]
        {
            let (writer, reader) = tokio::io::duplex(1);

            let mut child = MockChild::new();
            child
                .expect_wait()
                .returning(|| Box::pin(std::future::ready(Ok(String::new()))));
            child
                .expect_kill()
                .returning(|| Box::pin(std::future::ready(Ok(()))));

            Ok(Process {
                writer,
                reader: BufReader::new(reader).lines(),
                child,
            })
        }

        #[cfg(not(test))]
        {
            let mut child = tokio::process::Command::new(path)
                .stdin(std::process::Stdio::piped())
                .stdout(std::process::Stdio::piped())
                .kill_on_drop(true)
                .spawn()?;

            let (writer, reader) = Option::zip(child.stdin.take(), child.stdout.take())
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::Other,
                        Anyhow::msg("failed to open the child process' stdio"),
                    )
                })?;

            Ok(Process {
                writer,
                reader: BufReader::new(reader).lines(),
                child,
            })
        }
    }
}

/// Flushes the outbound buffer and waits for the child process to exit.
impl Drop for Process {
    #[instrument(level = "trace", skip(self), fields(status))]
    fn drop(&mut self) {
        let result: Result<_, Anyhow> = block_in_place(|| {
            runtime::Handle::try_current()?.block_on(async {
                self.flush().await?;
                match timeout(Self::TIMEOUT, self.child.wait()).await {
                    Ok(status) => Ok(status?),
                    Err(_) => {
                        self.child.kill().await?;
                        bail!(
                            "timed out after {}s waiting for process to exit",
                            Self::TIMEOUT.as_secs()
                        );
                    }
                }
            })
        });

        match result.context("failed to gracefully terminate the child process") {
            Err(e) => error!("{:?}", e),
            Ok(s) => {
                Span::current().record("status", display(s));
            }
        }
    }
}

#[async_trait]
impl Io for Process {
    #[instrument(level = "trace", skip(self), ret, err)]
    async fn recv(&mut self) -> io::Result<String> {
        use io::ErrorKind::UnexpectedEof;
        self.reader.next_line().await?.ok_or_else(|| UnexpectedEof.into())
    }

    #[instrument(level = "trace", skip(self), err)]
    async fn send(&mut self, msg: &str) -> io::Result<()> {
        self.writer.write_all(msg.as_bytes()).await?;
        self.writer.write_u8(b'\n').await?;
        Ok(())
    }

    #[instrument(level = "trace", skip(self), err)]
    async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}
