use anyhow::{Context, Error as Anyhow};
use clap::Parser;
use lib::backend::{Limits, Locator, UciOptions};
use tracing::instrument;

/// Discovers a usable local engine binary.
#[derive(Debug, Parser)]
#[clap(disable_help_flag = true, disable_version_flag = true)]
pub struct Locate {
    /// A path to probe before the well known locations.
    #[clap(short, long)]
    path: Option<String>,
}

impl Locate {
    #[instrument(level = "trace", skip(self), err)]
    pub async fn execute(self) -> Result<(), Anyhow> {
        let locator = Locator::new(self.path, Limits::default(), UciOptions::default());

        let path = locator
            .discover()
            .await
            .context("engine discovery failed")?;

        println!("{}", path);

        Ok(())
    }
}
