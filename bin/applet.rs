use anyhow::Error as Anyhow;
use clap::Subcommand;
use derive_more::From;

mod locate;
mod resolve;

#[derive(From, Subcommand)]
pub enum Applet {
    Resolve(resolve::Resolve),
    Locate(locate::Locate),
}

impl Applet {
    pub async fn execute(self) -> Result<(), Anyhow> {
        match self {
            Applet::Resolve(a) => Ok(a.execute().await?),
            Applet::Locate(a) => Ok(a.execute().await?),
        }
    }
}
