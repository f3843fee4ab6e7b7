use anyhow::Error as Anyhow;
use clap::Parser;
use lib::backend::BackendConfig;
use lib::resolver::{Request, Resolver};
use serde_json::json;
use tracing::{instrument, warn};

/// Resolves the best move in a position.
///
/// The reply is printed to the standard output as a JSON document, either
/// `{"move", "score", "status"?}` or `{"error"}`.
#[derive(Debug, Parser)]
#[clap(disable_help_flag = true, disable_version_flag = true)]
pub struct Resolve {
    /// The backend configuration.
    #[clap(short, long, default_value_t)]
    backend: BackendConfig,

    /// The position to resolve in FEN notation.
    fen: String,
}

impl Resolve {
    #[instrument(level = "trace", skip(self), err)]
    pub async fn execute(self) -> Result<(), Anyhow> {
        let resolver = Resolver::new(self.backend.build());

        let request = Request {
            fen: Some(self.fen),
        };

        match resolver.resolve(&request).await {
            Ok(reply) => println!("{}", serde_json::to_string(&reply)?),

            Err(e) => {
                warn!(status = e.status(), "{}", e);
                println!("{}", serde_json::to_string(&json!({ "error": e.to_string() }))?);
            }
        }

        Ok(())
    }
}
