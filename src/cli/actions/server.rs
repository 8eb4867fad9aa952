use crate::{
    cli::globals::GlobalArgs,
    microdav::{self, ServerConfig},
};
use anyhow::Result;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub realm: String,
    pub globals: GlobalArgs,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the credential store cannot be opened or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let store = args.globals.store().await?;

    let config = ServerConfig {
        port: args.port,
        root: args.globals.root,
        realm: args.realm,
    };

    microdav::new(config, store).await
}
