pub mod server;
pub mod user;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    User {
        globals: GlobalArgs,
        action: user::UserAction,
    },
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Server(args) => server::execute(args).await,
            Self::User { globals, action } => user::execute(&globals, action).await,
        }
    }
}
