use crate::{
    cli::globals::GlobalArgs,
    users::{Error, UserStore},
};
use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

pub enum UserAction {
    Add {
        username: String,
        password: SecretString,
    },
    Delete {
        username: String,
    },
    List,
    Check {
        username: String,
        password: SecretString,
    },
}

impl fmt::Debug for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add { username, .. } => f
                .debug_struct("Add")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Delete { username } => f.debug_struct("Delete").field("username", username).finish(),
            Self::List => f.write_str("List"),
            Self::Check { username, .. } => f
                .debug_struct("Check")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Execute a credential management action.
/// # Errors
/// Returns an error if the store rejects the operation.
pub async fn execute(globals: &GlobalArgs, action: UserAction) -> Result<()> {
    debug!("User action: {:?}", action);

    let store = globals.store().await?;
    let result = run(&store, &globals.root, action).await;
    store.close().await;

    result
}

async fn run(store: &UserStore, root: &Path, action: UserAction) -> Result<()> {
    match action {
        UserAction::Add { username, password } => {
            let leftover = leftover_namespace(store, root, &username).await?;

            match store.create(&username, password.expose_secret()).await {
                Ok(()) => {}
                Err(Error::UserExists) => bail!("User '{username}' already exists"),
                Err(e) => return Err(e).with_context(|| format!("Failed to create '{username}'")),
            }

            if let Some(namespace) = &leftover {
                warn!(
                    "'{}' takes over files left in {} by a deleted user",
                    username,
                    namespace.display()
                );
                eprintln!(
                    "warning: {} already exists and now belongs to {username}",
                    namespace.display()
                );
            }

            let namespace = root.join(&username);
            tokio::fs::create_dir_all(&namespace)
                .await
                .with_context(|| format!("Failed to create {}", namespace.display()))?;

            info!("Created user '{}' ({})", username, namespace.display());
            println!("created {username}");
        }
        UserAction::Delete { username } => {
            match store.delete(&username).await {
                Ok(()) => {}
                Err(Error::UserNotFound) => bail!("User '{username}' not found"),
                Err(e) => return Err(e).with_context(|| format!("Failed to delete '{username}'")),
            }

            info!("Deleted user '{}', files left in place", username);
            println!("deleted {username}");
        }
        UserAction::List => {
            for username in store.list().await.context("Failed to list users")? {
                println!("{username}");
            }
        }
        UserAction::Check { username, password } => {
            match store.verify(&username, password.expose_secret()).await {
                Ok(()) => println!("ok"),
                Err(Error::UserNotFound) => bail!("User '{username}' not found"),
                Err(Error::PasswordMismatch) => bail!("Password doesn't match"),
                Err(e) => return Err(e).context("Failed to verify credentials"),
            }
        }
    }

    Ok(())
}

/// The namespace directory of `username` if it exists without an account.
async fn leftover_namespace(
    store: &UserStore,
    root: &Path,
    username: &str,
) -> Result<Option<PathBuf>> {
    let namespace = root.join(username);
    if !tokio::fs::try_exists(&namespace).await.unwrap_or(false) {
        return Ok(None);
    }

    let known = store
        .exists(username)
        .await
        .with_context(|| format!("Failed to look up '{username}'"))?;

    Ok((!known).then_some(namespace))
}
