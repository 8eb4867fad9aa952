use crate::users::{PasswordHasher, UserStore};
use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};

/// Settings shared by every action.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub dsn: String,
    pub bcrypt_cost: u32,
    pub store_timeout: Duration,
    pub root: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(dsn: String) -> Self {
        Self {
            dsn,
            bcrypt_cost: 10,
            store_timeout: crate::users::DEFAULT_TIMEOUT,
            root: PathBuf::from("./data"),
        }
    }

    /// Open the credential store described by these settings.
    ///
    /// # Errors
    /// Returns an error if the cost is invalid or the database cannot be opened.
    pub async fn store(&self) -> Result<UserStore> {
        let hasher = PasswordHasher::new(self.bcrypt_cost)?;
        let store = UserStore::connect(&self.dsn, hasher)
            .await
            .with_context(|| format!("Failed to open credential store {}", self.dsn))?;

        Ok(store.with_timeout(self.store_timeout))
    }
}
