use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error("password doesn't match")]
    PasswordMismatch,
    #[error("invalid username: {0:?}")]
    InvalidUsername(String),
    #[error("invalid bcrypt cost: {0}")]
    InvalidCost(u32),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("store operation timed out")]
    Timeout,
    #[error("hash task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Operational faults, as opposed to expected authentication outcomes.
    #[must_use]
    pub const fn is_store_fault(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Hash(_) | Self::Timeout | Self::Task(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
