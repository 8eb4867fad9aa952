//! Credential store backed by the `users` table.
//!
//! Uniqueness of usernames is enforced by the primary key, never by a
//! check-then-insert. Hashing runs on the blocking pool, outside any
//! connection or lock, and every query is bounded by the store timeout.

pub mod error;
pub mod hasher;

pub use self::error::{Error, Result};
pub use self::hasher::{generate_salt, salt_password, PasswordHasher, SALT_CHARSET, SALT_LENGTH};

use regex::Regex;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqlitePool,
};
use std::{future::Future, str::FromStr, time::Duration};
use tracing::{Instrument, Span};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Usernames double as the first path segment of their namespace.
#[must_use]
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]{0,63}$").is_ok_and(|re| re.is_match(username))
}

#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
    hasher: PasswordHasher,
    timeout: Duration,
}

impl UserStore {
    /// Open (creating if missing) the database at `dsn` and apply the schema.
    ///
    /// # Errors
    /// Returns `Error::Store` if the DSN is invalid or the database is unreachable.
    pub async fn connect(dsn: &str, hasher: PasswordHasher) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(dsn)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool, hasher);
        store.migrate().await?;

        Ok(store)
    }

    /// Wrap an existing pool. The schema is not applied; call [`Self::migrate`].
    #[must_use]
    pub fn from_pool(pool: SqlitePool, hasher: PasswordHasher) -> Self {
        Self {
            pool,
            hasher,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// # Errors
    /// Returns `Error::Store` if the schema cannot be applied.
    pub async fn migrate(&self) -> Result<()> {
        self.timed(
            sqlx::query(SCHEMA_SQL)
                .execute(&self.pool)
                .instrument(db_span("CREATE", SCHEMA_SQL)),
        )
        .await?;

        Ok(())
    }

    /// Create a user with a fresh salt.
    ///
    /// # Errors
    /// `Error::InvalidUsername`, `Error::UserExists`, or a store fault.
    pub async fn create(&self, username: &str, password: &str) -> Result<()> {
        if !valid_username(username) {
            return Err(Error::InvalidUsername(username.to_string()));
        }

        let salt = generate_salt(SALT_LENGTH);
        let combined = salt_password(password, &salt);
        let hasher = self.hasher;
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&combined)).await??;

        let query = r#"INSERT INTO users ("username", "salt", "password") VALUES (?, ?, ?)"#;
        let result = self
            .timed(
                sqlx::query(query)
                    .bind(username)
                    .bind(&salt)
                    .bind(&hash)
                    .execute(&self.pool)
                    .instrument(db_span("INSERT", query)),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(Error::Store(ref err)) if is_unique_violation(err) => Err(Error::UserExists),
            Err(e) => Err(e),
        }
    }

    /// # Errors
    /// `Error::UserNotFound` if no row was deleted, or a store fault.
    pub async fn delete(&self, username: &str) -> Result<()> {
        let query = r#"DELETE FROM users WHERE "username" = ?"#;
        let result = self
            .timed(
                sqlx::query(query)
                    .bind(username)
                    .execute(&self.pool)
                    .instrument(db_span("DELETE", query)),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound);
        }

        Ok(())
    }

    /// Check `password` against the stored record. Always performs a fresh lookup.
    ///
    /// # Errors
    /// `Error::UserNotFound`, `Error::PasswordMismatch`, or a store fault.
    pub async fn verify(&self, username: &str, password: &str) -> Result<()> {
        let query = r#"SELECT "salt", "password" FROM users WHERE "username" = ?"#;
        let row = self
            .timed(
                sqlx::query(query)
                    .bind(username)
                    .fetch_optional(&self.pool)
                    .instrument(db_span("SELECT", query)),
            )
            .await?;

        let Some(row) = row else {
            return Err(Error::UserNotFound);
        };

        let salt: String = row.try_get("salt")?;
        let hash: String = row.try_get("password")?;
        let combined = salt_password(password, &salt);

        let matched =
            tokio::task::spawn_blocking(move || PasswordHasher::verify(&hash, &combined)).await?;

        if matched {
            Ok(())
        } else {
            Err(Error::PasswordMismatch)
        }
    }

    /// # Errors
    /// Returns a store fault if the lookup fails.
    pub async fn exists(&self, username: &str) -> Result<bool> {
        let query = r#"SELECT EXISTS(SELECT 1 FROM users WHERE "username" = ?) AS "exists""#;
        let row = self
            .timed(
                sqlx::query(query)
                    .bind(username)
                    .fetch_one(&self.pool)
                    .instrument(db_span("SELECT", query)),
            )
            .await?;

        Ok(row.try_get::<i64, _>("exists")? != 0)
    }

    /// Usernames in lexical order.
    ///
    /// # Errors
    /// Returns a store fault if the query fails.
    pub async fn list(&self) -> Result<Vec<String>> {
        let query = r#"SELECT "username" FROM users ORDER BY "username""#;
        let rows = self
            .timed(
                sqlx::query(query)
                    .fetch_all(&self.pool)
                    .instrument(db_span("SELECT", query)),
            )
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("username").map_err(Error::from))
            .collect()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn timed<T, E, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        Error: From<E>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Timeout),
        }
    }
}

fn db_span(operation: &'static str, statement: &'static str) -> Span {
    tracing::info_span!(
        "db.query",
        db.system = "sqlite",
        db.operation = operation,
        db.statement = statement
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        // SQLITE_CONSTRAINT_PRIMARYKEY, SQLITE_CONSTRAINT_UNIQUE
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation()
                || db_err
                    .code()
                    .is_some_and(|code| matches!(code.as_ref(), "1555" | "2067"))
        }
        _ => false,
    }
}
