//! # microdav
//!
//! `microdav` serves a shared WebDAV file store where every user owns the
//! namespace named after them: `alice` may only reach `/dav/alice/...`.
//!
//! ## Credentials
//!
//! Users live in a `users` table (`username`, `salt`, `password`). Each record
//! carries an 8 character salt drawn from `[0-9A-Z]` and a bcrypt hash of
//! `password:salt`. Plaintext passwords are never stored.
//!
//! ## Access
//!
//! Every request under `/dav/` is re-authenticated with HTTP Basic credentials.
//! The offered username must equal the first path segment after the prefix and
//! the password must verify against the store. All failures produce the same
//! `401` challenge; the cause is only visible in the server logs.

pub mod cli;
pub mod microdav;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
