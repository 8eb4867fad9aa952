//! Per-request authentication and namespace authorization.
//!
//! Flow: read Basic credentials, read the requested identity from the first
//! path segment after the prefix, require them to match, then verify the
//! password against the store. `COPY` and `MOVE` name a second path in the
//! `Destination` header, which must lie in the same namespace. Every rejection
//! answers with the same challenge; only the log entry tells the causes apart.

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode, Uri,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};
use std::{fmt, sync::Arc};
use tracing::{debug, error, info, warn};

use super::rate_limit::{NoopRateLimiter, RateLimitDecision, RateLimiter};
use crate::users::{valid_username, Error, UserStore};

pub const DEFAULT_REALM: &str = "microdav";
pub const DEFAULT_PREFIX: &str = "/dav";

const DESTINATION: &str = "destination";

/// Log target for storage faults, kept apart from authentication noise.
pub const STORE_FAULT_TARGET: &str = "microdav::store";

pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Why a request was turned away. Never sent to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    MissingCredentials,
    MissingIdentity,
    IdentityMismatch,
    RateLimited,
    UserNotFound,
    PasswordMismatch,
    StoreFault,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Authorized,
    Rejected(Rejection),
}

/// Parse `Authorization: Basic <base64(username:password)>`.
#[must_use]
pub fn basic_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = Base64::decode_vec(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(Credentials {
        username: username.to_string(),
        password: SecretString::from(password.to_string()),
    })
}

/// The namespace owner named by `path`, i.e. `alice` in `/dav/alice/notes.txt`.
///
/// Paths with dot segments or encoded dots, slashes or backslashes have no
/// identity, so they cannot walk out of the namespace they name.
#[must_use]
pub fn requested_identity<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = path
        .strip_prefix(prefix.trim_end_matches('/'))?
        .strip_prefix('/')?;

    if rest.contains('\\') || rest.split('/').any(|segment| segment == "." || segment == "..") {
        return None;
    }

    let lower = rest.to_ascii_lowercase();
    if ["%2e", "%2f", "%5c"].iter().any(|encoded| lower.contains(encoded)) {
        return None;
    }

    let identity = rest.split('/').next()?;
    valid_username(identity).then_some(identity)
}

/// Namespace owner of a `Destination` header, given as an absolute URI or an
/// absolute path.
#[must_use]
pub fn destination_identity<'a>(destination: &'a Uri, prefix: &str) -> Option<&'a str> {
    requested_identity(destination.path(), prefix)
}

#[derive(Debug, thiserror::Error)]
#[error("realm {0:?} cannot be sent in a WWW-Authenticate header")]
pub struct InvalidRealm(pub String);

fn challenge(realm: &str) -> Result<HeaderValue, InvalidRealm> {
    let escaped = realm.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("Basic realm=\"{escaped}\""))
        .map_err(|_| InvalidRealm(realm.to_string()))
}

#[derive(Clone)]
pub struct AccessGate {
    store: UserStore,
    prefix: String,
    challenge: HeaderValue,
    limiter: Arc<dyn RateLimiter>,
}

impl AccessGate {
    /// # Errors
    /// `InvalidRealm` if `realm` holds characters a header value cannot carry.
    pub fn new(store: UserStore, realm: &str) -> Result<Self, InvalidRealm> {
        Ok(Self {
            store,
            prefix: DEFAULT_PREFIX.to_string(),
            challenge: challenge(realm)?,
            limiter: Arc::new(NoopRateLimiter),
        })
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Guard every route of `router` with this gate.
    #[must_use]
    pub fn protect<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self, guard))
    }

    /// Decide a single request. Terminal: one verification attempt, no retry.
    pub async fn check(&self, path: &str, headers: &HeaderMap) -> Decision {
        let Some(credentials) = basic_credentials(headers) else {
            debug!("No credentials offered");
            return Decision::Rejected(Rejection::MissingCredentials);
        };

        let Some(requested) = requested_identity(path, &self.prefix) else {
            debug!(path, "Request does not name a user namespace");
            return Decision::Rejected(Rejection::MissingIdentity);
        };

        if credentials.username != requested {
            warn!(
                offered = %credentials.username,
                requested,
                "'{}' tried to access '{}'s files",
                credentials.username,
                requested
            );
            return Decision::Rejected(Rejection::IdentityMismatch);
        }

        if let Some(destination) = headers.get(DESTINATION) {
            let target = destination
                .to_str()
                .ok()
                .and_then(|value| value.parse::<Uri>().ok());
            let owner = target
                .as_ref()
                .and_then(|uri| destination_identity(uri, &self.prefix));

            if owner != Some(requested) {
                warn!(
                    offered = %credentials.username,
                    destination = ?destination,
                    "'{}' tried to copy or move outside their namespace",
                    credentials.username
                );
                return Decision::Rejected(Rejection::IdentityMismatch);
            }
        }

        if self.limiter.check(&credentials.username) == RateLimitDecision::Limited {
            warn!(username = %credentials.username, "Rate limited");
            return Decision::Rejected(Rejection::RateLimited);
        }

        match self
            .store
            .verify(&credentials.username, credentials.password.expose_secret())
            .await
        {
            Ok(()) => Decision::Authorized,
            Err(Error::PasswordMismatch) => {
                info!(username = %credentials.username, "Wrong password");
                Decision::Rejected(Rejection::PasswordMismatch)
            }
            Err(Error::UserNotFound) => {
                debug!(username = %credentials.username, "Unknown user");
                Decision::Rejected(Rejection::UserNotFound)
            }
            Err(e) => {
                error!(
                    target: STORE_FAULT_TARGET,
                    username = %credentials.username,
                    "Credential store fault: {e}"
                );
                Decision::Rejected(Rejection::StoreFault)
            }
        }
    }

    /// The uniform `401` answer for every rejection.
    #[must_use]
    pub fn unauthorized(&self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(WWW_AUTHENTICATE, self.challenge.clone())],
            "Unauthorized",
        )
            .into_response()
    }
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("prefix", &self.prefix)
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

/// axum middleware: forward authorized requests untouched, challenge the rest.
pub async fn guard(State(gate): State<AccessGate>, request: Request, next: Next) -> Response {
    let decision = gate.check(request.uri().path(), request.headers()).await;

    match decision {
        Decision::Authorized => next.run(request).await,
        Decision::Rejected(_) => gate.unauthorized(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {}", Base64::encode_string(value.as_bytes())))
                .unwrap(),
        );
        headers
    }

    #[test]
    fn basic_credentials_parses_username_and_password() {
        let credentials = basic_credentials(&basic("alice:s3:cret")).unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password.expose_secret(), "s3:cret");
    }

    #[test]
    fn basic_credentials_rejects_garbage() {
        assert!(basic_credentials(&HeaderMap::new()).is_none());
        assert!(basic_credentials(&basic("no-colon")).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(basic_credentials(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(basic_credentials(&headers).is_none());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = basic_credentials(&basic("alice:s3cret")).unwrap();
        let debug = format!("{credentials:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn requested_identity_is_first_segment() {
        assert_eq!(requested_identity("/dav/alice/", "/dav"), Some("alice"));
        assert_eq!(requested_identity("/dav/alice", "/dav/"), Some("alice"));
        assert_eq!(
            requested_identity("/dav/alice/docs/notes.txt", "/dav"),
            Some("alice")
        );
    }

    #[test]
    fn requested_identity_rejects_escapes() {
        assert_eq!(requested_identity("/dav/", "/dav"), None);
        assert_eq!(requested_identity("/dav", "/dav"), None);
        assert_eq!(requested_identity("/other/alice/", "/dav"), None);
        assert_eq!(requested_identity("/davalice/", "/dav"), None);
        assert_eq!(requested_identity("/dav/alice/../bob/", "/dav"), None);
        assert_eq!(requested_identity("/dav/alice/%2E%2E/bob/", "/dav"), None);
        assert_eq!(requested_identity("/dav/alice%2Fbob/", "/dav"), None);
        assert_eq!(requested_identity("/dav/alice\\..\\bob", "/dav"), None);
        assert_eq!(requested_identity("/dav/../", "/dav"), None);
    }

    #[test]
    fn destination_identity_accepts_uri_and_path() {
        let uri: Uri = "http://localhost:8000/dav/bob/evil.txt".parse().unwrap();
        assert_eq!(destination_identity(&uri, "/dav"), Some("bob"));

        let path: Uri = "/dav/alice/copy.txt".parse().unwrap();
        assert_eq!(destination_identity(&path, "/dav"), Some("alice"));

        let escape: Uri = "http://localhost/dav/alice/%2e%2e/bob/x".parse().unwrap();
        assert_eq!(destination_identity(&escape, "/dav"), None);

        let outside: Uri = "http://localhost/elsewhere/x".parse().unwrap();
        assert_eq!(destination_identity(&outside, "/dav"), None);
    }

    #[test]
    fn challenge_quotes_realm() {
        assert_eq!(challenge("Protected").unwrap(), "Basic realm=\"Protected\"");
        assert_eq!(challenge("a\"b").unwrap(), "Basic realm=\"a\\\"b\"");
    }

    #[test]
    fn challenge_rejects_unsendable_realm() {
        let err = challenge("bad\nrealm").unwrap_err();
        assert_eq!(err.0, "bad\nrealm");
    }
}
