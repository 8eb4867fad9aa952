//! Map validated CLI matches to an [`Action`].

use crate::cli::actions::{server, user::UserAction, Action};
use crate::cli::commands::{store, user, ARG_PORT, ARG_REALM};
use crate::cli::globals::GlobalArgs;
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

fn globals(matches: &clap::ArgMatches) -> Result<GlobalArgs> {
    let dsn = matches
        .get_one::<String>(store::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let mut globals = GlobalArgs::new(dsn);

    if let Some(cost) = matches.get_one::<u32>(store::ARG_BCRYPT_COST) {
        globals.bcrypt_cost = *cost;
    }

    if let Some(seconds) = matches.get_one::<u64>(store::ARG_STORE_TIMEOUT) {
        globals.store_timeout = Duration::from_secs(*seconds);
    }

    if let Some(root) = matches.get_one::<String>(store::ARG_ROOT) {
        globals.root = PathBuf::from(root);
    }

    Ok(globals)
}

fn username(matches: &clap::ArgMatches) -> Result<String> {
    matches
        .get_one::<String>(user::ARG_USERNAME)
        .cloned()
        .context("missing required argument: <username>")
}

fn password(matches: &clap::ArgMatches) -> Result<SecretString> {
    matches
        .get_one::<String>(user::ARG_PASSWORD)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --password")
}

/// # Errors
/// Returns an error if required arguments are missing or the subcommand is unknown.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((user::CMD_USER, user_matches)) => {
            let (name, leaf) = user_matches
                .subcommand()
                .context("missing user subcommand")?;

            let action = match name {
                "add" => UserAction::Add {
                    username: username(leaf)?,
                    password: password(leaf)?,
                },
                "delete" => UserAction::Delete {
                    username: username(leaf)?,
                },
                "list" => UserAction::List,
                "check" => UserAction::Check {
                    username: username(leaf)?,
                    password: password(leaf)?,
                },
                other => return Err(anyhow!("unknown user subcommand: {other}")),
            };

            Ok(Action::User {
                globals: globals(leaf)?,
                action,
            })
        }
        Some((other, _)) => Err(anyhow!("unknown subcommand: {other}")),
        None => Ok(Action::Server(server::Args {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8000),
            realm: matches
                .get_one::<String>(ARG_REALM)
                .cloned()
                .unwrap_or_else(|| crate::microdav::gate::DEFAULT_REALM.to_string()),
            globals: globals(matches)?,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn env_cleared<F: FnOnce()>(f: F) {
        temp_env::with_vars(
            [
                ("MICRODAV_PORT", None::<&str>),
                ("MICRODAV_DSN", None),
                ("MICRODAV_ROOT", None),
                ("MICRODAV_REALM", None),
                ("MICRODAV_PASSWORD", None),
                ("MICRODAV_BCRYPT_COST", None),
                ("MICRODAV_STORE_TIMEOUT", None),
            ],
            f,
        );
    }

    #[test]
    fn no_subcommand_is_server() {
        env_cleared(|| {
            let matches = crate::cli::commands::new().get_matches_from(vec![
                "microdav",
                "--port",
                "9000",
                "--realm",
                "Protected",
                "--store-timeout",
                "2",
            ]);

            let Ok(Action::Server(args)) = handler(&matches) else {
                panic!("expected server action");
            };
            assert_eq!(args.port, 9000);
            assert_eq!(args.realm, "Protected");
            assert_eq!(args.globals.dsn, "sqlite://users.db");
            assert_eq!(args.globals.store_timeout, Duration::from_secs(2));
            assert_eq!(args.globals.root, PathBuf::from("./data"));
        });
    }

    #[test]
    fn user_add_carries_credentials() {
        env_cleared(|| {
            let matches = crate::cli::commands::new().get_matches_from(vec![
                "microdav",
                "--dsn",
                "sqlite://test.db",
                "user",
                "add",
                "alice",
                "--password",
                "s3cret",
                "--bcrypt-cost",
                "4",
            ]);

            let Ok(Action::User { globals, action }) = handler(&matches) else {
                panic!("expected user action");
            };
            assert_eq!(globals.dsn, "sqlite://test.db");
            assert_eq!(globals.bcrypt_cost, 4);

            let UserAction::Add { username, password } = action else {
                panic!("expected add");
            };
            assert_eq!(username, "alice");
            assert_eq!(password.expose_secret(), "s3cret");
        });
    }

    #[test]
    fn user_delete_and_list() {
        env_cleared(|| {
            let matches = crate::cli::commands::new()
                .get_matches_from(vec!["microdav", "user", "delete", "alice"]);
            assert!(matches!(
                handler(&matches),
                Ok(Action::User {
                    action: UserAction::Delete { .. },
                    ..
                })
            ));

            let matches =
                crate::cli::commands::new().get_matches_from(vec!["microdav", "user", "list"]);
            assert!(matches!(
                handler(&matches),
                Ok(Action::User {
                    action: UserAction::List,
                    ..
                })
            ));
        });
    }
}
