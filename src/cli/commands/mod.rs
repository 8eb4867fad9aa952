pub mod logging;
pub mod store;
pub mod user;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_REALM: &str = "realm";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("microdav")
        .about("Per-user WebDAV file store")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8000")
                .env("MICRODAV_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_REALM)
                .long("realm")
                .help("Realm presented in the Basic authentication challenge")
                .default_value("microdav")
                .env("MICRODAV_REALM"),
        )
        .subcommand(user::subcommand());

    let command = store::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "microdav");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Per-user WebDAV file store".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("MICRODAV_PORT", None::<&str>),
                ("MICRODAV_DSN", None),
                ("MICRODAV_ROOT", None),
                ("MICRODAV_REALM", None),
                ("MICRODAV_BCRYPT_COST", None),
                ("MICRODAV_STORE_TIMEOUT", None),
                ("MICRODAV_LOG_LEVEL", None),
            ],
            || {
                let matches = new().get_matches_from(vec!["microdav"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8000));
                assert_eq!(
                    matches.get_one::<String>(store::ARG_DSN).cloned(),
                    Some("sqlite://users.db".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(ARG_REALM).cloned(),
                    Some("microdav".to_string())
                );
                assert_eq!(
                    matches.get_one::<u32>(store::ARG_BCRYPT_COST).copied(),
                    Some(10)
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(0)
                );
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("MICRODAV_PORT", Some("443")),
                ("MICRODAV_DSN", Some("sqlite:///var/lib/microdav/users.db")),
                ("MICRODAV_ROOT", Some("/srv/dav")),
                ("MICRODAV_REALM", Some("Protected")),
                ("MICRODAV_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["microdav"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>(store::ARG_DSN).cloned(),
                    Some("sqlite:///var/lib/microdav/users.db".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(store::ARG_ROOT).cloned(),
                    Some("/srv/dav".to_string())
                );
                assert_eq!(
                    matches.get_one::<String>(ARG_REALM).cloned(),
                    Some("Protected".to_string())
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_u8 {
            temp_env::with_vars([("MICRODAV_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["microdav".to_string()];
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index as usize)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(index)
                );
            });
        }
    }

    #[test]
    fn test_bcrypt_cost_range() {
        let result = new().try_get_matches_from(vec!["microdav", "--bcrypt-cost", "3"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_user_add_requires_password() {
        temp_env::with_vars([("MICRODAV_PASSWORD", None::<&str>)], || {
            let result = new().try_get_matches_from(vec!["microdav", "user", "add", "alice"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_user_add_global_args_after_subcommand() {
        let matches = new().get_matches_from(vec![
            "microdav",
            "user",
            "add",
            "alice",
            "--password",
            "s3cret",
            "--dsn",
            "sqlite::memory:",
        ]);

        let (name, user) = matches.subcommand().unwrap();
        assert_eq!(name, user::CMD_USER);
        let (name, add) = user.subcommand().unwrap();
        assert_eq!(name, "add");
        assert_eq!(
            add.get_one::<String>(user::ARG_USERNAME).cloned(),
            Some("alice".to_string())
        );
        assert_eq!(
            add.get_one::<String>(store::ARG_DSN).cloned(),
            Some("sqlite::memory:".to_string())
        );
    }
}
