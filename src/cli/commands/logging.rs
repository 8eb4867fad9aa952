use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a level name or its `-v` count, e.g. `MICRODAV_LOG_LEVEL=info` or `2`.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        let level = level.trim().to_lowercase();

        if let Ok(count) = level.parse::<u8>() {
            if usize::from(count) < LEVELS.len() {
                return Ok(count);
            }
            return Err(format!("log level must be 0-{}", LEVELS.len() - 1));
        }

        LEVELS
            .iter()
            .position(|name| *name == level)
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("invalid log level, expected one of: {}", LEVELS.join(", ")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity, repeat to raise it: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .long_help(
                "Log verbosity, repeat to raise it (default: ERROR).\n\
                 -v    WARN: requests for another user's namespace\n\
                 -vv   INFO: wrong passwords, user management\n\
                 -vvv  DEBUG: unknown users, missing credentials\n\
                 -vvvv TRACE: everything\n\
                 Credential store faults are always logged at ERROR.",
            )
            .env("MICRODAV_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
