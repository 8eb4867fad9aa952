use clap::{Arg, Command};

pub const ARG_DSN: &str = "dsn";
pub const ARG_BCRYPT_COST: &str = "bcrypt-cost";
pub const ARG_STORE_TIMEOUT: &str = "store-timeout";
pub const ARG_ROOT: &str = "root";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Credential database connection string")
                .env("MICRODAV_DSN")
                .default_value("sqlite://users.db")
                .global(true),
        )
        .arg(
            Arg::new(ARG_BCRYPT_COST)
                .long("bcrypt-cost")
                .help("bcrypt work factor for new password hashes (4-31)")
                .env("MICRODAV_BCRYPT_COST")
                .default_value("10")
                .global(true)
                .value_parser(clap::value_parser!(u32).range(4..=31)),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT)
                .long("store-timeout")
                .help("Deadline in seconds for each credential store query")
                .env("MICRODAV_STORE_TIMEOUT")
                .default_value("5")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_ROOT)
                .short('r')
                .long("root")
                .help("Directory holding one namespace directory per user")
                .env("MICRODAV_ROOT")
                .default_value("./data")
                .global(true),
        )
}
