use clap::{Arg, Command};

pub const CMD_USER: &str = "user";
pub const ARG_USERNAME: &str = "username";
pub const ARG_PASSWORD: &str = "password";

fn username() -> Arg {
    Arg::new(ARG_USERNAME).help("Username").required(true)
}

fn password() -> Arg {
    Arg::new(ARG_PASSWORD)
        .long("password")
        .help("Password")
        .env("MICRODAV_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

#[must_use]
pub fn subcommand() -> Command {
    Command::new(CMD_USER)
        .about("Manage credentials")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Create a user and their namespace directory")
                .long_about(
                    "Create a user and their namespace directory.\n\n\
                     An existing directory left behind by a deleted user of the same name \
                     is kept and handed to the new account; a warning is printed.",
                )
                .arg(username())
                .arg(password()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a user, leaving their files in place")
                .arg(username()),
        )
        .subcommand(Command::new("list").about("List usernames"))
        .subcommand(
            Command::new("check")
                .about("Verify a username and password")
                .arg(username())
                .arg(password()),
        )
}
