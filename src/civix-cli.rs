//! A command-line client for the CIVIX backend.
//! It signs in the same way the portal does and keeps the resulting session in
//! a file, so later commands run on behalf of the same user.

use std::path::PathBuf;
use std::time::Duration;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};
use rocket::serde::json::serde_json;
use thiserror::Error;

use civix_portal::{
    backend::{Backend, BackendError, HttpBackend},
    error::Error as PortalError,
    model::user::Credentials,
    session::{FileStorage, SessionStore},
};

const PROGRAM_NAME: &str = "civix";

const ABOUT_TEXT: &str = "Talk to the CIVIX backend from the command line.

EXIT CODES:
     0: Success.
     1: Error.";

const API: &str = "API";
const SESSION: &str = "SESSION";
const TIMEOUT: &str = "TIMEOUT";
const VERBOSE: &str = "VERBOSE";
const IDENTIFIER: &str = "IDENTIFIER";
const PASSWORD: &str = "PASSWORD";
const PATH: &str = "PATH";

const DEFAULT_API: &str = "http://localhost:3000/api";

/// Name of the session file kept in the home directory.
const SESSION_FILE: &str = ".civix-session.json";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .subcommand_required(true)
        .arg(
            Arg::new(API)
                .help("Base URL of the backend REST API")
                .long("api")
                .env("CIVIX_API_BASE_URL")
                .default_value(DEFAULT_API),
        )
        .arg(
            Arg::new(SESSION)
                .help("Where to keep the session [default: ~/.civix-session.json]")
                .long("session")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(TIMEOUT)
                .help("Seconds to wait for the backend")
                .long("timeout")
                .value_parser(value_parser!(u64))
                .default_value("10"),
        )
        .arg(
            Arg::new(VERBOSE)
                .help("Log what is going on")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in and remember the session")
                .arg(Arg::new(IDENTIFIER).help("E-mail or elector number").required(true))
                .arg(
                    Arg::new(PASSWORD)
                        .help("Account password")
                        .long("password")
                        .env("CIVIX_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                ),
        )
        .subcommand(Command::new("logout").about("Sign out and forget the session"))
        .subcommand(Command::new("whoami").about("Check the session and show its user"))
        .subcommand(
            Command::new("get")
                .about("Fetch a backend resource as the signed-in user")
                .arg(Arg::new(PATH).help("Path relative to the API, e.g. elections/3").required(true)),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Error)]
enum Error {
    #[error("No home directory to keep the session in, use --session")]
    NoHome,
    #[error("No command given")]
    NoCommand,
    #[error("Not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Portal(#[from] PortalError),
    #[error("Could not format response: {0}")]
    Format(#[from] serde_json::Error),
}

/// The session file named on the command line, or the default one.
fn session_path(args: &ArgMatches) -> Result<PathBuf, Error> {
    match args.get_one::<PathBuf>(SESSION) {
        Some(path) => Ok(path.clone()),
        None => dirs::home_dir()
            .map(|home| home.join(SESSION_FILE))
            .ok_or(Error::NoHome),
    }
}

/// Send log output to stderr, keeping stdout for results.
fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{h({l:5})} {t} - {m}{n}")))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level));

    match config.map(log4rs::init_config) {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => eprintln!("Failed to initialise logging: {e}"),
        Err(e) => eprintln!("Invalid logging config: {e}"),
    }
}

/// Run the chosen command.
async fn run(args: &ArgMatches) -> Result<(), Error> {
    let api = args
        .get_one::<String>(API)
        .map(String::as_str)
        .unwrap_or(DEFAULT_API);
    let timeout = Duration::from_secs(args.get_one::<u64>(TIMEOUT).copied().unwrap_or(10));
    let backend = HttpBackend::new(api, timeout)?;
    let mut store = SessionStore::init(FileStorage::new(session_path(args)?));

    let Some((command, sub_args)) = args.subcommand() else {
        return Err(Error::NoCommand);
    };
    match command {
        "login" => {
            let identifier = sub_args.get_one::<String>(IDENTIFIER).ok_or(Error::NoCommand)?;
            let password = sub_args.get_one::<String>(PASSWORD).ok_or(Error::NoCommand)?;
            let user = store
                .login(&backend, &Credentials::new(identifier, password))
                .await?;
            println!("Signed in as {} ({})", user.name, user.role);
        }
        "logout" => {
            store.logout(&backend).await;
            println!("Signed out");
        }
        "whoami" => {
            if !store.verify(&backend).await {
                return Err(Error::NotSignedIn);
            }
            if let Some(user) = store.user() {
                match &user.email {
                    Some(email) => println!("{} <{email}> ({})", user.name, user.role),
                    None => println!("{} ({})", user.name, user.role),
                }
            }
        }
        "get" => {
            let path = sub_args.get_one::<String>(PATH).ok_or(Error::NoCommand)?;
            let token = store.token().ok_or(Error::NotSignedIn)?;
            let value = backend.get(path.trim_start_matches('/'), Some(token)).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => return Err(Error::NoCommand),
    }
    Ok(())
}

#[rocket::main]
async fn main() {
    let args = cli().get_matches();
    init_logging(args.get_flag(VERBOSE));
    let exit_code = match run(&args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    };
    std::process::exit(exit_code)
}
