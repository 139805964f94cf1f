extern crate dirs;
extern crate docopt;
extern crate fern;
#[macro_use]
extern crate log;
extern crate nix;
#[macro_use]
extern crate serde_derive;
extern crate tsh_rs;

use std::path::PathBuf;
use std::process;

use docopt::Docopt;
use nix::libc;
use nix::unistd::{self, Pid};

use tsh_rs::errors::*;
use tsh_rs::{Shell, ShellConfig};

const LOG_FILE_NAME: &str = ".tsh_log";

const USAGE: &str = "
tsh - a tiny shell with job control.

Usage:
    tsh [-v] [-p] [--log=<path>]
    tsh (-h | --help)
    tsh --version

Options:
    -h --help       Show this screen.
    --version       Show version.
    -v              Emit additional diagnostic information.
    -p              Do not emit a command prompt.
    --log=<path>    File to write log to, defaults to ~/.tsh_log
";

/// Docopts input arguments.
#[derive(Debug, Deserialize)]
struct Args {
    flag_v: bool,
    flag_p: bool,
    flag_log: Option<String>,
    flag_version: bool,
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    if args.flag_version {
        println!("tsh version {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(e) = init_logger(args.flag_log.as_ref().map(String::as_str)) {
        eprintln!("tsh: {}", e.chain_message());
    }
    debug!("{:?}", args);

    // Send every message to stdout, where a driver only has to read one pipe.
    if let Err(e) = unistd::dup2(libc::STDOUT_FILENO, libc::STDERR_FILENO) {
        display_error_and_exit(&Error::with_chain(e, "dup2 error"));
    }

    let shell_config = if args.flag_p {
        ShellConfig::noninteractive()
    } else {
        ShellConfig::interactive()
    }
    .verbose(args.flag_v);
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));
    let result = shell.execute_from_stdin();
    exit(result, &mut shell);
}

fn init_logger(path: Option<&str>) -> Result<()> {
    let log_path = match path.map(PathBuf::from).or_else(default_log_path) {
        Some(log_path) => log_path,
        None => return Err("unable to find home directory, logging disabled".into()),
    };
    let log_file = fern::log_file(&log_path)
        .chain_err(|| format!("failed to open log file {}", log_path.display()))?;

    let pid = Pid::this();
    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                pid,
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Trace)
        .chain(log_file)
        .apply()
        .chain_err(|| "failed to initialize logger")
}

fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(LOG_FILE_NAME))
}

fn display_error_and_exit(error: &Error) -> ! {
    error!("failed to create shell: {}", error.chain_message());
    eprintln!("tsh: {}", error.chain_message());
    process::exit(1);
}

fn exit(result: Result<()>, shell: &mut Shell) -> ! {
    if let Err(e) = result {
        error!("fatal: {}", e.chain_message());
        eprintln!("tsh: {}", e.chain_message());
        shell.exit(1);
    } else {
        shell.exit(0);
    }
}
