//! Tsh builtins
//!
//! Builtins run in the shell process itself, never in a child. `quit` leaves
//! the shell, `jobs` lists the job table, and `bg`/`fg` continue a stopped or
//! background job.

use std::io::Write;

use crate::errors::{Error, ErrorKind, Result};
use crate::shell::Shell;

use self::jobs::{Bg, Fg, Jobs};
use self::quit::Quit;

mod jobs;
mod quit;

const BG_NAME: &str = "bg";
const FG_NAME: &str = "fg";
const JOBS_NAME: &str = "jobs";
const QUIT_NAME: &str = "quit";

/// Represents a Tsh builtin command such as jobs or fg.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// The help string, whose first line is the usage.
    const HELP: &'static str;
    fn usage() -> &'static str {
        Self::HELP.lines().next().unwrap_or(Self::NAME)
    }
    /// Runs the command with the given arguments in the `shell` environment.
    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()>;
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    [BG_NAME, FG_NAME, JOBS_NAME, QUIT_NAME].contains(&program.as_ref())
}

/// precondition: command is a builtin.
pub fn run<S1, S2>(shell: &mut Shell, program: S1, args: &[S2], stdout: &mut dyn Write) -> Result<()>
where
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    debug_assert!(is_builtin(&program));

    let result = match program.as_ref() {
        BG_NAME => Bg::run(shell, args, stdout),
        FG_NAME => Fg::run(shell, args, stdout),
        JOBS_NAME => Jobs::run(shell, args, stdout),
        QUIT_NAME => Quit::run(shell, args, stdout),
        _ => unreachable!(),
    };

    if let Err(ref e) = result {
        debug!(
            "{} finished with status {}: {}",
            program.as_ref(),
            builtin_exit_status(e),
            e
        );
    }
    result
}

fn builtin_exit_status(error: &Error) -> i32 {
    match *error.kind() {
        ErrorKind::BuiltinCommand(_, code) => code,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_builtin() {
        for name in &["quit", "jobs", "bg", "fg"] {
            assert!(is_builtin(name));
        }
        for name in &["exit", "ls", "/bin/echo", "Quit", ""] {
            assert!(!is_builtin(name));
        }
    }

    #[test]
    fn test_usage_is_first_help_line() {
        assert_eq!(Fg::usage(), "fg: fg <PID|%jobid>");
        assert_eq!(Quit::usage(), "quit: quit");
    }

    #[test]
    fn test_builtin_exit_status() {
        assert_eq!(builtin_exit_status(&Error::builtin_command("bg: nope", 2)), 2);
        assert_eq!(builtin_exit_status(&ErrorKind::NoSuchJob("%1".into()).into()), 1);
    }
}
