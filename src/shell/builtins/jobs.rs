use std::io::Write;

use crate::errors::{Error, Result};
use crate::job::JobSpec;
use crate::shell::builtins::{self, BuiltinCommand};
use crate::shell::Shell;

pub struct Jobs;

impl BuiltinCommand for Jobs {
    const NAME: &'static str = builtins::JOBS_NAME;

    const HELP: &'static str = "\
jobs: jobs
    Display status of jobs.

    Lists every job in the job table as `[jobid] (pid) state commandline`,
    where state is Running, Stopped or Foreground.";

    fn run<T: AsRef<str>>(shell: &mut Shell, _args: &[T], stdout: &mut dyn Write) -> Result<()> {
        for job in shell.get_jobs() {
            writeln!(stdout, "{}", job)?;
        }

        Ok(())
    }
}

pub struct Fg;

impl BuiltinCommand for Fg {
    const NAME: &'static str = builtins::FG_NAME;

    const HELP: &'static str = "\
fg: fg <PID|%jobid>
    Move job to the foreground.

    Continue the job identified by PID or %jobid if it is stopped, and wait
    for it as the foreground job.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        let spec = parse_job_spec::<Self, T>(args)?;
        shell.put_job_in_foreground(spec)
    }
}

pub struct Bg;

impl BuiltinCommand for Bg {
    const NAME: &'static str = builtins::BG_NAME;

    const HELP: &'static str = "\
bg: bg <PID|%jobid>
    Move job to the background.

    Continue the stopped job identified by PID or %jobid, as if it had been
    started with `&'.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        let spec = parse_job_spec::<Self, T>(args)?;
        let job = shell.put_job_in_background(spec)?;
        writeln!(stdout, "{}", job.announcement())?;
        Ok(())
    }
}

/// Only the first argument is looked at; the rest are ignored.
fn parse_job_spec<B: BuiltinCommand, T: AsRef<str>>(args: &[T]) -> Result<JobSpec> {
    let arg = args.first().ok_or_else(|| {
        debug!("usage: {}", B::usage());
        Error::builtin_command(
            format!("{} command requires PID or %jobid argument", B::NAME),
            1,
        )
    })?;

    arg.as_ref().parse::<JobSpec>().map_err(|_| {
        debug!("usage: {}", B::usage());
        Error::builtin_command(format!("{}: argument must be a PID or %jobid", B::NAME), 1)
    })
}
