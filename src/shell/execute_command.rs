use std::ffi::CString;

use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{self, Signal};
use nix::unistd::{self, ForkResult, Pid};

use crate::errors::{Error, ErrorKind, Result, ResultExt};
use crate::job::{JobId, JobState};
use crate::parser::Command;
use crate::shell::job_control::JobManager;
use crate::shell::signals::{self, SignalMask};
use crate::util;

pub const COMMAND_NOT_FOUND_EXIT_STATUS: i32 = 127;
pub const COMMAND_NOT_EXECUTABLE_EXIT_STATUS: i32 = 126;

/// Forks a child running `command` in its own process group and registers it
/// as a job. SIGCHLD stays blocked until the job is in the table, so the child
/// can never be reaped before it is known.
pub fn spawn_job(job_manager: &mut JobManager, command: &Command) -> Result<(JobId, Pid)> {
    let argv = command
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<::std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::syntax(&command.input))?;
    if argv.is_empty() {
        bail!("refusing to launch an empty command");
    }

    let state = if command.background {
        JobState::Background
    } else {
        JobState::Foreground
    };

    let mask = SignalMask::block(&[Signal::SIGCHLD])?;
    util::flush_stdout();
    match unsafe { unistd::fork() }.chain_err(|| "fork error")? {
        ForkResult::Child => exec_child(&command.argv[0], &argv, mask),
        ForkResult::Parent { child } => {
            let temp_result = unistd::setpgid(child, child);
            log_if_err!(temp_result, "failed to put ({}) in its own process group", child);

            let job_id = match job_manager.create_job(child, state, &command.input) {
                Ok(job_id) => job_id,
                Err(e) => {
                    let temp_result = signal::kill(Pid::from_raw(-child.as_raw()), Signal::SIGKILL);
                    log_if_err!(temp_result, "failed to kill unregistered child ({})", child);
                    return Err(e);
                }
            };

            drop(mask);
            Ok((job_id, child))
        }
    }
}

/// Runs in the forked child; never returns into shell code.
fn exec_child(program: &str, argv: &[CString], mask: SignalMask) -> ! {
    if let Err(e) = unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
        eprintln!("setpgid error: {}", e.desc());
        exit_child(1);
    }
    drop(mask);
    if let Err(e) = signals::reset_handlers() {
        eprintln!("tsh: {}", e.chain_message());
        exit_child(1);
    }

    let error = match unistd::execvp(&argv[0], argv) {
        Ok(never) => match never {},
        Err(e) => e,
    };
    if error == Errno::ENOENT {
        eprintln!("{}", ErrorKind::CommandNotFound(program.to_string()));
        exit_child(COMMAND_NOT_FOUND_EXIT_STATUS);
    } else {
        eprintln!("{}: {}", program, error.desc());
        exit_child(COMMAND_NOT_EXECUTABLE_EXIT_STATUS);
    }
}

/// Ends the forked child without running the shell's exit handlers or
/// flushing stdio buffers inherited from the parent.
fn exit_child(code: i32) -> ! {
    unsafe { libc::_exit(code) }
}
