//! Tsh - Shell Module
//!
//! The Shell reads command lines, runs builtins in place and launches
//! everything else as a job tracked by its `JobManager`.

use std::fmt;
use std::io::{self, BufRead};
use std::process;
use std::str;

use crate::errors::{Error, ErrorKind, Result, ResultExt};
use crate::job::{Job, JobSpec};
use crate::parser::Command;
use crate::shell::{
    builtins,
    execute_command::spawn_job,
    job_control::JobManager,
    signals,
};
use crate::util;

const PROMPT: &str = "tsh> ";

/// Tsh Shell
pub struct Shell {
    job_manager: JobManager,
    config: ShellConfig,
}

impl Shell {
    /// Constructs a new Shell and installs its signal handlers.
    pub fn new(config: ShellConfig) -> Result<Shell> {
        signals::install_handlers()?;
        let shell = Shell {
            job_manager: JobManager::new(config.verbose),
            config,
        };

        info!("tsh started up");
        Ok(shell)
    }

    /// Runs command lines from stdin until EOF is received.
    pub fn execute_from_stdin(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut line = Vec::new();
        loop {
            // Jobs that finished or stopped while the shell sat in the read
            // below are reaped and reported here, once the next line arrives.
            self.job_manager.process_pending_events()?;

            if self.config.emit_prompt {
                print!("{}", PROMPT);
                util::flush_stdout();
            }

            line.clear();
            let bytes_read = stdin
                .lock()
                .read_until(b'\n', &mut line)
                .chain_err(|| "failed to read command line")?;
            if bytes_read == 0 {
                debug!("end of input");
                break;
            }

            let result = decode_line(&line).and_then(|input| self.execute_command(input));
            report_recoverable(result)?;
            util::flush_stdout();
        }

        Ok(())
    }

    /// Runs a single command line.
    ///
    /// Errors the user can act on (syntax errors, builtin misuse, unknown
    /// jobs, a full job table) are printed and swallowed. Only errors the
    /// shell cannot recover from are returned.
    pub fn execute_command_string(&mut self, input: &str) -> Result<()> {
        let result = self.execute_command(input);
        report_recoverable(result)
    }

    fn execute_command(&mut self, input: &str) -> Result<()> {
        self.job_manager.process_pending_events()?;

        let command = Command::parse(input)?;
        let program = match command.program() {
            Some(program) => program,
            None => return Ok(()),
        };
        debug!("{:?}", command);
        if self.config.verbose {
            echo_arguments(&command);
        }

        if builtins::is_builtin(program) {
            return builtins::run(self, program, command.args(), &mut io::stdout());
        }

        let (job_id, pid) = spawn_job(&mut self.job_manager, &command)?;
        if command.background {
            if let Some(job) = self.job_manager.get_job(job_id) {
                println!("{}", job.announcement());
            }
            Ok(())
        } else {
            self.job_manager.wait_for_job(pid)
        }
    }

    /// Returns the shell's jobs, in job table order.
    pub fn get_jobs(&self) -> impl Iterator<Item = &Job> {
        self.job_manager.get_jobs()
    }

    /// Continues the job named by `spec` in the foreground and waits for it
    /// to stop or terminate.
    pub fn put_job_in_foreground(&mut self, spec: JobSpec) -> Result<()> {
        self.job_manager.put_job_in_foreground(spec)
    }

    /// Continues the job named by `spec` in the background.
    pub fn put_job_in_background(&mut self, spec: JobSpec) -> Result<Job> {
        self.job_manager.put_job_in_background(spec)
    }

    /// Exit the shell with a status of `code`. Jobs still running are left
    /// alone.
    pub fn exit(&mut self, code: i32) -> ! {
        util::flush_stdout();
        if self.job_manager.has_jobs() {
            debug!("leaving jobs behind: {:?}", self.job_manager);
        }
        info!("tsh has shut down");
        process::exit(code);
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}\n{:?}", self.config, self.job_manager)
    }
}

/// Prints errors the user can act on and swallows them.
fn report_recoverable(result: Result<()>) -> Result<()> {
    match result {
        Err(ref e) if e.is_recoverable() => {
            warn!("{}", e);
            match *e.kind() {
                ErrorKind::Syntax(_) => eprintln!("tsh: {}", e),
                _ => eprintln!("{}", e),
            }
            Ok(())
        }
        result => result,
    }
}

/// Command lines must be UTF-8; anything else is reported like a syntax error.
fn decode_line(line: &[u8]) -> Result<&str> {
    str::from_utf8(line).map_err(|_| {
        Error::syntax(String::from_utf8_lossy(line).trim_end_matches(&['\n', '\r'][..]))
    })
}

fn echo_arguments(command: &Command) {
    if command.background {
        println!("background job requested");
    }
    let argv: Vec<String> = command
        .argv
        .iter()
        .enumerate()
        .map(|(i, arg)| format!("argv[{}]={}", i, arg))
        .collect();
    println!("{}", argv.join(", "));
}

/// Policy object to control a Shell's behavior
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Determines if `tsh> ` is printed before each command line is read.
    emit_prompt: bool,

    /// Determines if parsed arguments and newly added jobs are echoed.
    verbose: bool,
}

impl ShellConfig {
    /// Creates a shell for a person at a terminal: the prompt is printed.
    pub fn interactive() -> ShellConfig {
        ShellConfig {
            emit_prompt: true,
            verbose: false,
        }
    }

    /// Creates a shell driven by a script or test harness: no prompt.
    pub fn noninteractive() -> ShellConfig {
        ShellConfig {
            emit_prompt: false,
            verbose: false,
        }
    }

    pub fn verbose(self, verbose: bool) -> ShellConfig {
        ShellConfig { verbose, ..self }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self::interactive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ShellConfig::default();
        assert!(config.emit_prompt);
        assert!(!config.verbose);

        let config = ShellConfig::noninteractive().verbose(true);
        assert!(!config.emit_prompt);
        assert!(config.verbose);
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"/bin/echo caf\xc3\xa9\n").unwrap(), "/bin/echo caf\u{e9}\n");

        let error = decode_line(b"/bin/echo caf\xe9\n").unwrap_err();
        assert!(error.is_recoverable());
        match *error.kind() {
            ErrorKind::Syntax(ref line) => assert_eq!(line, "/bin/echo caf\u{fffd}"),
            ref kind => panic!("unexpected error: {:?}", kind),
        }
    }
}
