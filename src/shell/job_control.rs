use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::errors::{Error, ErrorKind, Result, ResultExt};
use crate::job::{Job, JobId, JobSpec, JobState, JobTable};
use crate::shell::signals::{self, SignalEvent, SignalMask, RELAYED_SIGNALS};

/// Owns the job table. Every job-table transition caused by a signal happens
/// here, on the main flow, when pending signal events are drained.
#[derive(Default)]
pub struct JobManager {
    jobs: JobTable,
    verbose: bool,
}

impl JobManager {
    pub fn new(verbose: bool) -> JobManager {
        JobManager {
            jobs: JobTable::default(),
            verbose,
        }
    }

    pub fn create_job(&mut self, pid: Pid, state: JobState, command_line: &str) -> Result<JobId> {
        let job_id = self.jobs.add(pid, state, command_line)?;
        debug!("created job [{}] ({}) {:?}: {}", job_id, pid, state, command_line);
        if self.verbose {
            println!("Added job [{}] {} {}", job_id, pid, command_line);
        }
        Ok(job_id)
    }

    pub fn get_job(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.get_by_job_id(job_id)
    }

    pub fn get_jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn has_jobs(&self) -> bool {
        !self.jobs.is_empty()
    }

    /// Continues the job named by `spec` in the foreground and waits for it.
    pub fn put_job_in_foreground(&mut self, spec: JobSpec) -> Result<()> {
        let pid = self.jobs.resolve(spec)?.pid();
        debug!("putting job {} ({}) in foreground", spec, pid);

        continue_job(spec, pid)?;
        self.jobs.set_state(pid, JobState::Foreground);
        self.wait_for_job(pid)
    }

    /// Continues the job named by `spec` in the background.
    pub fn put_job_in_background(&mut self, spec: JobSpec) -> Result<Job> {
        let pid = self.jobs.resolve(spec)?.pid();
        debug!("putting job {} ({}) in background", spec, pid);

        continue_job(spec, pid)?;
        self.jobs
            .set_state(pid, JobState::Background)
            .cloned()
            .ok_or_else(|| ErrorKind::NoSuchProcess(pid.to_string()).into())
    }

    /// Waits until `pid` is no longer the foreground job, because it
    /// terminated or was stopped.
    ///
    /// The relayed signals stay blocked except while suspended, so an event
    /// arriving between a drain and the next suspend is never lost.
    pub fn wait_for_job(&mut self, pid: Pid) -> Result<()> {
        let mask = SignalMask::block(&RELAYED_SIGNALS)?;
        loop {
            self.process_pending_events()?;
            if self.jobs.foreground_pid() != Some(pid) {
                break;
            }
            mask.suspend();
        }

        debug!("({}) left the foreground", pid);
        Ok(())
    }

    /// Applies the signal events recorded since the last call.
    pub fn process_pending_events(&mut self) -> Result<()> {
        for event in signals::take_pending().iter() {
            trace!("handling {:?}", event);
            match event {
                SignalEvent::ChildStatus => self.update_job_statuses()?,
                SignalEvent::Interrupt => self.relay_to_foreground(Signal::SIGINT),
                SignalEvent::Suspend => self.relay_to_foreground(Signal::SIGTSTP),
            }
        }
        Ok(())
    }

    /// Reaps every child with status information available, without
    /// blocking.
    pub fn update_job_statuses(&mut self) -> Result<()> {
        loop {
            let wait_status = wait::waitpid(
                Pid::from_raw(-1),
                Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED),
            );
            match wait_status {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Ok(status) => self.mark_process_status(status),
                Err(e) => return Err(Error::with_chain(e, "waitpid error")),
            }
        }

        Ok(())
    }

    fn mark_process_status(&mut self, wait_status: WaitStatus) {
        match wait_status {
            WaitStatus::Exited(pid, status_code) => {
                debug!("{} exited with {}", pid, status_code);
                if self.jobs.remove(pid).is_none() {
                    warn!("reaped ({}) which is not in the job table", pid);
                }
            }
            WaitStatus::Signaled(pid, signal, _) => {
                debug!("{} terminated by signal {}", pid, signal);
                match self.jobs.remove(pid) {
                    Some(job) => println!(
                        "Job [{}] ({}) terminated by signal {}",
                        job.id(),
                        pid,
                        signal as i32
                    ),
                    None => warn!("reaped ({}) which is not in the job table", pid),
                }
            }
            WaitStatus::Stopped(pid, signal) => {
                debug!("{} was signaled to stop by {}", pid, signal);
                match self.jobs.set_state(pid, JobState::Stopped) {
                    Some(job) => println!(
                        "Job [{}] ({}) stopped by signal {}",
                        job.id(),
                        pid,
                        signal as i32
                    ),
                    None => warn!("({}) stopped but is not in the job table", pid),
                }
            }
            other => trace!("ignoring wait status {:?}", other),
        }
    }

    /// Sends `signal` to the foreground job's whole process group. With no
    /// foreground job the event is dropped.
    fn relay_to_foreground(&self, signal: Signal) {
        match self.jobs.foreground_pid() {
            Some(pid) => {
                debug!("relaying {} to process group {}", signal, pid);
                let temp_result = signal::kill(Pid::from_raw(-pid.as_raw()), signal);
                log_if_err!(temp_result, "failed to relay {} to ({})", signal, pid);
            }
            None => debug!("no foreground job, ignoring {}", signal),
        }
    }
}

impl fmt::Debug for JobManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} jobs\tverbose: {}", self.jobs.len(), self.verbose)?;
        for job in self.jobs.iter() {
            writeln!(f, "{:?}", job)?;
        }

        Ok(())
    }
}

fn continue_job(spec: JobSpec, pid: Pid) -> Result<()> {
    signal::kill(Pid::from_raw(-pid.as_raw()), Signal::SIGCONT)
        .chain_err(|| ErrorKind::BuiltinCommand(format!("{}: failed to continue job", spec), 1))
}
