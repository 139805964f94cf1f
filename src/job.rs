//! Jobs and the fixed-capacity job table.
//!
//! The table is a plain array of slots scanned linearly; iteration order is
//! slot order, which is what `jobs` prints.

use std::fmt;
use std::str::FromStr;

use nix::unistd::Pid;

use crate::errors::{Error, ErrorKind, Result};

/// Maximum number of jobs tracked at any point in time.
pub const MAX_JOBS: usize = 16;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job states and the transitions between them:
///
/// - `Foreground -> Stopped`: suspend key
/// - `Stopped -> Foreground`: `fg`
/// - `Stopped -> Background`: `bg`
/// - `Background -> Foreground`: `fg`
///
/// A job that is not in the table is undefined.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            JobState::Foreground => write!(f, "Foreground"),
            JobState::Background => write!(f, "Running"),
            JobState::Stopped => write!(f, "Stopped"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    id: JobId,
    /// Also the job's process group id.
    pid: Pid,
    state: JobState,
    command_line: String,
}

impl Job {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// `[jobId] (pid) commandline`, printed when a job starts running in the
    /// background.
    pub fn announcement(&self) -> String {
        format!("[{}] ({}) {}", self.id, self.pid, self.command_line)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] ({}) {} {}",
            self.id, self.pid, self.state, self.command_line
        )
    }
}

/// Names a job the way `bg` and `fg` accept it: `%N` is a job id, a bare
/// number is a process id.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobSpec {
    Job(JobId),
    Process(Pid),
}

impl FromStr for JobSpec {
    type Err = ();

    fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
        let (digits, is_job_id) = if s.starts_with('%') {
            (&s[1..], true)
        } else {
            (s, false)
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(());
        }

        let n = digits.parse::<i32>().map_err(|_| ())?;
        if is_job_id {
            Ok(JobSpec::Job(JobId(n as u32)))
        } else {
            Ok(JobSpec::Process(Pid::from_raw(n)))
        }
    }
}

impl fmt::Display for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            JobSpec::Job(id) => write!(f, "%{}", id),
            JobSpec::Process(pid) => write!(f, "{}", pid),
        }
    }
}

#[derive(Debug)]
pub struct JobTable {
    slots: [Option<Job>; MAX_JOBS],
    next_job_id: u32,
}

impl Default for JobTable {
    fn default() -> Self {
        JobTable {
            slots: Default::default(),
            next_job_id: 1,
        }
    }
}

impl JobTable {
    /// Registers a job in the first free slot and returns its new job id.
    pub fn add(&mut self, pid: Pid, state: JobState, command_line: &str) -> Result<JobId> {
        if pid.as_raw() < 1 {
            bail!("refusing to track invalid pid {}", pid);
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or_else(|| Error::from(ErrorKind::TooManyJobs))?;
        let id = self.allocate_job_id();
        self.slots[index] = Some(Job {
            id,
            pid,
            state,
            command_line: command_line.to_string(),
        });
        Ok(id)
    }

    /// Removes the job whose process id is `pid`.
    pub fn remove(&mut self, pid: Pid) -> Option<Job> {
        let job = self.position_by_pid(pid).and_then(|i| self.slots[i].take());
        if job.is_some() {
            self.next_job_id = wrap_job_id(self.max_job_id() + 1);
        }
        job
    }

    pub fn set_state(&mut self, pid: Pid, state: JobState) -> Option<&Job> {
        let index = self.position_by_pid(pid)?;
        let job = self.slots[index].as_mut()?;
        job.state = state;
        Some(&*job)
    }

    pub fn get_by_pid(&self, pid: Pid) -> Option<&Job> {
        self.position_by_pid(pid).and_then(|i| self.slots[i].as_ref())
    }

    pub fn get_by_job_id(&self, id: JobId) -> Option<&Job> {
        if id.0 < 1 {
            return None;
        }
        self.iter().find(|job| job.id == id)
    }

    /// Finds the job named by `spec`, reporting a user error if none matches.
    pub fn resolve(&self, spec: JobSpec) -> Result<&Job> {
        match spec {
            JobSpec::Job(id) => self
                .get_by_job_id(id)
                .ok_or_else(|| ErrorKind::NoSuchJob(spec.to_string()).into()),
            JobSpec::Process(pid) => self
                .get_by_pid(pid)
                .ok_or_else(|| ErrorKind::NoSuchProcess(pid.to_string()).into()),
        }
    }

    /// Process id of the foreground job, if there is one.
    pub fn foreground_pid(&self) -> Option<Pid> {
        self.iter()
            .find(|job| job.state == JobState::Foreground)
            .map(|job| job.pid)
    }

    pub fn pid_to_job_id(&self, pid: Pid) -> Option<JobId> {
        self.get_by_pid(pid).map(Job::id)
    }

    /// Occupied slots, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn position_by_pid(&self, pid: Pid) -> Option<usize> {
        if pid.as_raw() < 1 {
            return None;
        }
        self.slots
            .iter()
            .position(|slot| slot.as_ref().map_or(false, |job| job.pid == pid))
    }

    fn max_job_id(&self) -> u32 {
        self.iter().map(|job| job.id.0).max().unwrap_or(0)
    }

    /// Hands out `next_job_id`, skipping ids still in use after a wrap.
    /// Only called with a free slot, so some id in `1..=MAX_JOBS` is free.
    fn allocate_job_id(&mut self) -> JobId {
        let mut candidate = self.next_job_id;
        while self.iter().any(|job| job.id.0 == candidate) {
            candidate = wrap_job_id(candidate + 1);
        }
        self.next_job_id = wrap_job_id(candidate + 1);
        JobId(candidate)
    }
}

fn wrap_job_id(id: u32) -> u32 {
    if id as usize > MAX_JOBS {
        1
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(raw: i32) -> Pid {
        Pid::from_raw(raw)
    }

    #[test]
    fn test_add_assigns_increasing_job_ids() {
        let mut jobs = JobTable::default();
        assert_eq!(
            jobs.add(pid(100), JobState::Background, "sleep 1 &").unwrap(),
            JobId(1)
        );
        assert_eq!(
            jobs.add(pid(101), JobState::Background, "sleep 2 &").unwrap(),
            JobId(2)
        );
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs.pid_to_job_id(pid(101)), Some(JobId(2)));
    }

    #[test]
    fn test_add_rejects_invalid_pid() {
        let mut jobs = JobTable::default();
        assert!(jobs.add(pid(0), JobState::Foreground, "ls").is_err());
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_table_capacity() {
        let mut jobs = JobTable::default();
        for i in 0..MAX_JOBS {
            jobs.add(pid(100 + i as i32), JobState::Background, "sleep 9 &")
                .unwrap();
        }
        let error = jobs.add(pid(999), JobState::Background, "sleep 9 &").unwrap_err();
        match *error.kind() {
            ErrorKind::TooManyJobs => {}
            ref kind => panic!("unexpected error: {:?}", kind),
        }

        let mut ids: Vec<u32> = jobs.iter().map(|job| job.id().0).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids, (1..=MAX_JOBS as u32).collect::<Vec<_>>());
    }

    #[test]
    fn test_remove_reclaims_job_id() {
        let mut jobs = JobTable::default();
        jobs.add(pid(100), JobState::Background, "a &").unwrap();
        jobs.add(pid(101), JobState::Background, "b &").unwrap();
        jobs.add(pid(102), JobState::Background, "c &").unwrap();

        let removed = jobs.remove(pid(102)).unwrap();
        assert_eq!(removed.id(), JobId(3));
        assert_eq!(
            jobs.add(pid(103), JobState::Background, "d &").unwrap(),
            JobId(3)
        );
        assert!(jobs.remove(pid(555)).is_none());
    }

    #[test]
    fn test_job_ids_wrap_without_duplicates() {
        let mut jobs = JobTable::default();
        for i in 0..MAX_JOBS {
            jobs.add(pid(100 + i as i32), JobState::Background, "x &")
                .unwrap();
        }
        // Job 16 is still the maximum, so the counter wraps back to 1.
        jobs.remove(pid(100));
        jobs.remove(pid(101));
        assert_eq!(jobs.add(pid(200), JobState::Background, "y &").unwrap(), JobId(1));
        assert_eq!(jobs.add(pid(201), JobState::Background, "z &").unwrap(), JobId(2));

        // Repeated churn never leaves the 1..=MAX_JOBS range or duplicates.
        for i in 0..100 {
            let victim = jobs.iter().nth(i % MAX_JOBS).unwrap().pid();
            jobs.remove(victim);
            let id = jobs
                .add(pid(300 + i as i32), JobState::Background, "w &")
                .unwrap();
            assert!(id.0 >= 1 && id.0 as usize <= MAX_JOBS);
            let mut ids: Vec<u32> = jobs.iter().map(|job| job.id().0).collect();
            let before = ids.len();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), before);
        }
    }

    #[test]
    fn test_lookups() {
        let mut jobs = JobTable::default();
        jobs.add(pid(100), JobState::Background, "sleep 5 &").unwrap();
        jobs.add(pid(101), JobState::Foreground, "sleep 6").unwrap();

        assert_eq!(jobs.foreground_pid(), Some(pid(101)));
        assert_eq!(jobs.get_by_job_id(JobId(1)).unwrap().pid(), pid(100));
        assert!(jobs.get_by_job_id(JobId(0)).is_none());
        assert!(jobs.get_by_pid(pid(-1)).is_none());

        assert_eq!(
            jobs.resolve(JobSpec::Job(JobId(2))).unwrap().command_line(),
            "sleep 6"
        );
        assert_eq!(jobs.resolve(JobSpec::Process(pid(100))).unwrap().id(), JobId(1));
        assert_eq!(
            jobs.resolve(JobSpec::Job(JobId(7))).unwrap_err().to_string(),
            "%7: No such job"
        );
        assert_eq!(
            jobs.resolve(JobSpec::Process(pid(7))).unwrap_err().to_string(),
            "(7): No such process"
        );
    }

    #[test]
    fn test_state_changes_and_listing() {
        let mut jobs = JobTable::default();
        jobs.add(pid(100), JobState::Foreground, "sleep 5").unwrap();
        jobs.set_state(pid(100), JobState::Stopped);
        assert_eq!(jobs.foreground_pid(), None);
        assert_eq!(jobs.iter().next().unwrap().to_string(), "[1] (100) Stopped sleep 5");

        jobs.set_state(pid(100), JobState::Background);
        assert_eq!(jobs.iter().next().unwrap().to_string(), "[1] (100) Running sleep 5");
        assert_eq!(jobs.iter().next().unwrap().announcement(), "[1] (100) sleep 5");
        assert!(jobs.set_state(pid(12), JobState::Stopped).is_none());
    }

    #[test]
    fn test_listing_is_in_slot_order() {
        let mut jobs = JobTable::default();
        jobs.add(pid(300), JobState::Background, "a &").unwrap();
        jobs.add(pid(200), JobState::Background, "b &").unwrap();
        jobs.add(pid(100), JobState::Background, "c &").unwrap();
        jobs.remove(pid(300));
        jobs.add(pid(400), JobState::Background, "d &").unwrap();

        let listed: Vec<Pid> = jobs.iter().map(Job::pid).collect();
        assert_eq!(listed, vec![pid(400), pid(200), pid(100)]);
    }

    #[test]
    fn test_parse_job_spec() {
        assert_eq!("%3".parse::<JobSpec>(), Ok(JobSpec::Job(JobId(3))));
        assert_eq!("1234".parse::<JobSpec>(), Ok(JobSpec::Process(pid(1234))));
        assert!("".parse::<JobSpec>().is_err());
        assert!("%".parse::<JobSpec>().is_err());
        assert!("%x".parse::<JobSpec>().is_err());
        assert!("12abc".parse::<JobSpec>().is_err());
        assert!("-5".parse::<JobSpec>().is_err());
        assert!("99999999999".parse::<JobSpec>().is_err());
    }
}
