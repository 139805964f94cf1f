//! Asynchronous signal handling.
//!
//! The handlers installed here never touch the job table. SIGCHLD, SIGINT and
//! SIGTSTP only record an event in a static bit set; the main flow drains the
//! set with `take_pending` and applies the resulting job-table transitions
//! (see `JobManager::process_pending_events`). SIGQUIT terminates the shell
//! straight from its handler.

use std::iter;
use std::sync::atomic::{AtomicUsize, Ordering};

use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};

use crate::errors::{Result, ResultExt};

/// Signals whose handlers record a `SignalEvent`.
pub const RELAYED_SIGNALS: [Signal; 3] = [Signal::SIGCHLD, Signal::SIGINT, Signal::SIGTSTP];

static PENDING: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignalEvent {
    /// A child exited, was killed or was stopped (SIGCHLD)
    ChildStatus,
    /// The interrupt key was typed (SIGINT)
    Interrupt,
    /// The suspend key was typed (SIGTSTP)
    Suspend,
}

impl SignalEvent {
    /// Drain order. Children are reaped before anything is relayed, so a
    /// relay never targets a job that has already finished.
    const ALL: [SignalEvent; 3] = [
        SignalEvent::ChildStatus,
        SignalEvent::Interrupt,
        SignalEvent::Suspend,
    ];

    fn from_raw(signo: libc::c_int) -> Option<SignalEvent> {
        match signo {
            libc::SIGCHLD => Some(SignalEvent::ChildStatus),
            libc::SIGINT => Some(SignalEvent::Interrupt),
            libc::SIGTSTP => Some(SignalEvent::Suspend),
            _ => None,
        }
    }

    fn bit(self) -> usize {
        1 << self as usize
    }
}

/// Events recorded by the handlers since the last drain. Repeated deliveries
/// of the same signal coalesce into one event, just like the kernel's own
/// pending set.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PendingEvents(usize);

impl PendingEvents {
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, event: SignalEvent) -> bool {
        self.0 & event.bit() != 0
    }

    /// Pending events in drain order.
    pub fn iter(self) -> impl Iterator<Item = SignalEvent> {
        let all: &'static [SignalEvent] = &SignalEvent::ALL;
        all.iter()
            .cloned()
            .filter(move |event| self.contains(*event))
    }
}

/// Takes every event recorded so far, leaving none pending.
pub fn take_pending() -> PendingEvents {
    PendingEvents(PENDING.swap(0, Ordering::SeqCst))
}

extern "C" fn record_signal(signo: libc::c_int) {
    if let Some(event) = SignalEvent::from_raw(signo) {
        PENDING.fetch_or(event.bit(), Ordering::SeqCst);
    }
}

extern "C" fn terminate_on_quit(_: libc::c_int) {
    const MESSAGE: &[u8] = b"Terminating after receipt of SIGQUIT signal\n";
    // only async-signal-safe calls from here on
    unsafe {
        libc::write(
            libc::STDOUT_FILENO,
            MESSAGE.as_ptr() as *const libc::c_void,
            MESSAGE.len(),
        );
        libc::_exit(1);
    }
}

/// Installs the shell's handlers. Interrupted system calls are restarted.
pub fn install_handlers() -> Result<()> {
    let relay = SigAction::new(
        SigHandler::Handler(record_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for &sig in &RELAYED_SIGNALS {
        unsafe { signal::sigaction(sig, &relay) }
            .chain_err(|| format!("failed to install {} handler", sig))?;
    }

    let quit = SigAction::new(
        SigHandler::Handler(terminate_on_quit),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { signal::sigaction(Signal::SIGQUIT, &quit) }
        .chain_err(|| "failed to install SIGQUIT handler")?;

    debug!("signal handlers installed");
    Ok(())
}

/// Restores default dispositions for every signal the shell handles. Meant
/// for a freshly forked child before it replaces its image.
pub fn reset_handlers() -> Result<()> {
    for &sig in RELAYED_SIGNALS.iter().chain(iter::once(&Signal::SIGQUIT)) {
        unsafe { signal::signal(sig, SigHandler::SigDfl) }
            .chain_err(|| format!("failed to reset {} handler", sig))?;
    }
    Ok(())
}

/// RAII struct that blocks a set of signals and restores the previous signal
/// mask when dropped.
#[derive(Debug)]
pub struct SignalMask {
    blocked: SigSet,
    previous: SigSet,
}

impl SignalMask {
    pub fn block(signals: &[Signal]) -> Result<SignalMask> {
        let mut blocked = SigSet::empty();
        for &sig in signals {
            blocked.add(sig);
        }

        let mut previous = SigSet::empty();
        signal::sigprocmask(SigmaskHow::SIG_BLOCK, Some(&blocked), Some(&mut previous))
            .chain_err(|| "sigprocmask error")?;
        Ok(SignalMask { blocked, previous })
    }

    /// Atomically unblocks the masked signals and sleeps until one of them
    /// (or any other unblocked signal) has been handled. The mask is in
    /// force again when this returns.
    pub fn suspend(&self) {
        let mut waiting = self.previous;
        for sig in Signal::iterator().filter(|sig| self.blocked.contains(*sig)) {
            waiting.remove(sig);
        }
        // sigsuspend always returns -1 with EINTR once a handler has run
        unsafe {
            libc::sigsuspend(waiting.as_ref());
        }
    }
}

impl Drop for SignalMask {
    fn drop(&mut self) {
        let temp_result = signal::sigprocmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None);
        log_if_err!(temp_result, "failed to restore signal mask");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_events_iterate_in_drain_order() {
        let events = PendingEvents(SignalEvent::Suspend.bit() | SignalEvent::ChildStatus.bit());
        assert!(!events.is_empty());
        assert!(events.contains(SignalEvent::Suspend));
        assert!(!events.contains(SignalEvent::Interrupt));
        assert_eq!(
            events.iter().collect::<Vec<_>>(),
            vec![SignalEvent::ChildStatus, SignalEvent::Suspend]
        );
        assert!(PendingEvents::default().is_empty());
        assert_eq!(PendingEvents::default().iter().count(), 0);
    }

    #[test]
    fn test_recorded_signals_are_taken_once() {
        record_signal(libc::SIGINT);
        record_signal(libc::SIGINT);
        record_signal(libc::SIGCHLD);
        record_signal(libc::SIGUSR1);

        let events = take_pending();
        assert_eq!(
            events.iter().collect::<Vec<_>>(),
            vec![SignalEvent::ChildStatus, SignalEvent::Interrupt]
        );
        assert!(take_pending().is_empty());
    }
}
