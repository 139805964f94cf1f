//! Error module. See the [error-chain](https://crates.io/crates/error-chain) crate for details.

error_chain! {
    foreign_links {
        Docopt(::docopt::Error);
        Io(::std::io::Error);
        Nix(::nix::Error);
    }

    errors {
        // Unparseable command line, e.g. an unterminated quote
        Syntax(line: String) {
            description("syntax error")
            display("syntax error: '{}'", line)
        }
        // Misuse of a builtin command; `code` is the status it finished with
        BuiltinCommand(message: String, code: i32) {
            description("builtin command error")
            display("{}", message)
        }
        CommandNotFound(command: String) {
            description("command not found")
            display("{}: Command not found", command)
        }
        // `%N` names no job in the job table
        NoSuchJob(job: String) {
            description("no such job")
            display("{}: No such job", job)
        }
        // A bare pid names no job in the job table
        NoSuchProcess(pid: String) {
            description("no such process")
            display("({}): No such process", pid)
        }
        TooManyJobs {
            description("job table is full")
            display("Tried to create too many jobs")
        }
    }
}

impl Error {
    /// User and launch errors are reported and the shell keeps going. All
    /// other errors come from OS calls the shell itself relies on and are
    /// fatal.
    pub fn is_recoverable(&self) -> bool {
        match *self.kind() {
            ErrorKind::Syntax(_)
            | ErrorKind::BuiltinCommand(..)
            | ErrorKind::CommandNotFound(_)
            | ErrorKind::NoSuchJob(_)
            | ErrorKind::NoSuchProcess(_)
            | ErrorKind::TooManyJobs => true,
            _ => false,
        }
    }

    /// The error followed by each of its causes, separated by `: `.
    pub fn chain_message(&self) -> String {
        self.iter()
            .map(|cause| cause.to_string())
            .collect::<Vec<_>>()
            .join(": ")
    }

    pub(crate) fn syntax<T: AsRef<str>>(line: T) -> Error {
        ErrorKind::Syntax(line.as_ref().to_string()).into()
    }

    pub(crate) fn builtin_command<T: AsRef<str>>(message: T, code: i32) -> Error {
        ErrorKind::BuiltinCommand(message.as_ref().to_string(), code).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_are_recoverable() {
        assert!(Error::syntax("echo 'oops").is_recoverable());
        assert!(Error::builtin_command("fg: bad", 1).is_recoverable());
        assert!(Error::from(ErrorKind::NoSuchJob("%3".into())).is_recoverable());
        assert!(Error::from(ErrorKind::TooManyJobs).is_recoverable());
    }

    #[test]
    fn test_os_errors_are_fatal() {
        let error = Error::from(nix::Error::EPERM);
        assert!(!error.is_recoverable());
        let error = Error::from("waitpid failed");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_chain_message_includes_causes() {
        let error = Error::with_chain(nix::Error::ECHILD, "waitpid error");
        assert_eq!(error.chain_message(), format!("waitpid error: {}", nix::Error::ECHILD));
        assert_eq!(Error::from(ErrorKind::TooManyJobs).chain_message(), "Tried to create too many jobs");
    }

    #[test]
    fn test_display_matches_shell_messages() {
        assert_eq!(
            Error::from(ErrorKind::NoSuchJob("%2".into())).to_string(),
            "%2: No such job"
        );
        assert_eq!(
            Error::from(ErrorKind::NoSuchProcess("42".into())).to_string(),
            "(42): No such process"
        );
        assert_eq!(
            Error::from(ErrorKind::CommandNotFound("nope".into())).to_string(),
            "nope: Command not found"
        );
    }
}
