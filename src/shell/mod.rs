pub use self::shell::{Shell, ShellConfig};

mod builtins;
mod execute_command;
mod job_control;
mod shell;
mod signals;
