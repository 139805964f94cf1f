use std::io::Write;

use crate::errors::Result;
use crate::shell::builtins::{self, BuiltinCommand};
use crate::shell::Shell;

pub struct Quit;

impl BuiltinCommand for Quit {
    const NAME: &'static str = builtins::QUIT_NAME;

    const HELP: &'static str = "\
quit: quit
    Exit the shell with a status of 0. Arguments are ignored and jobs that
    are still running are left alone.";

    fn run<T: AsRef<str>>(shell: &mut Shell, _args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        shell.exit(0);
    }
}
