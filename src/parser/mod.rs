//! Tsh Parser
//!
//! Splits a command line into whitespace-delimited arguments. A token starting
//! with a single quote runs verbatim to the next single quote; there are no
//! escapes. A trailing `&` requests a background job.

use lalrpop_util::lalrpop_mod;

use crate::errors::{Error, Result};

pub use self::ast::Command;

mod ast;
lalrpop_mod!(
    #[allow(unused_qualifications, dead_code, clippy::all)]
    grammar,
    "/parser/grammar.rs"
);

const BACKGROUND_TOKEN: &str = "&";

impl Command {
    /// Parse `line` according to the tsh grammar. The trailing newline, if
    /// any, is not part of the command.
    pub fn parse(line: &str) -> Result<Command> {
        let input = line.trim_end_matches(&['\n', '\r'][..]);
        let mut argv = grammar::WordsParser::new()
            .parse(input)
            .map_err(|_| Error::syntax(input))?;

        let background = argv.last().map_or(false, |arg| arg.as_str() == BACKGROUND_TOKEN);
        if background {
            argv.pop();
        }

        Ok(Command {
            input: input.to_string(),
            argv,
            background,
        })
    }
}
