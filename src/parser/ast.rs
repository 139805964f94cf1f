/// A single command line, split into its arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    /// Command line as typed, used for messages and the job table
    pub input: String,
    pub argv: Vec<String>,
    /// Run the command in the background, defaults to false
    pub background: bool,
}

impl Command {
    /// Blank lines (and a lone `&`) have no arguments and run nothing.
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        if self.argv.is_empty() {
            &[]
        } else {
            &self.argv[1..]
        }
    }
}
