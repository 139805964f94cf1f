//! Tsh - Tiny Shell
//!
//! A small command line shell with job control: commands run in their own
//! process groups, in the foreground or the background, and keyboard
//! interrupts are relayed to the foreground job.

#![warn(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;

#[macro_use]
mod util;

pub mod errors;
pub mod job;
pub mod parser;
pub mod shell;

pub use crate::shell::{Shell, ShellConfig};
