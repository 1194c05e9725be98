// Command-line surface: argument parsing and subcommands.

pub mod args;

pub use args::{Cli, Commands, LogFormat, ProgressMode};
