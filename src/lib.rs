pub mod b2;
pub mod cli;
pub mod commands;
pub mod console;
pub mod paths;

pub use cli::{run, run_with, Cli, Commands};
