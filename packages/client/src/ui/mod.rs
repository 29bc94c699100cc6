//! Terminal user interface.

mod command;
mod render;
mod runner;

pub use command::{Command, CommandError};
pub use runner::{ClientError, run_client};
