//! Command-line interface module.

mod args;
pub mod decode;
pub mod watch;

pub use args::{Cli, Commands};
