pub mod commands;

pub use commands::{execute, Cli};
