pub mod commands;

pub use commands::{Cli, Commands, ExportArgs, run};
