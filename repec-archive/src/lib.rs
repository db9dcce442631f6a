pub mod cli;
pub mod content;
pub mod load_config;

pub use cli::{run, Cli, Commands};
