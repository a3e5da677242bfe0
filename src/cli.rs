//! CLI domain: parse, route, and output only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod route;

pub use output::{map_error, CliError};
pub use parse::{Cli, Commands};
pub use route::{CommandOutput, RunContext};
