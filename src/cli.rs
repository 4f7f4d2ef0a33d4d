//! CLI domain: parse, route, and output only.
//! Every command goes through the [`crate::api::App`] facade.

mod output;
mod parse;
mod route;

pub use output::{format_event_line, format_tree, map_error};
pub use parse::{Cli, Commands};
pub use route::RunContext;
