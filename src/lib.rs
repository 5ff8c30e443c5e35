//! A tiny interactive shell built around a pipeline executor.
//!
//! A line such as `echo hello | cat &` is parsed into a
//! [`Statement`](parser::Statement), each stage is resolved to a builtin
//! (`cd`, `pwd`, `echo`, `kill`, `ps`, `exit`) or an external program, and the
//! stages are connected with OS pipes. A trailing `&` starts the last stage in
//! the background and tracks it in a [`ProcessRegistry`] until it exits.
//!
//! The main entry point is [`Interpreter`], which owns the session state and
//! runs single lines or the interactive loop.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
mod interpreter;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod resolver;
#[cfg(test)]
mod test_util;

pub use builtin::Builtin;
pub use error::{ParseError, ShellError};
pub use external::{ExternalCommand, find_command_path};
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use pipeline::Outcome;
pub use registry::ProcessRegistry;
