//! Maps a parsed [`Stage`] onto the command that will run it.
//!
//! Resolution is pure: it validates argument counts for the builtins that
//! need them but never looks at the filesystem or starts a process. Finding
//! the executable behind an external name happens when it is spawned.

use crate::builtin::Builtin;
use crate::error::{ArgCountProblem, Result, ShellError};
use crate::external::ExternalCommand;
use crate::parser::Stage;
use std::path::PathBuf;

/// What a stage resolves to: something the shell runs itself, or a program
/// it has to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Builtin(Builtin),
    External(ExternalCommand),
}

/// Resolves the head token of `stage` to a [`Command`].
///
/// # Errors
///
/// [`ShellError::ArgumentCount`] when `cd` or `kill` get anything other than
/// exactly one argument.
pub fn resolve(stage: &Stage) -> Result<Command> {
    let arguments = &stage.arguments;
    let builtin = match stage.command_name.as_str() {
        "" => Builtin::Noop,
        "cd" => Builtin::Cd {
            target: PathBuf::from(single_argument("cd", arguments)?),
        },
        "pwd" => Builtin::Pwd,
        "echo" => Builtin::Echo {
            args: arguments.clone(),
        },
        "kill" => Builtin::Kill {
            pid: single_argument("kill", arguments)?,
        },
        "ps" => Builtin::Ps,
        "exit" => Builtin::Exit,
        name => {
            return Ok(Command::External(ExternalCommand::new(
                name.into(),
                arguments.iter().map(|x| x.into()).collect(),
            )));
        }
    };
    Ok(Command::Builtin(builtin))
}

fn single_argument(command: &'static str, arguments: &[String]) -> Result<String> {
    match arguments {
        [one] => Ok(one.clone()),
        [] => Err(ShellError::ArgumentCount {
            command,
            problem: ArgCountProblem::NotEnough,
        }),
        _ => Err(ShellError::ArgumentCount {
            command,
            problem: ArgCountProblem::TooMany,
        }),
    }
}
