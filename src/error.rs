use std::fmt;
use std::io;

/// Errors produced while turning a line into a [`Statement`](crate::parser::Statement).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// `&` was found anywhere except as the very last token of the line.
    #[error("background marker must be the last element of the last stage")]
    MisplacedBackground,
}

/// Which side of the expected argument count a builtin invocation fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgCountProblem {
    NotEnough,
    TooMany,
}

impl fmt::Display for ArgCountProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgCountProblem::NotEnough => f.write_str("not enough arguments"),
            ArgCountProblem::TooMany => f.write_str("too many arguments"),
        }
    }
}

/// Everything that can go wrong while parsing or executing a statement.
///
/// None of these end the shell: the interactive loop prints them and reads
/// the next line.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The line could not be parsed; no stage was started.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A builtin was given the wrong number of arguments.
    #[error("{command}: {problem}")]
    ArgumentCount {
        command: &'static str,
        problem: ArgCountProblem,
    },

    /// An executable could not be found, or a pid does not name a process.
    #[error("{0}")]
    NotFound(String),

    /// The operating system refused a pipe, spawn, wait, signal or chdir.
    #[error("{context}: {source}")]
    Os {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ShellError {
    pub(crate) fn os(context: impl Into<String>, source: io::Error) -> Self {
        ShellError::Os {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = ShellError> = std::result::Result<T, E>;
