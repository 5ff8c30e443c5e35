//! Splits an input line into pipeline stages.
//!
//! The grammar is deliberately flat: tokens are runs of non-space characters,
//! stages are separated by `|`, and a trailing `&` detaches the last stage.
//! There is no quoting, escaping or expansion of any kind.

use crate::error::ParseError;

/// Token that asks for the last stage to run in the background.
pub const BACKGROUND_MARKER: &str = "&";

/// Separator between the stages of a pipeline.
pub const PIPE_DELIMITER: char = '|';

/// A single command within a pipeline together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stage {
    /// Head token of the stage. Empty for the no-op stage.
    pub command_name: String,
    /// Remaining tokens, in order.
    pub arguments: Vec<String>,
}

impl Stage {
    pub fn new(command_name: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            command_name: command_name.into(),
            arguments,
        }
    }

    /// `true` for the stage produced by an empty segment.
    pub fn is_noop(&self) -> bool {
        self.command_name.is_empty()
    }

    fn from_tokens(mut tokens: Vec<&str>) -> Self {
        if tokens.is_empty() {
            return Stage::default();
        }
        let arguments = tokens.split_off(1).into_iter().map(String::from).collect();
        Stage::new(tokens[0], arguments)
    }
}

/// A fully parsed line: the ordered stages of a pipeline and whether the
/// last one should be detached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Never empty.
    pub stages: Vec<Stage>,
    pub detach_last: bool,
}

/// Parses one line of input into a [`Statement`].
///
/// An empty line (or an empty segment between pipes) yields the no-op stage
/// rather than an error.
///
/// # Errors
///
/// [`ParseError::MisplacedBackground`] when `&` appears anywhere other than as
/// the last token of the last stage.
pub fn parse_statement(line: &str) -> Result<Statement, ParseError> {
    let segments: Vec<Vec<&str>> = line
        .split(PIPE_DELIMITER)
        .map(|segment| {
            segment
                .trim()
                .split(' ')
                .filter(|token| !token.is_empty())
                .collect()
        })
        .collect();

    let last_index = segments.len() - 1;
    let mut detach_last = false;
    let mut stages = Vec::with_capacity(segments.len());

    for (index, mut tokens) in segments.into_iter().enumerate() {
        if index == last_index && tokens.last() == Some(&BACKGROUND_MARKER) {
            tokens.pop();
            detach_last = true;
        }
        if tokens.contains(&BACKGROUND_MARKER) {
            return Err(ParseError::MisplacedBackground);
        }
        stages.push(Stage::from_tokens(tokens));
    }

    Ok(Statement {
        stages,
        detach_last,
    })
}
