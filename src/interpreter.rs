use crate::command::Streams;
use crate::env::Environment;
use crate::error::Result;
use crate::parser::parse_statement;
use crate::pipeline::{self, Outcome};
use crate::registry::ProcessRegistry;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::Path;
use tracing::{debug, warn};

/// A minimal shell-like interpreter that runs pipelines of built-in and
/// external commands.
///
/// The interpreter owns the session [`Environment`] and the
/// [`ProcessRegistry`] of its background processes; two interpreters never
/// share either.
///
/// Example
/// ```
/// use minishell::{Interpreter, Outcome};
/// let mut sh = Interpreter::new();
/// let outcome = sh.run_line("echo hello world").unwrap();
/// assert_eq!(outcome, Outcome::Completed(0));
/// ```
pub struct Interpreter {
    env: Environment,
    registry: ProcessRegistry,
}

impl Interpreter {
    /// Create an interpreter for the current process environment.
    pub fn new() -> Self {
        Self::with_env(Environment::new())
    }

    pub fn with_env(env: Environment) -> Self {
        Self {
            env,
            registry: ProcessRegistry::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Background processes started by this interpreter that are still running.
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// `true` once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Parse and execute one line against the given streams.
    pub fn execute_line(&mut self, line: &str, streams: Streams) -> Result<Outcome> {
        let statement = parse_statement(line)?;
        debug!(stages = statement.stages.len(), detach = statement.detach_last, "parsed");
        pipeline::execute(statement, streams, &mut self.env, &self.registry)
    }

    /// Parse and execute one line against the shell's own stdin and stdout.
    pub fn run_line(&mut self, line: &str) -> Result<Outcome> {
        self.execute_line(line, Streams::inherited())
    }

    /// Interactive read-eval loop.
    ///
    /// Runs until `exit`, end of input, or a failure of the line editor.
    /// Errors from statements are printed and the loop goes on.
    pub fn repl(&mut self, history: Option<&Path>) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;
        if let Some(path) = history {
            if let Err(err) = rl.load_history(path) {
                debug!(path = %path.display(), error = %err, "no history loaded");
            }
        }

        while !self.should_exit() {
            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    match self.run_line(&line) {
                        Ok(Outcome::Detached { pid }) => println!("[{pid}]"),
                        Ok(Outcome::Completed(_)) => {}
                        Err(err) => println!("{err}"),
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        if let Some(path) = history {
            if let Err(err) = rl.save_history(path) {
                warn!(path = %path.display(), error = %err, "can't save history");
            }
        }
        Ok(())
    }

    fn prompt(&self) -> String {
        format!("{}> ", self.env.current_dir.display())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
