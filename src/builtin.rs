use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::{Result, ShellError};
use crate::registry::ProcessRegistry;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Commands the shell runs in-process, without spawning a child.
///
/// Builtins run synchronously against the streams of their stage and always
/// run to completion once started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    /// The empty stage. Does nothing.
    Noop,
    /// Change the shell's working directory.
    Cd { target: PathBuf },
    /// Print the working directory.
    Pwd,
    /// Print the arguments separated by single spaces.
    Echo { args: Vec<String> },
    /// Send SIGKILL to a pid. `pid` is validated when the command runs.
    Kill { pid: String },
    /// List the tracked background processes.
    Ps,
    /// Leave the shell.
    Exit,
}

impl Builtin {
    /// Canonical name of the command, e.g. "echo" or "cd".
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Noop => "",
            Builtin::Cd { .. } => "cd",
            Builtin::Pwd => "pwd",
            Builtin::Echo { .. } => "echo",
            Builtin::Kill { .. } => "kill",
            Builtin::Ps => "ps",
            Builtin::Exit => "exit",
        }
    }

    /// Executes the command using provided IO streams and session state.
    ///
    /// Return value follows shell conventions: 0 for success. Failures are
    /// reported as errors so that the pipeline can stop.
    pub fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
        registry: &ProcessRegistry,
    ) -> Result<ExitCode> {
        let name = self.name();
        match self {
            Builtin::Noop => {}
            Builtin::Cd { target } => change_dir(target, env)?,
            Builtin::Pwd => {
                writeln!(stdout, "{}", env.current_dir.to_string_lossy())
                    .map_err(|e| write_failed(name, e))?;
            }
            Builtin::Echo { args } => {
                writeln!(stdout, "{}", args.join(" ")).map_err(|e| write_failed(name, e))?;
            }
            Builtin::Kill { pid } => kill(&pid)?,
            Builtin::Ps => list_processes(stdout, registry).map_err(|e| write_failed(name, e))?,
            Builtin::Exit => env.should_exit = true,
        }
        stdout.flush().map_err(|e| write_failed(name, e))?;
        Ok(0)
    }
}

fn write_failed(command: &str, source: io::Error) -> ShellError {
    ShellError::os(format!("{command}: write error"), source)
}

fn change_dir(target: PathBuf, env: &mut Environment) -> Result<()> {
    let new_dir = if target.is_absolute() {
        target
    } else {
        env.current_dir.join(target)
    };

    let canonical = fs::canonicalize(&new_dir)
        .map_err(|e| ShellError::os(format!("cd: can't resolve {}", new_dir.display()), e))?;

    env::set_current_dir(&canonical)
        .map_err(|e| ShellError::os(format!("cd: can't chdir to {}", canonical.display()), e))?;
    debug!(dir = %canonical.display(), "changed directory");
    env.current_dir = canonical;
    Ok(())
}

fn kill(raw_pid: &str) -> Result<()> {
    let pid = match raw_pid.parse::<i32>() {
        // 0 and negative values address process groups, not a single process.
        Ok(pid) if pid > 0 => pid,
        _ => return Err(ShellError::NotFound(format!("kill: {raw_pid}: invalid pid"))),
    };

    match signal::kill(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) => {
            debug!(pid, "sent SIGKILL");
            Ok(())
        }
        Err(Errno::ESRCH) => Err(ShellError::NotFound(format!(
            "kill: {pid}: no such process"
        ))),
        Err(errno) => Err(ShellError::os(format!("kill: {pid}"), errno.into())),
    }
}

fn list_processes(stdout: &mut dyn Write, registry: &ProcessRegistry) -> io::Result<()> {
    writeln!(stdout, "PID TIME NAME")?;
    for entry in registry.snapshot() {
        writeln!(
            stdout,
            "{} {} {}",
            entry.pid,
            format_elapsed(entry.elapsed),
            entry.name
        )?;
    }
    Ok(())
}

/// Renders an elapsed time at millisecond precision, e.g. `1.204s` or `15ms`.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    format!("{:?}", Duration::from_millis(millis))
}
