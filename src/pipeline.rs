//! Runs a parsed [`Statement`] as a pipeline of connected stages.
//!
//! Stages are started left to right. Every stage but the last writes into a
//! fresh OS pipe whose read end becomes the next stage's input; the first
//! stage reads the statement's input and the last writes its output.
//! Builtins run to completion in-process before the next stage starts. A
//! builtin feeding a pipe writes into memory first; a writer thread then
//! pushes that output into the pipe, so the builtin never blocks on a reader
//! that has not been started yet. External stages are spawned and waited for
//! once the whole pipeline is up.
//!
//! A detached final stage is spawned synchronously (so spawn errors reach the
//! caller), registered in the [`ProcessRegistry`], and handed to a watcher
//! thread that waits for it and removes it from the registry. The exit status
//! of a background process is discarded.

use crate::builtin::Builtin;
use crate::command::{ExitCode, Stdin, Stdout, Streams};
use crate::env::Environment;
use crate::error::{Result, ShellError};
use crate::external::exit_code;
use crate::parser::Statement;
use crate::registry::{ProcessRegistry, Registration};
use crate::resolver::{Command, resolve};
use std::io::{self, PipeWriter, Write};
use std::iter;
use std::process::Child;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};

/// How a statement ended, as far as the foreground is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every stage ran to completion. Holds the last stage's exit code.
    Completed(ExitCode),
    /// The last stage was started in the background.
    Detached { pid: u32 },
}

/// What starting a single stage produced.
enum Started {
    /// A builtin that has already finished.
    Finished(ExitCode),
    /// An external process that is still running.
    Spawned(Child),
}

/// Executes `statement` against `streams`.
///
/// Blocks until every stage has finished, except for a detached final
/// external stage, which is only started.
///
/// # Errors
///
/// The first stage that cannot be resolved or started stops the pipeline:
/// later stages are never started, and processes already started for earlier
/// stages are reaped in the background.
pub fn execute(
    statement: Statement,
    streams: Streams,
    env: &mut Environment,
    registry: &ProcessRegistry,
) -> Result<Outcome> {
    let Statement {
        stages,
        detach_last,
    } = statement;
    let Some((last_stage, leading)) = stages.split_last() else {
        return Ok(Outcome::Completed(0));
    };

    let mut input = streams.stdin;
    let mut children = Vec::new();

    for (index, stage) in leading.iter().enumerate() {
        let (reader, writer) = match io::pipe() {
            Ok(pair) => pair,
            Err(e) => return Err(abandon(children, ShellError::os("pipe", e))),
        };
        debug!(stage = index, command = %stage.command_name, "starting stage");
        let started = resolve(stage).and_then(|command| match command {
            Command::Builtin(builtin) => feed(builtin, input, writer, env, registry),
            external => start(external, input, Box::new(writer), env, registry),
        });
        match started {
            Ok(Started::Finished(_)) => {}
            Ok(Started::Spawned(child)) => children.push(child),
            Err(e) => return Err(abandon(children, e)),
        }
        // The stage owns the write end now; the next stage gets the read end.
        input = Box::new(reader);

        if env.should_exit {
            drop(input);
            abandon(children, ());
            return Ok(Outcome::Completed(0));
        }
    }

    debug!(
        stage = leading.len(),
        command = %last_stage.command_name,
        detach_last,
        "starting final stage"
    );
    let command = match resolve(last_stage) {
        Ok(command) => command,
        Err(e) => return Err(abandon(children, e)),
    };

    let command = match command {
        Command::External(external) if detach_last => {
            let name = external.display_name();
            let child = match external.spawn(input, streams.stdout, env) {
                Ok(child) => child,
                Err(e) => return Err(abandon(children, e)),
            };
            let pid = detach(child, name, children, registry)?;
            return Ok(Outcome::Detached { pid });
        }
        command => command,
    };
    if detach_last {
        debug!(
            command = %last_stage.command_name,
            "builtin cannot be detached, running in foreground"
        );
    }

    let final_code = match start(command, input, streams.stdout, env, registry) {
        Ok(Started::Finished(code)) => Some(code),
        Ok(Started::Spawned(child)) => {
            children.push(child);
            None
        }
        Err(e) => return Err(abandon(children, e)),
    };

    let last_child_code = wait_all(children)?;
    Ok(Outcome::Completed(
        final_code.or(last_child_code).unwrap_or_default(),
    ))
}

/// Runs a builtin or spawns an external command with the given streams.
///
/// Both streams are consumed, so the caller keeps no handle on the stage's
/// pipe ends.
fn start(
    command: Command,
    mut stdin: Box<dyn Stdin>,
    mut stdout: Box<dyn Stdout>,
    env: &mut Environment,
    registry: &ProcessRegistry,
) -> Result<Started> {
    match command {
        Command::Builtin(builtin) => builtin
            .execute(&mut stdin, &mut stdout, env, registry)
            .map(Started::Finished),
        Command::External(external) => external.spawn(stdin, stdout, env).map(Started::Spawned),
    }
}

/// Runs a builtin whose output goes into a pipe.
///
/// The builtin itself runs here, against the foreground environment; only
/// the delivery of its output is moved to a writer thread. That thread ends
/// once the output is written or the reading end is closed.
fn feed(
    builtin: Builtin,
    mut stdin: Box<dyn Stdin>,
    mut writer: PipeWriter,
    env: &mut Environment,
    registry: &ProcessRegistry,
) -> Result<Started> {
    let name = builtin.name();
    let mut output = Vec::new();
    let code = builtin.execute(&mut stdin, &mut output, env, registry)?;
    if output.is_empty() {
        return Ok(Started::Finished(code));
    }

    thread::Builder::new()
        .name(format!("feed-{name}"))
        .spawn(move || {
            // The reader may exit without draining the pipe.
            if let Err(e) = writer.write_all(&output) {
                debug!(command = name, error = %e, "builtin output not fully delivered");
            }
        })
        .map(|_| Started::Finished(code))
        .map_err(|e| ShellError::os(format!("{name}: can't start writer"), e))
}

/// Waits for every foreground child in order and returns the exit code of
/// the last one.
fn wait_all(children: Vec<Child>) -> Result<Option<ExitCode>> {
    let mut last = None;
    let mut children = children.into_iter();
    while let Some(mut child) = children.next() {
        let pid = child.id();
        match child.wait() {
            Ok(status) => {
                let code = exit_code(status);
                debug!(pid, code, "stage exited");
                last = Some(code);
            }
            Err(e) => {
                abandon(children.collect(), ());
                return Err(ShellError::os(format!("wait for {pid}"), e));
            }
        }
    }
    Ok(last)
}

/// Registers `child` and hands it to a watcher thread that unregisters it
/// once it exits. `upstream` are the still-running earlier stages of the same
/// pipeline; the watcher reaps them too but they are never registered.
///
/// If the watcher cannot be started, the registration is dropped and the
/// whole job is killed and reaped before the error is returned.
fn detach(
    child: Child,
    name: String,
    upstream: Vec<Child>,
    registry: &ProcessRegistry,
) -> Result<u32> {
    let pid = child.id();
    let registration = registry.register(pid, name.as_str());
    debug!(pid, name = %name, "registered background process");

    // The children cross over only once the watcher runs, so they stay here
    // if it never does.
    let (handoff, job) = mpsc::channel::<(Child, Vec<Child>)>();
    let watcher_registry = registry.clone();
    let spawned = thread::Builder::new()
        .name(format!("watch-{pid}"))
        .spawn(move || {
            if let Ok((child, upstream)) = job.recv() {
                watch(child, registration, upstream, watcher_registry);
            }
        });

    let (job, error) = match spawned {
        Ok(_) => match handoff.send((child, upstream)) {
            Ok(()) => return Ok(pid),
            Err(mpsc::SendError(job)) => (job, io::Error::other("watcher exited early")),
        },
        Err(e) => ((child, upstream), e),
    };
    registry.release(registration);
    let (child, upstream) = job;
    kill_and_reap(iter::once(child).chain(upstream));
    Err(ShellError::os(format!("{name}: can't start watcher"), error))
}

fn watch(
    mut child: Child,
    registration: Registration,
    upstream: Vec<Child>,
    registry: ProcessRegistry,
) {
    let pid = child.id();
    match child.wait() {
        // Background exit codes are discarded.
        Ok(status) => debug!(pid, code = exit_code(status), "background process exited"),
        Err(e) => warn!(pid, error = %e, "waiting for background process failed"),
    }
    registry.release(registration);
    reap(upstream);
}

/// Gives already-started children of an abandoned pipeline to a reaper
/// thread so the foreground never blocks on them, then passes `reason` back.
fn abandon<T>(children: Vec<Child>, reason: T) -> T {
    if children.is_empty() {
        return reason;
    }
    debug!(count = children.len(), "abandoning started stages");
    if let Err(e) = thread::Builder::new()
        .name("reaper".to_string())
        .spawn(move || reap(children))
    {
        warn!(error = %e, "can't start reaper thread");
    }
    reason
}

fn kill_and_reap(children: impl IntoIterator<Item = Child>) {
    for mut child in children {
        if let Err(e) = child.kill() {
            warn!(pid = child.id(), error = %e, "failed to kill child");
        }
        if let Err(e) = child.wait() {
            warn!(pid = child.id(), error = %e, "failed to reap child");
        }
    }
}

fn reap(children: Vec<Child>) {
    for mut child in children {
        if let Err(e) = child.wait() {
            warn!(pid = child.id(), error = %e, "failed to reap child");
        }
    }
}
