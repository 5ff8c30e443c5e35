use std::io::{Read, Write};
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Abstraction over a readable input stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// Implementors typically wrap standard input or the read end of a pipe. A
/// blanket implementation exists for any type that implements `Read` and
/// `Into<Stdio>` (e.g. [`std::io::PipeReader`] or [`std::fs::File`]).
pub trait Stdin: Read {
    /// Convert this input into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Read + Into<Stdio>> Stdin for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// Abstraction over a writable output stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Write` and
/// `Into<Stdio>` (e.g. [`std::io::Stdout`] or [`std::io::PipeWriter`]).
pub trait Stdout: Write {
    /// Convert this output into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// The shell's own standard input.
///
/// Builtins read it directly; external children inherit the descriptor.
pub struct InheritedStdin;

impl Read for InheritedStdin {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::io::stdin().read(buf)
    }
}

impl Stdin for InheritedStdin {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// Input and output a statement is executed against: the first stage reads
/// `stdin` and the last stage writes `stdout`.
pub struct Streams {
    pub stdin: Box<dyn Stdin>,
    pub stdout: Box<dyn Stdout>,
}

impl Streams {
    pub fn new(stdin: impl Stdin + 'static, stdout: impl Stdout + 'static) -> Self {
        Self {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
        }
    }

    /// The streams the shell process itself was started with.
    pub fn inherited() -> Self {
        Self::new(InheritedStdin, std::io::stdout())
    }
}
