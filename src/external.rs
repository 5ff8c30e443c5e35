use crate::command::{ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::error::{Result, ShellError};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus};
use tracing::debug;

/// Command that is not a builtin.
///
/// Holds the name exactly as typed; the executable is looked up in `PATH`
/// only when the command is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    name: OsString,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: OsString, args: Vec<OsString>) -> Self {
        Self { name, args }
    }

    pub fn display_name(&self) -> String {
        self.name.to_string_lossy().into_owned()
    }

    /// Resolves the executable and starts it with the given streams attached.
    ///
    /// Returns as soon as the child is running. The parent's copies of the
    /// stream handles are closed before this returns, so a downstream reader
    /// sees EOF once the child exits.
    ///
    /// # Errors
    ///
    /// [`ShellError::NotFound`] if the executable does not exist, and
    /// [`ShellError::Os`] if the operating system refuses to start it.
    pub fn spawn(
        &self,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        env: &Environment,
    ) -> Result<Child> {
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let executable = find_command_path(OsStr::new(search_paths), Path::new(&self.name))
            .ok_or_else(|| self.not_found())?;

        let child = std::process::Command::new(&*executable)
            .args(&self.args)
            .stdin(stdin.stdio())
            .stdout(stdout.stdio())
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => self.not_found(),
                _ => ShellError::os(format!("{}: can't start", self.display_name()), e),
            })?;

        debug!(pid = child.id(), path = %executable.display(), "spawned");
        Ok(child)
    }

    fn not_found(&self) -> ShellError {
        ShellError::NotFound(format!("{}: command not found", self.display_name()))
    }
}

/// Converts a child's exit status into a shell exit code.
pub(crate) fn exit_code(exit_status: ExitStatus) -> ExitCode {
    match exit_status.code() {
        Some(x) => x,
        None => terminated_by_signal(exit_status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`): returns it if it exists.
/// - `./foo` on Unix or any `./`-prefixed path on other platforms: returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first existing match.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        // Single component -> search in PATH
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        // Multiple components -> relative to the current dir
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| path.exists())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{lock_current_dir, make_unique_temp_dir};
    use std::collections::HashMap;
    use std::fs;
    use std::fs::File;
    use std::io::Read;

    #[cfg(unix)]
    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    fn test_env() -> Environment {
        let mut vars = HashMap::new();
        vars.insert(
            "PATH".to_string(),
            std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string()),
        );
        Environment {
            vars,
            current_dir: std::env::temp_dir(),
            should_exit: false,
        }
    }

    fn external(name: &str, args: &[&str]) -> ExternalCommand {
        ExternalCommand::new(name.into(), args.iter().map(|x| x.into()).collect())
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing_true() {
        let path = Path::new("/bin/sh");
        let res = find_command_path(osstr("/bin"), path);
        assert!(res.is_some(), "Expected to find /bin/sh via absolute path");
        assert_eq!(res.unwrap().as_ref(), path);
    }

    #[test]
    #[cfg(unix)]
    fn absolute_nonexisting() {
        let path = Path::new("/bin/nonexisting");
        let res = find_command_path(osstr("/bin"), path);
        assert!(res.is_none());
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_path() {
        let res = find_command_path(osstr("/nonexistent_dir:/bin"), Path::new("sh"));
        let found = res.expect("Expected to find 'sh' in /bin via PATH search");
        assert!(found.as_ref().ends_with("sh"));
        assert!(found.as_ref().starts_with("/bin"));
    }

    #[test]
    #[cfg(unix)]
    fn single_component_not_found_in_path() {
        let res = find_command_path(osstr("/bin"), Path::new("nonexisting"));
        assert!(res.is_none());
    }

    #[test]
    #[cfg(unix)]
    fn absolute_nested_existing() {
        let tmp_base =
            std::env::temp_dir().join(format!("minishell_external_{}_mc", std::process::id()));
        let _ = fs::remove_dir_all(&tmp_base);
        fs::create_dir_all(tmp_base.join("bin")).expect("create temp bin dir");
        File::create(tmp_base.join("bin").join("sh")).expect("touch bin/sh");

        let nested = tmp_base.join("bin").join("sh");
        let res = find_command_path(osstr("/does/not/matter"), &nested);
        assert!(res.expect("Expected to find bin/sh").as_ref().ends_with("bin/sh"));

        let _ = fs::remove_dir_all(tmp_base);
    }

    #[test]
    #[cfg(unix)]
    fn relative_paths_resolve_against_current_dir() {
        let _lock = lock_current_dir();
        let tmp_base = make_unique_temp_dir("lookup").expect("create temp dir");
        fs::create_dir_all(tmp_base.join("bin")).expect("create temp bin dir");
        File::create(tmp_base.join("bin").join("tool")).expect("touch bin/tool");
        File::create(tmp_base.join("foo")).expect("touch foo");

        let cwd_before = std::env::current_dir().expect("get cwd");
        std::env::set_current_dir(&tmp_base).expect("set cwd");
        let dot_prefixed = find_command_path(osstr("/bin"), Path::new("./foo"));
        let nested = find_command_path(osstr("/bin"), Path::new("bin/tool"));
        let missing = find_command_path(osstr("/bin"), Path::new("./absent"));
        std::env::set_current_dir(&cwd_before).expect("restore cwd");
        let _ = fs::remove_dir_all(&tmp_base);

        let found = dot_prefixed.expect("Expected to find './foo' in current dir");
        assert_eq!(found.as_ref(), Path::new("./foo"));
        let found = nested.expect("Expected to find 'bin/tool' relative to current dir");
        assert_eq!(found.as_ref(), Path::new("bin/tool"));
        assert!(missing.is_none());
    }

    #[test]
    #[cfg(unix)]
    fn empty_path_is_none() {
        let res = find_command_path(osstr("/bin"), Path::new(""));
        assert!(res.is_none(), "Empty path should not resolve to anything");
    }

    #[test]
    #[cfg(unix)]
    fn spawn_missing_executable_is_not_found() {
        let (_reader, writer) = std::io::pipe().unwrap();
        let cmd = external("definitely_not_a_real_program_minishell", &[]);
        let res = cmd.spawn(
            Box::new(File::open("/dev/null").unwrap()),
            Box::new(writer),
            &test_env(),
        );
        assert!(matches!(res, Err(ShellError::NotFound(_))));
    }

    #[test]
    #[cfg(unix)]
    fn spawn_writes_into_the_given_stream_and_closes_it() {
        let (mut reader, writer) = std::io::pipe().unwrap();
        let cmd = external("echo", &["from", "child"]);
        let mut child = cmd
            .spawn(
                Box::new(File::open("/dev/null").unwrap()),
                Box::new(writer),
                &test_env(),
            )
            .unwrap();

        // Only the child holds the write end now, so this reaches EOF.
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "from child\n");
        assert_eq!(exit_code(child.wait().unwrap()), 0);
    }

    #[test]
    #[cfg(unix)]
    fn exit_code_of_failing_and_signalled_children() {
        let status = std::process::Command::new("false").status().unwrap();
        assert_eq!(exit_code(status), 1);

        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        child.kill().unwrap();
        assert_eq!(exit_code(child.wait().unwrap()), 128 + 9);
    }
}
