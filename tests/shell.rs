use minishell::command::Streams;
use minishell::{Interpreter, Outcome, ShellError};
use std::fs::File;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn capture(sh: &mut Interpreter, line: &str) -> (Result<Outcome, ShellError>, String) {
    let (mut reader, writer) = std::io::pipe().unwrap();
    let stdin = File::open("/dev/null").unwrap();
    let res = sh.execute_line(line, Streams::new(stdin, writer));
    let mut out = String::new();
    reader.read_to_string(&mut out).unwrap();
    (res, out)
}

fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}

#[test]
fn echo_pipe_cat_blocks_until_done() {
    let mut sh = Interpreter::new();
    let (res, out) = capture(&mut sh, "echo hello | cat");
    assert_eq!(res.unwrap(), Outcome::Completed(0));
    assert_eq!(out, "hello\n");
}

#[test]
fn large_output_flows_through_external_stages() {
    // More than a pipe buffer, so the stages have to run concurrently.
    let mut sh = Interpreter::new();
    let (res, out) = capture(&mut sh, "seq 1 50000 | cat | wc -l");
    assert_eq!(res.unwrap(), Outcome::Completed(0));
    assert_eq!(out.trim(), "50000");
}

#[test]
fn errors_do_not_poison_the_session() {
    let mut sh = Interpreter::new();

    let (res, _) = capture(&mut sh, "kill");
    assert!(matches!(res, Err(ShellError::ArgumentCount { .. })));

    let (res, _) = capture(&mut sh, "no_such_program_for_minishell_tests");
    assert!(matches!(res, Err(ShellError::NotFound(_))));

    let (res, out) = capture(&mut sh, "echo still alive");
    assert_eq!(res.unwrap(), Outcome::Completed(0));
    assert_eq!(out, "still alive\n");
}

#[test]
fn background_job_lifecycle() {
    let mut sh = Interpreter::new();

    let (_reader, writer) = std::io::pipe().unwrap();
    let res = sh.execute_line(
        "echo ignored | sleep 30 &",
        Streams::new(File::open("/dev/null").unwrap(), writer),
    );
    let Ok(Outcome::Detached { pid }) = res else {
        panic!("expected detached outcome, got {:?}", res);
    };
    assert!(sh.registry().contains(pid));

    let (_, listing) = capture(&mut sh, "ps");
    assert!(listing.starts_with("PID TIME NAME\n"));
    assert!(listing.contains(&format!("{pid} ")));

    let (res, _) = capture(&mut sh, &format!("kill {pid}"));
    assert_eq!(res.unwrap(), Outcome::Completed(0));

    let registry = sh.registry().clone();
    assert!(eventually(|| !registry.contains(pid)));

    let (_, listing) = capture(&mut sh, "ps");
    assert_eq!(listing, "PID TIME NAME\n");
}

#[test]
fn binary_runs_a_single_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_minishell"))
        .args(["-c", "echo one | tr a-z A-Z"])
        .stdin(Stdio::null())
        .output()
        .expect("run minishell");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "ONE\n");
}

#[test]
fn binary_reports_exit_code_of_last_stage() {
    let status = Command::new(env!("CARGO_BIN_EXE_minishell"))
        .args(["-c", "echo x | false"])
        .stdin(Stdio::null())
        .status()
        .expect("run minishell");
    assert_eq!(status.code(), Some(1));
}

#[test]
fn binary_reads_statements_until_exit() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_minishell"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("run minishell");

    let mut stdin = child.stdin.take().unwrap();
    stdin
        .write_all(b"echo first\nbogus_command_for_minishell\necho a & | cat\nexit\necho never\n")
        .unwrap();
    drop(stdin);

    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("first\n"));
    assert!(stdout.contains("bogus_command_for_minishell: command not found"));
    assert!(stdout.contains("background marker must be the last element of the last stage"));
    assert!(!stdout.contains("never"));
}
