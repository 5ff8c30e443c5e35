use minishell::config::ShellOptions;
use minishell::{Interpreter, Outcome};
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    let options: ShellOptions = argh::from_env();

    tracing_subscriber::fmt()
        .with_max_level(options.log_level())
        .with_writer(std::io::stderr)
        .init();

    let mut sh = Interpreter::new();

    if let Some(line) = &options.command {
        return Ok(match sh.run_line(line) {
            Ok(Outcome::Completed(code)) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
            Ok(Outcome::Detached { .. }) => ExitCode::SUCCESS,
            Err(err) => {
                println!("{err}");
                ExitCode::FAILURE
            }
        });
    }

    sh.repl(options.history.as_deref())?;
    Ok(ExitCode::SUCCESS)
}
