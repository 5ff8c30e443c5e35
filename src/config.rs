use argh::FromArgs;
use std::path::PathBuf;
use tracing::Level;

#[derive(FromArgs, Debug)]
/// A minimal interactive shell with pipes and background processes.
pub struct ShellOptions {
    #[argh(option, short = 'c')]
    /// run a single statement and exit with its status instead of starting the prompt.
    pub command: Option<String>,

    #[argh(option)]
    /// file to load line history from on start and save it to on exit.
    pub history: Option<PathBuf>,

    #[argh(switch, short = 'v')]
    /// log debug diagnostics to standard error.
    pub verbose: bool,
}

impl ShellOptions {
    pub fn log_level(&self) -> Level {
        if self.verbose { Level::DEBUG } else { Level::INFO }
    }
}
