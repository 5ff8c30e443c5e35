use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Per-session shell state touched only by the foreground path.
///
/// External children are spawned with `vars` as their environment and
/// `current_dir` as their working directory.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    /// Set by the `exit` builtin; the interpreter stops once it sees it.
    pub should_exit: bool,
}

impl Environment {
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
