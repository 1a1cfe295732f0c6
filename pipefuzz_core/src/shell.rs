use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

/// A target command wrapped in the host's command interpreter.
///
/// On Windows the command runs under `cmd.exe /c`, everywhere else under `sh -c`,
/// so the target string may use ordinary shell syntax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl ShellCommand {
    /// Wraps `command` for the platform this binary was built for.
    pub fn for_host(command: &str, working_dir: impl Into<PathBuf>) -> Self {
        let (program, flag) = if cfg!(windows) {
            ("cmd.exe", "/c")
        } else {
            ("sh", "-c")
        };
        Self {
            program: program.to_string(),
            args: vec![flag.to_string(), command.to_string()],
            working_dir: working_dir.into(),
        }
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.working_dir);
        cmd
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.argv().join(", "))
    }
}
