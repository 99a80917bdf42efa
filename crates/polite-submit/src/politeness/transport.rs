use anyhow::Context;
use bstr::ByteSlice;
use std::fmt::{Display, Formatter};
use std::process::Output;
use tokio::process::Command;

use crate::politeness::PoliteResult;

/// Describes where Slurm commands are executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Run the commands on the local machine.
    Local,
    /// Run the commands on a remote host through `ssh <host> <command>`.
    Ssh { host: String },
}

impl Transport {
    pub fn new(host: Option<String>) -> Self {
        match host {
            Some(host) => Transport::Ssh { host },
            None => Transport::Local,
        }
    }

    pub fn create_command(&self, arguments: &[String]) -> Command {
        let mut command = match self {
            Transport::Local => {
                let mut command = Command::new(&arguments[0]);
                command.args(&arguments[1..]);
                command
            }
            Transport::Ssh { host } => {
                let mut command = Command::new("ssh");
                command.arg(host).arg(join_shell_args(arguments));
                command
            }
        };
        command.kill_on_drop(true);
        command
    }

    /// Textual form of the command line that would be executed for `arguments`.
    pub fn format_command(&self, arguments: &[String]) -> String {
        match self {
            Transport::Local => join_shell_args(arguments),
            Transport::Ssh { host } => format!("ssh {host} {}", join_shell_args(arguments)),
        }
    }

    /// Runs the command and returns its trimmed stdout.
    /// Fails if the command cannot be started or if it exits with a non-zero exit code.
    pub async fn run(&self, arguments: Vec<String>) -> PoliteResult<String> {
        let program = arguments
            .first()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Cannot run an empty command"))?;
        log::debug!("Running command `{}`", self.format_command(&arguments));

        let mut command = self.create_command(&arguments);
        let output = command
            .output()
            .await
            .with_context(|| format!("{program} start failed"))?;
        let output =
            check_command_output(output).with_context(|| format!("{program} execution failed"))?;
        let output = output
            .stdout
            .to_str()
            .map_err(|e| anyhow::anyhow!("Invalid UTF-8 {} output: {:?}", program, e))?
            .trim();
        Ok(output.to_string())
    }
}

impl Display for Transport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Local => f.write_str("local"),
            Transport::Ssh { host } => write!(f, "ssh://{host}"),
        }
    }
}

pub fn check_command_output(output: Output) -> PoliteResult<Output> {
    let status = output.status;
    if !status.success() {
        return Err(anyhow::anyhow!(
            "Exit code: {}\nStderr: {}\nStdout: {}",
            status.code().unwrap_or(-1),
            output.stderr.to_str_lossy().trim(),
            output.stdout.to_str_lossy().trim()
        ));
    }
    Ok(output)
}

/// Joins arguments into a single shell command line, quoting them where necessary.
fn join_shell_args(arguments: &[String]) -> String {
    arguments
        .iter()
        .map(|arg| quote_shell_arg(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_shell_arg(arg: &str) -> String {
    let is_plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=/.,:@%+".contains(c));
    if is_plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
