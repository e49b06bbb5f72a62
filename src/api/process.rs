use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::models::ShellCommand;
use crate::domain::{AppError, Result};
use crate::logging::Logger;

/// Run `command` through `sh`, sending every output line to the log.
pub async fn run(command: impl Into<ShellCommand>, logger: &Logger) -> Result<i32> {
    run_with(command, |line| logger.log(line)).await
}

/// Run `command` through `sh` and hand each output line to `on_line`.
///
/// stderr is folded into stdout. Lines arrive without their terminator and are
/// decoded lossily. Returns once the output is drained and the child reaped.
pub async fn run_with<F>(command: impl Into<ShellCommand>, mut on_line: F) -> Result<i32>
where
    F: FnMut(&str),
{
    let command = command.into();
    tracing::debug!("spawning: {}", command.command);

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(format!("exec 2>&1\n{}", command.command))
        .envs(command.env.iter().map(|(k, v)| (k, v)))
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Io(std::io::Error::other("child stdout not captured")))?;
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let decoded = String::from_utf8_lossy(&buf);
        let line: &str = &decoded;
        on_line(line.strip_suffix('\n').unwrap_or(line));
    }

    let status = child.wait().await?;
    let code = exit_code(status);
    tracing::debug!("'{}' exited with {}", command.command, code);
    Ok(code)
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
