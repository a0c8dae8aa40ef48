use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::common::error::MvcError;
use crate::common::result::MvcResult;

/// A fully resolved command: program, arguments, and the directory to
/// run it in.
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The shell rendition shown to the user before the command runs.
    pub fn command_line(&self) -> String {
        format!(
            "  cd {}\n  {}",
            self.working_dir.display(),
            self.joined()
        )
    }

    fn joined(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed { exit_code: i32 },
    /// Killed by the watchdog. Output produced before the kill is still
    /// available.
    TimedOut,
}

/// Result of one command run: the outcome plus the combined stdout and
/// stderr text.
#[derive(Debug)]
pub struct CommandExecution {
    pub outcome: CommandOutcome,
    pub output: String,
}

impl CommandExecution {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, CommandOutcome::Completed { exit_code: 0 })
    }
}

/// Runs external version control commands with a per-command time limit.
pub struct CommandRunner {
    timeout: Duration,
}

/// How long to keep reading the pipes after a kill. Pipes inherited by
/// the command's own children stay open past the kill and never deliver
/// EOF.
const READER_GRACE: Duration = Duration::from_millis(200);

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run the command to completion, capturing stdout and stderr into
    /// one buffer. A command that outlives the time limit is killed, and
    /// whatever it wrote before dying is returned with a
    /// [`CommandOutcome::TimedOut`] outcome.
    pub async fn run(&self, invocation: &CommandInvocation) -> MvcResult<CommandExecution> {
        debug!(
            program = %invocation.program,
            working_dir = %invocation.working_dir.display(),
            "running command"
        );
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MvcError::launch(invocation.joined(), e))?;

        let stdout_buffer = Arc::new(Mutex::new(Vec::new()));
        let mut stdout_task = drain_into(child.stdout.take(), Arc::clone(&stdout_buffer));
        let stderr_buffer = Arc::new(Mutex::new(Vec::new()));
        let mut stderr_task = drain_into(child.stderr.take(), Arc::clone(&stderr_buffer));

        let outcome = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => {
                let status = status.map_err(|e| MvcError::launch(invocation.joined(), e))?;
                // The child has exited; the readers finish at pipe EOF.
                let _ = (&mut stdout_task).await;
                let _ = (&mut stderr_task).await;
                CommandOutcome::Completed {
                    exit_code: status.code().unwrap_or(-1),
                }
            }
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                // Killing the child does not close pipes its own children
                // inherited (ssh transports, submodule helpers), so the
                // readers may never see EOF. Keep whatever has arrived.
                for task in [&mut stdout_task, &mut stderr_task] {
                    if tokio::time::timeout(READER_GRACE, &mut *task).await.is_err() {
                        task.abort();
                    }
                }
                CommandOutcome::TimedOut
            }
        };

        let mut bytes = take_bytes(&stdout_buffer);
        bytes.extend(take_bytes(&stderr_buffer));
        Ok(CommandExecution {
            outcome,
            output: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Copy a pipe into a shared buffer from a background task, so a chatty
/// child cannot fill its pipe buffer and deadlock against wait(), and so
/// partial output survives an abandoned reader.
fn drain_into(
    reader: Option<impl AsyncRead + Unpin + Send + 'static>,
    buffer: Arc<Mutex<Vec<u8>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(mut reader) = reader else {
            return;
        };
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => lock(&buffer).extend_from_slice(&chunk[..n]),
            }
        }
    })
}

fn take_bytes(buffer: &Mutex<Vec<u8>>) -> Vec<u8> {
    std::mem::take(&mut *lock(buffer))
}

fn lock(buffer: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> CommandRunner {
        CommandRunner::new(Duration::from_secs(30))
    }

    fn invocation(program: &str) -> CommandInvocation {
        CommandInvocation::new(program, std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let inv = invocation("sh").arg("-c").arg("echo hello");
        let execution = runner().run(&inv).await.unwrap();
        assert_eq!(execution.outcome, CommandOutcome::Completed { exit_code: 0 });
        assert_eq!(execution.output, "hello\n");
        assert!(execution.succeeded());
    }

    #[tokio::test]
    async fn test_captures_stderr_and_exit_code() {
        let inv = invocation("sh").arg("-c").arg("echo bad >&2; exit 3");
        let execution = runner().run(&inv).await.unwrap();
        assert_eq!(execution.outcome, CommandOutcome::Completed { exit_code: 3 });
        assert!(execution.output.contains("bad"));
        assert!(!execution.succeeded());
    }

    #[tokio::test]
    async fn test_timeout_kills_but_keeps_partial_output() {
        let inv = invocation("sh").arg("-c").arg("echo started; exec sleep 30");
        let runner = CommandRunner::new(Duration::from_millis(300));
        let execution = runner.run(&inv).await.unwrap();
        assert_eq!(execution.outcome, CommandOutcome::TimedOut);
        assert!(execution.output.contains("started"));
    }

    #[tokio::test]
    async fn test_timeout_is_not_extended_by_a_child_holding_the_pipe() {
        // The backgrounded sleep inherits the output pipes and outlives
        // the kill, so the readers never see EOF.
        let inv = invocation("sh")
            .arg("-c")
            .arg("echo early; sleep 10 & exec sleep 60");
        let runner = CommandRunner::new(Duration::from_millis(300));
        let start = std::time::Instant::now();
        let execution = runner.run(&inv).await.unwrap();
        assert_eq!(execution.outcome, CommandOutcome::TimedOut);
        assert!(execution.output.contains("early"));
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "run returned only after {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_a_launch_error() {
        let inv = invocation("program-that-does-not-exist-anywhere");
        let err = runner().run(&inv).await.unwrap_err();
        assert!(matches!(err, MvcError::Launch { .. }));
    }

    #[test]
    fn test_command_line_rendition() {
        let inv = CommandInvocation::new("git", "/home/u/proj")
            .arg("pull")
            .arg("-q");
        assert_eq!(inv.command_line(), "  cd /home/u/proj\n  git pull -q");
    }
}
