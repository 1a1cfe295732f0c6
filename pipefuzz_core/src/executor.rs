use crate::input::Input;
use crate::shell::ShellCommand;
use log::{debug, warn};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often a running target is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Size of each read the output thread forwards.
const READ_CHUNK: usize = 64 * 1024;

/// How a single run of the target ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    /// The target terminated with this exit status. A target killed by a
    /// signal reports `128 + signal`, as a shell would.
    Exited(i32),
    /// The target outlived the configured timeout and was killed.
    TimedOut,
}

/// Result of feeding one candidate to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub outcome: RunOutcome,
    /// Combined stdout and stderr, one `\n`-terminated entry per line.
    /// Empty for timed-out runs.
    pub output: String,
}

impl RunResult {
    pub fn exited(code: i32, output: impl Into<String>) -> Self {
        Self {
            outcome: RunOutcome::Exited(code),
            output: output.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            outcome: RunOutcome::TimedOut,
            output: String::new(),
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.outcome {
            RunOutcome::Exited(code) => Some(code),
            RunOutcome::TimedOut => None,
        }
    }
}

/// Failures that prevent a single run from producing a [`RunResult`].
///
/// These are per-candidate problems; a campaign logs them and moves on.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to create output pipe: {0}")]
    Pipe(#[source] io::Error),
    #[error("Failed to spawn command {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Child stdin was not available after piping")]
    StdinUnavailable,
    #[error("Failed to write to child stdin: {0}")]
    StdinWrite(#[source] io::Error),
    #[error("Error waiting for child: {0}")]
    Wait(#[source] io::Error),
    #[error("Failed to kill timed-out process: {0}")]
    Kill(#[source] io::Error),
    #[error("Failed to read child output: {0}")]
    OutputRead(#[source] io::Error),
    #[error("The {0} thread panicked")]
    ThreadPanicked(&'static str),
}

/// An `Executor` runs the target once per input.
pub trait Executor<I: Input> {
    fn execute(&mut self, input: &I) -> Result<RunResult, ExecutorError>;
}

pub struct CommandExecutorConfig {
    pub shell: ShellCommand,
    /// `None` waits for the target indefinitely.
    pub timeout: Option<Duration>,
}

/// Runs the target as a fresh child process for every input.
///
/// The payload is written to the child's stdin, which is then closed. Stdout
/// and stderr share one pipe that a reader thread drains while the child runs,
/// so a chatty target cannot block on a full pipe buffer.
///
/// The timeout bounds the whole run, including collecting output after the
/// target exits. A background process the target leaves behind can hold the
/// pipes open past that point; its output is then cut off at the deadline, and
/// the helper threads finish once that process closes the pipes.
pub struct CommandExecutor {
    config: CommandExecutorConfig,
}

/// Owns a spawned child and makes sure it is killed and reaped on every path.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn wait(&mut self, deadline: Option<Instant>) -> Result<Option<ExitStatus>, ExecutorError> {
        let Some(deadline) = deadline else {
            let status = self.child.wait().map_err(ExecutorError::Wait)?;
            self.reaped = true;
            return Ok(Some(status));
        };

        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    self.reaped = true;
                    return Ok(Some(status));
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!("Target timed out, killing pid {}...", self.child.id());
                        self.child.kill().map_err(ExecutorError::Kill)?;
                        self.child.wait().map_err(ExecutorError::Wait)?;
                        self.reaped = true;
                        return Ok(None);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(ExecutorError::Wait(e)),
            }
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl CommandExecutor {
    pub fn new(config: CommandExecutorConfig) -> Self {
        Self { config }
    }

    pub fn shell(&self) -> &ShellCommand {
        &self.config.shell
    }

    fn spawn(&self) -> Result<(ChildGuard, io::PipeReader), ExecutorError> {
        let (reader, writer) = io::pipe().map_err(ExecutorError::Pipe)?;
        let stderr_writer = writer.try_clone().map_err(ExecutorError::Pipe)?;

        let mut cmd = self.config.shell.to_command();
        cmd.stdin(Stdio::piped())
            .stdout(writer)
            .stderr(stderr_writer);

        let spawned = cmd.spawn();
        // The command holds our copies of the write end; the reader only sees
        // EOF once they are gone.
        drop(cmd);

        let child = spawned.map_err(|source| ExecutorError::Spawn {
            command: self.config.shell.to_string(),
            source,
        })?;
        debug!("Spawned target pid {}", child.id());
        Ok((ChildGuard::new(child), reader))
    }
}

/// Waits for the next message on `rx`, giving up at `deadline`.
fn recv_until<T>(rx: &Receiver<T>, deadline: Option<Instant>) -> Result<T, RecvTimeoutError> {
    match deadline {
        Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    }
}

/// Forwards everything read from `reader` in chunks until EOF.
///
/// Stops early once the receiving side has gone away.
fn spawn_output_reader(
    mut reader: io::PipeReader,
) -> (JoinHandle<()>, Receiver<io::Result<Vec<u8>>>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let chunk = match reader.read(&mut buf) {
                Ok(0) => return,
                Ok(n) => Ok(buf[..n].to_vec()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
            let failed = chunk.is_err();
            if tx.send(chunk).is_err() || failed {
                return;
            }
        }
    });
    (handle, rx)
}

/// Collects output chunks until the reader reaches EOF or `deadline` passes.
///
/// Returns the bytes read and whether the stream was complete.
fn collect_output(
    handle: JoinHandle<()>,
    rx: &Receiver<io::Result<Vec<u8>>>,
    deadline: Option<Instant>,
) -> Result<(Vec<u8>, bool), ExecutorError> {
    let mut captured = Vec::new();
    loop {
        match recv_until(rx, deadline) {
            Ok(chunk) => captured.extend(chunk.map_err(ExecutorError::OutputRead)?),
            Err(RecvTimeoutError::Timeout) => return Ok((captured, false)),
            Err(RecvTimeoutError::Disconnected) => {
                handle
                    .join()
                    .map_err(|_| ExecutorError::ThreadPanicked("output reader"))?;
                return Ok((captured, true));
            }
        }
    }
}

impl<I: Input> Executor<I> for CommandExecutor {
    fn execute(&mut self, input: &I) -> Result<RunResult, ExecutorError> {
        let (mut guard, reader) = self.spawn()?;
        let deadline = self.config.timeout.map(|timeout| Instant::now() + timeout);

        let (output_thread, output_rx) = spawn_output_reader(reader);

        let mut stdin = guard
            .child
            .stdin
            .take()
            .ok_or(ExecutorError::StdinUnavailable)?;
        let payload = input.as_bytes().to_vec();
        let (stdin_tx, stdin_rx) = mpsc::channel();
        thread::spawn(move || {
            let written = stdin.write_all(&payload).and_then(|()| stdin.flush());
            // closes the child's input
            drop(stdin);
            let _ = stdin_tx.send(written);
        });

        let Some(status) = guard.wait(deadline)? else {
            // Dropping the receivers lets the helper threads exit as soon as
            // their pipes close.
            return Ok(RunResult::timed_out());
        };

        match recv_until(&stdin_rx, deadline) {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!("Target exited before consuming all of its input");
            }
            Ok(Err(e)) => return Err(ExecutorError::StdinWrite(e)),
            Err(RecvTimeoutError::Timeout) => {
                warn!("Input was not fully consumed before the deadline");
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ExecutorError::ThreadPanicked("stdin writer"));
            }
        }

        let (captured, complete) = collect_output(output_thread, &output_rx, deadline)?;
        if !complete {
            warn!(
                "Target exited but its output pipe is still held open, keeping the first {} bytes",
                captured.len()
            );
        }

        Ok(RunResult::exited(
            exit_code_of(&status),
            decode_output(&captured),
        ))
    }
}

fn exit_code_of(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Decodes captured bytes as text, normalising every line ending to `\n`.
pub fn decode_output(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .flat_map(|line| [line, "\n"])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_output_terminates_every_line() {
        assert_eq!(decode_output(b""), "");
        assert_eq!(decode_output(b"bad"), "bad\n");
        assert_eq!(decode_output(b"a\r\nb\n"), "a\nb\n");
        assert_eq!(decode_output(b"one\n\ntwo"), "one\n\ntwo\n");
    }

    #[test]
    fn decode_output_is_lossy_for_invalid_utf8() {
        assert_eq!(decode_output(&[b'a', 0xFF, b'\n']), "a\u{FFFD}\n");
    }

    #[test]
    fn run_result_exit_code() {
        assert_eq!(RunResult::exited(3, "x").exit_code(), Some(3));
        assert_eq!(RunResult::timed_out().exit_code(), None);
    }
}
