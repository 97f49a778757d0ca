//! Plan execution: shell steps, then file steps.
//!
//! Shell steps run one at a time and the first non-zero exit code stops the
//! plan. File steps each report their own result and never stop siblings.

use crate::agent::{AgentCallback, MessageLevel};
use crate::error::AgentError;
use crate::types::{Plan, Step};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Runs one shell command, streaming its output through the callback.
#[async_trait]
pub trait ShellRunner: Send + Sync {
    /// Execute `command` and return its exit code.
    async fn exec(&self, command: &str, callback: &dyn AgentCallback) -> Result<i32, AgentError>;
}

/// Executes commands with the platform shell.
///
/// stdout and stderr are merged line by line in arrival order. Ctrl-C kills
/// the child and reports [`AgentError::Cancelled`].
#[derive(Debug, Clone)]
pub struct SystemShellRunner {
    working_dir: PathBuf,
}

impl SystemShellRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };
        cmd.current_dir(&self.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

fn forward_lines<R>(pipe: Option<R>, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    if let Some(pipe) = pipe {
        tokio::spawn(async move {
            // Raw bytes so invalid UTF-8 is replaced instead of ending the stream.
            let mut reader = BufReader::new(pipe);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(['\r', '\n']).to_string();
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "Output pipe read failed");
                        break;
                    }
                }
            }
        });
    }
}

#[async_trait]
impl ShellRunner for SystemShellRunner {
    async fn exec(&self, command: &str, callback: &dyn AgentCallback) -> Result<i32, AgentError> {
        debug!(command, cwd = %self.working_dir.display(), "Spawning shell command");

        let mut child = self
            .command(command)
            .spawn()
            .map_err(|e| AgentError::SpawnFailed {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        forward_lines(child.stdout.take(), tx.clone());
        forward_lines(child.stderr.take(), tx);

        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        loop {
            tokio::select! {
                line = rx.recv() => match line {
                    Some(line) => callback.on_output_line(&line).await,
                    None => break,
                },
                _ = &mut interrupt => {
                    warn!(command, "Interrupted; killing child process");
                    let _ = child.kill().await;
                    return Err(AgentError::Cancelled);
                }
            }
        }

        let status = tokio::select! {
            status = child.wait() => status.map_err(|e| AgentError::SpawnFailed {
                command: command.to_string(),
                message: format!("Failed to wait for command: {e}"),
            })?,
            _ = &mut interrupt => {
                let _ = child.kill().await;
                return Err(AgentError::Cancelled);
            }
        };

        let exit_code = status.code().unwrap_or(-1);
        if exit_code != 0 {
            warn!(command, exit_code, "Command exited with non-zero status");
        }
        Ok(exit_code)
    }
}

type CommandHook = Box<dyn Fn() + Send + Sync>;

/// A scripted shell for tests.
///
/// Records every command. Exit codes come from a queue (0 once it is empty);
/// hooks run when a matching command executes.
#[derive(Default)]
pub struct MockShellRunner {
    commands: Mutex<Vec<String>>,
    exit_codes: Mutex<VecDeque<i32>>,
    hooks: Vec<(String, CommandHook)>,
    cancel_on: Option<String>,
}

impl MockShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit codes for successive commands, in order.
    pub fn with_exit_codes(self, codes: impl IntoIterator<Item = i32>) -> Self {
        *self.exit_codes.lock().unwrap() = codes.into_iter().collect();
        self
    }

    /// Run `hook` whenever `command` executes.
    pub fn on_command(mut self, command: &str, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hooks.push((command.to_string(), Box::new(hook)));
        self
    }

    /// Report a user interrupt when `command` executes.
    pub fn cancel_on(mut self, command: &str) -> Self {
        self.cancel_on = Some(command.to_string());
        self
    }

    /// Commands executed so far.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShellRunner for MockShellRunner {
    async fn exec(&self, command: &str, callback: &dyn AgentCallback) -> Result<i32, AgentError> {
        self.commands.lock().unwrap().push(command.to_string());
        if self.cancel_on.as_deref() == Some(command) {
            return Err(AgentError::Cancelled);
        }
        for (_, hook) in self.hooks.iter().filter(|(c, _)| c == command) {
            hook();
        }
        callback.on_output_line(&format!("mock: {command}")).await;
        Ok(self.exit_codes.lock().unwrap().pop_front().unwrap_or(0))
    }
}

/// Failure to write one file step.
#[derive(Debug, thiserror::Error)]
pub enum FileWriteError {
    #[error("could not create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result of one file step.
#[derive(Debug)]
pub struct FileOutcome {
    /// The path as written in the plan.
    pub path: String,
    pub error: Option<FileWriteError>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Resolve a plan path against the workspace.
pub fn resolve_path(workspace: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        workspace.join(candidate)
    }
}

/// Write `content` to `path`, creating parent directories. Existing files are overwritten.
pub async fn create_file(
    workspace: &Path,
    path: &str,
    content: &str,
) -> Result<PathBuf, FileWriteError> {
    let target = resolve_path(workspace, path);
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| FileWriteError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(&target, content)
        .await
        .map_err(|source| FileWriteError::Write {
            path: target.clone(),
            source,
        })?;
    Ok(target)
}

/// Runs a plan's steps against a shell and a workspace directory.
pub struct PlanExecutor<'a> {
    shell: &'a dyn ShellRunner,
    workspace: &'a Path,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(shell: &'a dyn ShellRunner, workspace: &'a Path) -> Self {
        Self { shell, workspace }
    }

    /// Run every shell step in order.
    ///
    /// Returns the commands that succeeded. On failure the error comes back
    /// with the commands that succeeded before it.
    pub async fn run_shell_steps(
        &self,
        plan: &Plan,
        callback: &dyn AgentCallback,
    ) -> Result<Vec<String>, (AgentError, Vec<String>)> {
        let mut executed = Vec::new();
        callback
            .on_message(MessageLevel::Info, "Executing plan...")
            .await;

        for step in &plan.steps {
            let Step::Shell { command } = step else {
                continue;
            };
            callback.on_step_start(step).await;
            callback
                .on_message(MessageLevel::Info, &format!("Executing: {command}"))
                .await;

            match self.shell.exec(command, callback).await {
                Ok(0) => {
                    callback
                        .on_message(MessageLevel::Success, "Command finished successfully")
                        .await;
                    executed.push(command.clone());
                }
                Ok(exit_code) => {
                    callback
                        .on_message(
                            MessageLevel::Error,
                            &format!("Command failed with exit code {exit_code}"),
                        )
                        .await;
                    let err = AgentError::CommandFailed {
                        command: command.clone(),
                        exit_code,
                    };
                    return Err((err, executed));
                }
                Err(e) => {
                    if e.is_cancellation() {
                        callback
                            .on_message(MessageLevel::Warning, "Execution cancelled.")
                            .await;
                    }
                    return Err((e, executed));
                }
            }
        }

        Ok(executed)
    }

    /// Write every file step in order, reporting each one.
    pub async fn write_files(&self, plan: &Plan, callback: &dyn AgentCallback) -> Vec<FileOutcome> {
        let mut outcomes = Vec::new();
        for step in &plan.steps {
            let Step::File { path, content } = step else {
                continue;
            };
            callback.on_step_start(step).await;
            match create_file(self.workspace, path, content).await {
                Ok(written) => {
                    info!(path = %written.display(), bytes = content.len(), "File created");
                    callback
                        .on_message(MessageLevel::Success, &format!("Created file: {path}"))
                        .await;
                    outcomes.push(FileOutcome {
                        path: path.clone(),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(path = path.as_str(), error = %e, "File step failed");
                    callback
                        .on_message(
                            MessageLevel::Error,
                            &format!("Failed to create file {path}: {e}"),
                        )
                        .await;
                    outcomes.push(FileOutcome {
                        path: path.clone(),
                        error: Some(e),
                    });
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RecordingCallback;
    use crate::plan::extract_plan;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_system_runner_streams_merged_output() {
        if cfg!(windows) {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = SystemShellRunner::new(dir.path());
        let callback = RecordingCallback::new();

        let code = runner
            .exec("echo out; echo err 1>&2", &callback)
            .await
            .unwrap();

        assert_eq!(code, 0);
        let mut lines = callback.output_lines();
        lines.sort();
        assert_eq!(lines, vec!["err".to_string(), "out".to_string()]);
    }

    #[tokio::test]
    async fn test_system_runner_survives_invalid_utf8_output() {
        if cfg!(windows) {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = SystemShellRunner::new(dir.path());
        let callback = RecordingCallback::new();

        let code = runner
            .exec("printf 'caf\\351\\n'; seq 1 200000; echo done", &callback)
            .await
            .unwrap();

        assert_eq!(code, 0);
        let lines = callback.output_lines();
        assert_eq!(lines.len(), 200_002);
        assert_eq!(lines[0], "caf\u{FFFD}");
        assert_eq!(lines.last().map(String::as_str), Some("done"));
    }

    #[tokio::test]
    async fn test_system_runner_reports_exit_code_and_cwd() {
        if cfg!(windows) {
            return;
        }
        let dir = TempDir::new().unwrap();
        let runner = SystemShellRunner::new(dir.path());
        let callback = RecordingCallback::new();

        assert_eq!(runner.exec("exit 3", &callback).await.unwrap(), 3);
        runner.exec("touch marker", &callback).await.unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_system_runner_spawn_failure() {
        let runner = SystemShellRunner::new("/definitely/not/a/dir/askit");
        let err = runner
            .exec("true", &RecordingCallback::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn test_first_failure_stops_remaining_shell_steps() {
        let dir = TempDir::new().unwrap();
        let shell = MockShellRunner::new().with_exit_codes([0, 2, 0]);
        let executor = PlanExecutor::new(&shell, dir.path());
        let plan = extract_plan("```bash\nfirst\nsecond\nthird\n```");
        let callback = RecordingCallback::new();

        let (err, executed) = executor
            .run_shell_steps(&plan, &callback)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AgentError::CommandFailed { ref command, exit_code: 2 } if command == "second"
        ));
        assert_eq!(executed, vec!["first".to_string()]);
        assert_eq!(shell.commands(), vec!["first".to_string(), "second".to_string()]);
        assert!(
            callback
                .messages_at(MessageLevel::Error)
                .contains(&"Command failed with exit code 2".to_string())
        );
    }

    #[tokio::test]
    async fn test_cancelled_command_reports_cancellation() {
        let dir = TempDir::new().unwrap();
        let shell = MockShellRunner::new().cancel_on("sleep 100");
        let executor = PlanExecutor::new(&shell, dir.path());
        let plan = extract_plan("```bash\nsleep 100\nls\n```");
        let callback = RecordingCallback::new();

        let (err, _) = executor
            .run_shell_steps(&plan, &callback)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert_eq!(shell.commands(), vec!["sleep 100".to_string()]);
        assert_eq!(
            callback.messages_at(MessageLevel::Warning),
            vec!["Execution cancelled.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_file_makes_parents_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let written = create_file(dir.path(), "a/b/c.txt", "one").await.unwrap();
        assert_eq!(written, dir.path().join("a/b/c.txt"));
        create_file(dir.path(), "a/b/c.txt", "two").await.unwrap();
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "two");
    }

    #[tokio::test]
    async fn test_file_failure_does_not_stop_siblings() {
        let dir = TempDir::new().unwrap();
        // A regular file where a directory is needed makes the first write fail.
        std::fs::write(dir.path().join("blocker"), "x").unwrap();
        let shell = MockShellRunner::new();
        let executor = PlanExecutor::new(&shell, dir.path());
        let plan = extract_plan(
            "FILE: blocker/inner.txt\n```\nnope\n```\nFILE: ok.txt\n```\nfine\n```",
        );
        let callback = RecordingCallback::new();

        let outcomes = executor.write_files(&plan, &callback).await;

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].is_ok());
        assert!(outcomes[1].is_ok());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("ok.txt")).unwrap(),
            "fine"
        );
        assert_eq!(
            callback.messages_at(MessageLevel::Success),
            vec!["Created file: ok.txt".to_string()]
        );
    }

    #[test]
    fn test_resolve_path_keeps_absolute_paths() {
        let ws = Path::new("/work");
        assert_eq!(resolve_path(ws, "x/y"), PathBuf::from("/work/x/y"));
        if cfg!(unix) {
            assert_eq!(resolve_path(ws, "/tmp/z"), PathBuf::from("/tmp/z"));
        }
    }
}
