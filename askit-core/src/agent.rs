//! Agent orchestrator — runs an AGENT-confidence explanation as a plan.
//!
//! One invocation walks a fixed phase sequence:
//!
//! ```text
//! CollectInput -> PreflightCheck -> ExecShellSteps -> ExecFileSteps -> Done
//! ```
//!
//! `PreflightCheck` and `ExecShellSteps` may end the run in `Aborted`; any
//! interrupted prompt or command ends it in `Cancelled`. All console output
//! and user interaction flows through the [`AgentCallback`] passed in.

use crate::brain::LlmProvider;
use crate::error::AgentError;
use crate::executor::{FileOutcome, PlanExecutor, ShellRunner};
use crate::input::collect_inputs;
use crate::plan::extract_plan;
use crate::preflight::{PreflightChecker, ToolLocator};
use crate::types::{OsFamily, Step};
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Phases of one agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    CollectInput,
    PreflightCheck,
    ExecShellSteps,
    ExecFileSteps,
    Done,
    Aborted,
    Cancelled,
}

impl AgentPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentPhase::Done | AgentPhase::Aborted | AgentPhase::Cancelled
        )
    }
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentPhase::CollectInput => "collect_input",
            AgentPhase::PreflightCheck => "preflight_check",
            AgentPhase::ExecShellSteps => "exec_shell_steps",
            AgentPhase::ExecFileSteps => "exec_file_steps",
            AgentPhase::Done => "done",
            AgentPhase::Aborted => "aborted",
            AgentPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Severity/style of a console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    /// Section headings and plain information.
    Info,
    /// Secondary, dimmed detail.
    Detail,
    Success,
    Warning,
    Error,
}

/// Output sink and interaction surface for the agent.
#[async_trait::async_trait]
pub trait AgentCallback: Send + Sync {
    /// Display a message to the user.
    async fn on_message(&self, level: MessageLevel, message: &str);

    /// Display one line of command output (stdout and stderr merged).
    async fn on_output_line(&self, line: &str);

    /// Ask the user a free-text question.
    async fn ask_input(&self, question: &str) -> Result<String, AgentError>;

    /// Ask the user a yes/no question.
    async fn confirm(&self, question: &str, default: bool) -> Result<bool, AgentError>;

    /// Notify about a phase transition. Default is a no-op.
    async fn on_phase_change(&self, _phase: AgentPhase) {}

    /// Notify that a plan step is about to run. Default is a no-op.
    async fn on_step_start(&self, _step: &Step) {}
}

/// A callback that discards output and accepts every default.
pub struct NoOpCallback;

#[async_trait::async_trait]
impl AgentCallback for NoOpCallback {
    async fn on_message(&self, _level: MessageLevel, _message: &str) {}
    async fn on_output_line(&self, _line: &str) {}
    async fn ask_input(&self, _question: &str) -> Result<String, AgentError> {
        Ok(String::new())
    }
    async fn confirm(&self, _question: &str, default: bool) -> Result<bool, AgentError> {
        Ok(default)
    }
}

/// A callback that records all events for test assertions.
///
/// Answers come from scripted queues. An exhausted answer queue reports a
/// cancellation; an exhausted confirmation queue accepts the default. A
/// `None` confirmation behaves like an interrupted prompt.
#[derive(Default)]
pub struct RecordingCallback {
    answers: Mutex<VecDeque<String>>,
    confirmations: Mutex<VecDeque<Option<bool>>>,
    messages: Mutex<Vec<(MessageLevel, String)>>,
    output_lines: Mutex<Vec<String>>,
    questions: Mutex<Vec<String>>,
    confirm_prompts: Mutex<Vec<String>>,
    phases: Mutex<Vec<AgentPhase>>,
    steps: Mutex<Vec<Step>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers<I, S>(self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.answers
            .lock()
            .unwrap()
            .extend(answers.into_iter().map(Into::into));
        self
    }

    pub fn with_confirmations(self, confirmations: impl IntoIterator<Item = bool>) -> Self {
        self.confirmations
            .lock()
            .unwrap()
            .extend(confirmations.into_iter().map(Some));
        self
    }

    /// Queue a confirmation that is interrupted instead of answered.
    pub fn with_cancelled_confirmation(self) -> Self {
        self.confirmations.lock().unwrap().push_back(None);
        self
    }

    pub fn messages(&self) -> Vec<(MessageLevel, String)> {
        self.messages.lock().unwrap().clone()
    }

    /// Messages of the given level, text only.
    pub fn messages_at(&self, level: MessageLevel) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn output_lines(&self) -> Vec<String> {
        self.output_lines.lock().unwrap().clone()
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }

    pub fn confirm_prompts(&self) -> Vec<String> {
        self.confirm_prompts.lock().unwrap().clone()
    }

    pub fn phases(&self) -> Vec<AgentPhase> {
        self.phases.lock().unwrap().clone()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.steps.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AgentCallback for RecordingCallback {
    async fn on_message(&self, level: MessageLevel, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((level, message.to_string()));
    }

    async fn on_output_line(&self, line: &str) {
        self.output_lines.lock().unwrap().push(line.to_string());
    }

    async fn ask_input(&self, question: &str) -> Result<String, AgentError> {
        self.questions.lock().unwrap().push(question.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(AgentError::Cancelled)
    }

    async fn confirm(&self, question: &str, default: bool) -> Result<bool, AgentError> {
        self.confirm_prompts
            .lock()
            .unwrap()
            .push(question.to_string());
        match self.confirmations.lock().unwrap().pop_front() {
            Some(Some(answer)) => Ok(answer),
            Some(None) => Err(AgentError::Cancelled),
            None => Ok(default),
        }
    }

    async fn on_phase_change(&self, phase: AgentPhase) {
        self.phases.lock().unwrap().push(phase);
    }

    async fn on_step_start(&self, step: &Step) {
        self.steps.lock().unwrap().push(step.clone());
    }
}

/// How an agent run ended.
#[derive(Debug)]
pub enum AgentOutcome {
    Done,
    Aborted(AgentError),
    Cancelled,
}

/// Summary of one agent run.
#[derive(Debug)]
pub struct AgentReport {
    pub outcome: AgentOutcome,
    /// Shell commands that ran to a zero exit code, in order.
    pub commands_executed: Vec<String>,
    /// One entry per attempted file step.
    pub files: Vec<FileOutcome>,
}

impl AgentReport {
    fn ended(error: AgentError, commands_executed: Vec<String>) -> Self {
        let outcome = if error.is_cancellation() {
            AgentOutcome::Cancelled
        } else {
            AgentOutcome::Aborted(error)
        };
        Self {
            outcome,
            commands_executed,
            files: Vec::new(),
        }
    }

    pub fn final_phase(&self) -> AgentPhase {
        match self.outcome {
            AgentOutcome::Done => AgentPhase::Done,
            AgentOutcome::Aborted(_) => AgentPhase::Aborted,
            AgentOutcome::Cancelled => AgentPhase::Cancelled,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.outcome, AgentOutcome::Done)
    }
}

/// Executes agent plans against a provider, a shell and a tool locator.
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    shell: Arc<dyn ShellRunner>,
    tools: Arc<dyn ToolLocator>,
    workspace: PathBuf,
    os: OsFamily,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        shell: Arc<dyn ShellRunner>,
        tools: Arc<dyn ToolLocator>,
        workspace: PathBuf,
    ) -> Self {
        Self {
            provider,
            shell,
            tools,
            workspace,
            os: OsFamily::current(),
        }
    }

    /// Override the detected operating system family.
    pub fn with_os(mut self, os: OsFamily) -> Self {
        self.os = os;
        self
    }

    /// Run the plan embedded in `explanation`.
    pub async fn run(
        &self,
        objective: &str,
        explanation: &str,
        callback: &dyn AgentCallback,
    ) -> AgentReport {
        info!(objective, "Agent run started");
        callback
            .on_message(MessageLevel::Info, "Agent Mode Activated")
            .await;
        callback
            .on_message(
                MessageLevel::Detail,
                &format!("Initial objective: {objective}"),
            )
            .await;

        callback.on_phase_change(AgentPhase::CollectInput).await;
        let text = match collect_inputs(explanation, callback).await {
            Ok(text) => text,
            Err(e) => return self.finish(AgentReport::ended(e, Vec::new()), callback).await,
        };
        callback
            .on_message(MessageLevel::Success, "Information collected.")
            .await;

        let plan = extract_plan(&text);
        for path in &plan.orphan_file_markers {
            warn!(path = path.as_str(), "FILE marker without a code block");
            callback
                .on_message(
                    MessageLevel::Warning,
                    &format!("Skipping FILE: {path} (no code block follows the marker)"),
                )
                .await;
        }

        callback.on_phase_change(AgentPhase::PreflightCheck).await;
        let checker = PreflightChecker::new(
            self.provider.as_ref(),
            self.shell.as_ref(),
            self.tools.as_ref(),
            &self.os,
        );
        if let Err(e) = checker.check(&plan, callback).await {
            return self.finish(AgentReport::ended(e, Vec::new()), callback).await;
        }

        let executor = PlanExecutor::new(self.shell.as_ref(), &self.workspace);

        callback.on_phase_change(AgentPhase::ExecShellSteps).await;
        let commands_executed = match executor.run_shell_steps(&plan, callback).await {
            Ok(executed) => executed,
            Err((e, executed)) => {
                return self.finish(AgentReport::ended(e, executed), callback).await;
            }
        };

        callback.on_phase_change(AgentPhase::ExecFileSteps).await;
        let files = executor.write_files(&plan, callback).await;

        let report = AgentReport {
            outcome: AgentOutcome::Done,
            commands_executed,
            files,
        };
        self.finish(report, callback).await
    }

    async fn finish(&self, report: AgentReport, callback: &dyn AgentCallback) -> AgentReport {
        match &report.outcome {
            AgentOutcome::Done => {
                info!(
                    commands = report.commands_executed.len(),
                    files = report.files.len(),
                    "Agent run finished"
                );
                callback
                    .on_message(
                        MessageLevel::Success,
                        "Agent has finished executing the plan.",
                    )
                    .await;
            }
            AgentOutcome::Aborted(e) => {
                warn!(error = %e, "Agent run aborted");
                callback
                    .on_message(MessageLevel::Error, &format!("Agent stopped: {e}"))
                    .await;
            }
            AgentOutcome::Cancelled => {
                warn!("Agent run cancelled");
                callback
                    .on_message(MessageLevel::Warning, "Agent cancelled by user.")
                    .await;
            }
        }
        callback.on_phase_change(report.final_phase()).await;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::executor::MockShellRunner;
    use crate::preflight::StaticToolLocator;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn make_agent(
        provider: Arc<MockLlmProvider>,
        shell: Arc<MockShellRunner>,
        tools: StaticToolLocator,
        workspace: &TempDir,
    ) -> Agent {
        Agent::new(
            provider,
            shell,
            Arc::new(tools),
            workspace.path().to_path_buf(),
        )
        .with_os(OsFamily::Linux)
    }

    #[tokio::test]
    async fn test_phases_in_order_for_successful_run() {
        let dir = TempDir::new().unwrap();
        let shell = Arc::new(MockShellRunner::new());
        let agent = make_agent(
            Arc::new(MockLlmProvider::new()),
            shell.clone(),
            StaticToolLocator::new(["git"]),
            &dir,
        );
        let callback = RecordingCallback::new();

        let text = "```bash\ngit init\n```\nFILE: README.md\n```\n# Demo\n```";
        let report = agent.run("start a repo", text, &callback).await;

        assert!(report.is_done());
        assert_eq!(
            callback.phases(),
            vec![
                AgentPhase::CollectInput,
                AgentPhase::PreflightCheck,
                AgentPhase::ExecShellSteps,
                AgentPhase::ExecFileSteps,
                AgentPhase::Done,
            ]
        );
        assert_eq!(shell.commands(), vec!["git init".to_string()]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("README.md")).unwrap(),
            "# Demo"
        );
    }

    #[tokio::test]
    async fn test_cancelled_input_ends_in_cancelled_phase() {
        let dir = TempDir::new().unwrap();
        let shell = Arc::new(MockShellRunner::new());
        let agent = make_agent(
            Arc::new(MockLlmProvider::new()),
            shell.clone(),
            StaticToolLocator::new(Vec::<String>::new()),
            &dir,
        );
        let callback = RecordingCallback::new();

        let report = agent
            .run("x", "```bash\nmkdir {{USER_INPUT:Dir?}}\n```", &callback)
            .await;

        assert!(matches!(report.outcome, AgentOutcome::Cancelled));
        assert_eq!(
            callback.phases(),
            vec![AgentPhase::CollectInput, AgentPhase::Cancelled]
        );
        assert!(shell.commands().is_empty());
    }

    #[tokio::test]
    async fn test_substituted_values_reach_shell_and_files() {
        let dir = TempDir::new().unwrap();
        let shell = Arc::new(MockShellRunner::new());
        let agent = make_agent(
            Arc::new(MockLlmProvider::new()),
            shell.clone(),
            StaticToolLocator::new(Vec::<String>::new()),
            &dir,
        );
        let callback = RecordingCallback::new().with_answers(["demo"]);

        let text = "```bash\nmkdir {{USER_INPUT:Project name?}}\n```\nFILE: {{USER_INPUT:Project name?}}/app.txt\n```\nname={{USER_INPUT:Project name?}}\n```";
        let report = agent.run("scaffold", text, &callback).await;

        assert!(report.is_done());
        assert_eq!(shell.commands(), vec!["mkdir demo".to_string()]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("demo/app.txt")).unwrap(),
            "name=demo"
        );
    }

    #[test]
    fn test_terminal_phases() {
        assert!(AgentPhase::Done.is_terminal());
        assert!(AgentPhase::Aborted.is_terminal());
        assert!(AgentPhase::Cancelled.is_terminal());
        assert!(!AgentPhase::PreflightCheck.is_terminal());
        assert_eq!(AgentPhase::ExecShellSteps.to_string(), "exec_shell_steps");
    }
}
