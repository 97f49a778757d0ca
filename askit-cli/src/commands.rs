//! Handlers for `init`, `config` and the default ask flow.

use crate::config_shell;
use crate::console::{self, BOLD, CYAN, DIM, GREEN, RED, RESET, YELLOW};
use askit_core::agent::{Agent, AgentCallback, AgentOutcome, MessageLevel};
use askit_core::brain;
use askit_core::config::{ExecutionMode, load_config};
use askit_core::credentials::{KeyringCredentialStore, resolve_api_key};
use askit_core::error::{AskitError, ProjectError};
use askit_core::executor::{ShellRunner, SystemShellRunner};
use askit_core::history::{format_history_context, get_shell_history};
use askit_core::paths::AppPaths;
use askit_core::preflight::PathToolLocator;
use askit_core::project::{find_project_root, init_project, require_project_root};
use askit_core::providers::create_provider;
use askit_core::staging::ConfigSession;
use askit_core::types::{Confidence, Suggestion};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to do with a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    RunAgent,
    Execute,
    Display,
}

/// Route a suggestion by confidence, mode and the `--safe` flag.
pub(crate) fn decide(suggestion: &Suggestion, mode: ExecutionMode, safe: bool) -> Action {
    match suggestion.confidence {
        Confidence::Agent => Action::RunAgent,
        Confidence::High
            if mode == ExecutionMode::Strike && !safe && !suggestion.command.trim().is_empty() =>
        {
            Action::Execute
        }
        _ => Action::Display,
    }
}

/// `askit-cli init`
pub(crate) fn init(dir: &Path) -> anyhow::Result<()> {
    match init_project(dir) {
        Ok(_) => {
            println!(
                "{GREEN}✓ AskIT project initialized successfully in {}{RESET}",
                dir.display()
            );
            println!("{DIM}  Run `askit-cli config` to configure your API key and mode.{RESET}");
            Ok(())
        }
        Err(AskitError::Project(ProjectError::AlreadyInitialized { path })) => {
            println!(
                "{YELLOW}ⓘ The AskIT project has already been initialized in {}{RESET}",
                path.display()
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// `askit-cli config`
pub(crate) async fn config(paths: AppPaths) -> anyhow::Result<ExitCode> {
    let session = ConfigSession::open(paths)?;
    tokio::task::spawn_blocking(move || {
        let store = KeyringCredentialStore::new();
        config_shell::run(session, &store)
    })
    .await??;
    Ok(ExitCode::SUCCESS)
}

/// Options for one `ask` invocation.
#[derive(Debug, Clone)]
pub(crate) struct AskOptions {
    pub prompt: String,
    pub context_lines: Option<usize>,
    pub safe: bool,
    pub quiet: bool,
}

/// The default flow: suggest, then display, execute or hand to the agent.
pub(crate) async fn ask(options: AskOptions, paths: &AppPaths) -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir()?;
    let root = match require_project_root(&cwd) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("{RED}✗ {e}{RESET}");
            return Ok(ExitCode::FAILURE);
        }
    };
    debug!(root = %root.display(), "Project root");

    if let Some(target) = paths.migrate_legacy_config(&root)? {
        println!(
            "{YELLOW}ⓘ Configuration migrated to {}{RESET}",
            target.display()
        );
    }
    let config = load_config(paths, Some(&root))?;
    let api_key = resolve_api_key(&KeyringCredentialStore::new(), &config.llm.api_key_env)?;

    let lines = options.context_lines.unwrap_or(config.history.lines);
    let context = format_history_context(&get_shell_history(lines));
    let provider = create_provider(&config.llm, api_key)?;

    if !options.quiet {
        println!("{DIM}Thinking...{RESET}");
    }
    let suggestion = brain::get_suggestion(provider.as_ref(), &options.prompt, &context).await;
    info!(confidence = %suggestion.confidence, "Suggestion received");

    let callback = console::ConsoleCallback::new(options.quiet);
    match decide(&suggestion, config.mode, options.safe) {
        Action::Display => {
            print!("{}", console::render_suggestion(&suggestion));
            Ok(ExitCode::SUCCESS)
        }
        Action::Execute => {
            println!("{BOLD}Executing:{RESET} {CYAN}{}{RESET}", suggestion.command);
            let shell = SystemShellRunner::new(&cwd);
            match shell.exec(&suggestion.command, &callback).await {
                Ok(0) => {
                    callback
                        .on_message(MessageLevel::Success, "Command finished successfully")
                        .await;
                    Ok(ExitCode::SUCCESS)
                }
                Ok(code) => {
                    callback
                        .on_message(
                            MessageLevel::Error,
                            &format!("Command failed with exit code {code}"),
                        )
                        .await;
                    Ok(ExitCode::FAILURE)
                }
                Err(e) if e.is_cancellation() => {
                    callback
                        .on_message(MessageLevel::Warning, "Execution cancelled.")
                        .await;
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => Err(e.into()),
            }
        }
        Action::RunAgent => {
            println!("\n{BOLD}{CYAN}Objective:{RESET} {}", options.prompt);
            println!("{DIM}{}{RESET}\n", suggestion.explanation);
            let proceed = callback
                .confirm("Do you want to let the agent perform this task?", true)
                .await
                .unwrap_or(false);
            if !proceed {
                println!("{YELLOW}Agent task cancelled.{RESET}");
                return Ok(ExitCode::SUCCESS);
            }

            let agent = Agent::new(
                provider,
                Arc::new(SystemShellRunner::new(&cwd)),
                Arc::new(PathToolLocator),
                cwd.clone(),
            );
            let report = agent
                .run(&options.prompt, &suggestion.explanation, &callback)
                .await;
            match report.outcome {
                AgentOutcome::Done => Ok(ExitCode::SUCCESS),
                AgentOutcome::Cancelled => Ok(ExitCode::FAILURE),
                AgentOutcome::Aborted(e) => {
                    warn!(error = %e, "Agent run aborted");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

/// Whether `dir` sits inside a project. Used for the missing-prompt hint.
pub(crate) fn in_project(dir: &Path) -> bool {
    find_project_root(dir).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_decide_agent_always_runs_agent() {
        let s = Suggestion::new(Confidence::Agent, "", "plan");
        assert_eq!(decide(&s, ExecutionMode::Normal, true), Action::RunAgent);
        assert_eq!(decide(&s, ExecutionMode::Strike, false), Action::RunAgent);
    }

    #[test]
    fn test_decide_strike_executes_only_high() {
        let high = Suggestion::new(Confidence::High, "ls -la", "");
        let medium = Suggestion::new(Confidence::Medium, "ls -la", "");
        assert_eq!(decide(&high, ExecutionMode::Strike, false), Action::Execute);
        assert_eq!(decide(&medium, ExecutionMode::Strike, false), Action::Display);
        assert_eq!(decide(&high, ExecutionMode::Normal, false), Action::Display);
    }

    #[test]
    fn test_decide_safe_flag_blocks_execution() {
        let high = Suggestion::new(Confidence::High, "rm build.log", "");
        assert_eq!(decide(&high, ExecutionMode::Strike, true), Action::Display);
    }

    #[test]
    fn test_decide_high_without_command_displays() {
        let high = Suggestion::new(Confidence::High, "  ", "nothing to run");
        assert_eq!(decide(&high, ExecutionMode::Strike, false), Action::Display);
    }

    #[test]
    fn test_init_twice_succeeds() {
        let dir = TempDir::new().unwrap();
        init(dir.path()).unwrap();
        assert!(in_project(dir.path()));
        init(dir.path()).unwrap();
    }
}
