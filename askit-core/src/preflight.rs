//! Pre-flight tool checks.
//!
//! Before any plan step runs, every external executable the shell steps
//! reference must be on the search path. Missing tools can be installed
//! with a command suggested by the model, after user confirmation.

use crate::agent::{AgentCallback, MessageLevel};
use crate::brain::{LlmProvider, get_suggestion};
use crate::error::AgentError;
use crate::executor::ShellRunner;
use crate::types::{OsFamily, Plan, ToolRequirement};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Commands never treated as external tools.
pub const SHELL_BUILTINS: [&str; 8] = ["mkdir", "cd", "echo", "ls", "cat", "rm", "mv", "cp"];

/// Derive the sorted, deduplicated set of tools a plan needs.
///
/// The first whitespace token of each shell step names the tool. Builtins
/// and comment lines are skipped.
pub fn required_tools(plan: &Plan) -> BTreeSet<ToolRequirement> {
    plan.shell_commands()
        .into_iter()
        .filter_map(|command| command.split_whitespace().next())
        .filter(|token| !token.starts_with('#'))
        .filter(|token| !SHELL_BUILTINS.contains(token))
        .map(ToolRequirement::new)
        .collect()
}

/// Answers whether an executable is available.
pub trait ToolLocator: Send + Sync {
    fn is_installed(&self, name: &str) -> bool;
}

/// Looks tools up on the `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathToolLocator;

impl ToolLocator for PathToolLocator {
    fn is_installed(&self, name: &str) -> bool {
        which::which(name).is_ok()
    }
}

/// A fixed set of installed tools, mutable so tests can simulate installs.
#[derive(Debug, Default, Clone)]
pub struct StaticToolLocator {
    installed: Arc<Mutex<HashSet<String>>>,
}

impl StaticToolLocator {
    pub fn new<I, S>(installed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            installed: Arc::new(Mutex::new(installed.into_iter().map(Into::into).collect())),
        }
    }

    /// Mark a tool as installed. Clones share the same set.
    pub fn install(&self, name: &str) {
        if let Ok(mut set) = self.installed.lock() {
            set.insert(name.to_string());
        }
    }
}

impl ToolLocator for StaticToolLocator {
    fn is_installed(&self, name: &str) -> bool {
        self.installed
            .lock()
            .map(|set| set.contains(name))
            .unwrap_or(false)
    }
}

/// The prompt asking the model how to install `tool`.
pub fn install_prompt(tool: &str, os: &OsFamily) -> String {
    format!(
        "The command-line tool '{tool}' is not found on my {os} system. \
         Provide the most common, single-line command to install it. \
         Only the command, no other text."
    )
}

const INSTALL_CONTEXT: &str = "Provide an installation command.";

/// Ask the model for an install command.
///
/// Only a HIGH or MEDIUM suggestion with a non-empty command counts.
pub async fn install_command_for(
    provider: &dyn LlmProvider,
    tool: &str,
    os: &OsFamily,
) -> Option<String> {
    let suggestion = get_suggestion(provider, &install_prompt(tool, os), INSTALL_CONTEXT).await;
    let command = suggestion.command.trim();
    if suggestion.confidence.is_actionable() && !command.is_empty() {
        Some(command.to_string())
    } else {
        debug!(
            tool,
            confidence = %suggestion.confidence,
            "No usable install command"
        );
        None
    }
}

/// Verifies, and optionally installs, the tools a plan needs.
pub struct PreflightChecker<'a> {
    provider: &'a dyn LlmProvider,
    shell: &'a dyn ShellRunner,
    tools: &'a dyn ToolLocator,
    os: &'a OsFamily,
}

impl<'a> PreflightChecker<'a> {
    pub fn new(
        provider: &'a dyn LlmProvider,
        shell: &'a dyn ShellRunner,
        tools: &'a dyn ToolLocator,
        os: &'a OsFamily,
    ) -> Self {
        Self {
            provider,
            shell,
            tools,
            os,
        }
    }

    /// Check every required tool in sorted order, stopping at the first failure.
    pub async fn check(&self, plan: &Plan, callback: &dyn AgentCallback) -> Result<(), AgentError> {
        let required = required_tools(plan);
        if required.is_empty() {
            callback
                .on_message(MessageLevel::Detail, "No external tools required.")
                .await;
        } else {
            let names: Vec<&str> = required.iter().map(|t| t.name.as_str()).collect();
            callback
                .on_message(
                    MessageLevel::Info,
                    &format!("Required tools: {}", names.join(", ")),
                )
                .await;
        }

        for tool in &required {
            self.ensure_tool(&tool.name, callback).await?;
        }

        callback
            .on_message(MessageLevel::Success, "Pre-flight checks passed.")
            .await;
        Ok(())
    }

    async fn ensure_tool(
        &self,
        tool: &str,
        callback: &dyn AgentCallback,
    ) -> Result<(), AgentError> {
        if self.tools.is_installed(tool) {
            debug!(tool, "Tool present");
            return Ok(());
        }

        warn!(tool, os = %self.os, "Tool not found");
        callback
            .on_message(MessageLevel::Warning, &format!("Tool not found: {tool}"))
            .await;

        let Some(install) = install_command_for(self.provider, tool, self.os).await else {
            return Err(AgentError::ToolMissing {
                tool: tool.to_string(),
            });
        };

        callback
            .on_message(
                MessageLevel::Info,
                &format!("AI suggests this command for installation: {install}"),
            )
            .await;
        let accepted = callback
            .confirm(
                &format!("Do you want to run this command to install '{tool}'?"),
                true,
            )
            .await?;
        if !accepted {
            return Err(AgentError::InstallDeclined {
                tool: tool.to_string(),
            });
        }

        // The exit code is not trusted; presence is re-checked instead.
        let exit_code = self.shell.exec(&install, callback).await?;
        debug!(tool, exit_code, "Install command finished");

        if self.tools.is_installed(tool) {
            info!(tool, "Tool installed");
            callback
                .on_message(
                    MessageLevel::Success,
                    &format!("Tool '{tool}' is now ready."),
                )
                .await;
            Ok(())
        } else {
            Err(AgentError::InstallFailed {
                tool: tool.to_string(),
            })
        }
    }
}
