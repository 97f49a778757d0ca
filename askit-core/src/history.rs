//! Shell history context sent along with each prompt.
//!
//! Reads the user's history file (bash, zsh, fish, or PowerShell's
//! PSReadLine file), drops askit's own invocations and returns the most
//! recent commands first. Any failure yields an empty history.

use crate::paths::APP_NAME;
use crate::types::OsFamily;
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_COMMAND_CHARS: usize = 100;
const TRUNCATED_CHARS: usize = 97;

pub const NO_HISTORY: &str = "No recent shell history available.";

/// On-disk history layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFormat {
    /// One command per line (bash, PSReadLine).
    Plain,
    /// `: <start>:<elapsed>;<command>`, or plain lines.
    Zsh,
    /// YAML-like `- cmd: ...` entries.
    Fish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySource {
    pub path: PathBuf,
    pub format: HistoryFormat,
}

impl HistorySource {
    fn new(path: PathBuf, format: HistoryFormat) -> Self {
        Self { path, format }
    }
}

/// Candidate history files, in lookup order.
pub fn history_sources(home: &Path, shell: Option<&str>, os: &OsFamily) -> Vec<HistorySource> {
    use HistoryFormat::*;

    if *os == OsFamily::Windows {
        let path = home
            .join("AppData")
            .join("Roaming")
            .join("Microsoft")
            .join("Windows")
            .join("PowerShell")
            .join("PSReadLine")
            .join("ConsoleHost_history.txt");
        return vec![HistorySource::new(path, Plain)];
    }

    let shell = shell.unwrap_or_default().to_ascii_lowercase();
    if shell.contains("bash") {
        vec![HistorySource::new(home.join(".bash_history"), Plain)]
    } else if shell.contains("zsh") {
        vec![
            HistorySource::new(home.join(".zsh_history"), Zsh),
            HistorySource::new(home.join(".histfile"), Zsh),
        ]
    } else if shell.contains("fish") {
        vec![HistorySource::new(
            home.join(".local/share/fish/fish_history"),
            Fish,
        )]
    } else {
        vec![
            HistorySource::new(home.join(".bash_history"), Plain),
            HistorySource::new(home.join(".zsh_history"), Zsh),
            HistorySource::new(home.join(".histfile"), Zsh),
            HistorySource::new(home.join(".history"), Plain),
        ]
    }
}

/// Parse history file content into commands, oldest first.
pub fn parse_history(content: &str, format: HistoryFormat) -> Vec<String> {
    match format {
        HistoryFormat::Plain => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect(),
        HistoryFormat::Zsh => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| match line.strip_prefix(':').and_then(|l| l.split_once(';')) {
                Some((_, command)) => command.trim().to_string(),
                None => line.to_string(),
            })
            .collect(),
        HistoryFormat::Fish => parse_fish(content),
    }
}

fn parse_fish(content: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut current: Option<String> = None;

    for raw in content.lines() {
        let line = raw.trim();
        if let Some(cmd) = line.strip_prefix("- cmd:") {
            commands.extend(current.take());
            current = Some(cmd.trim().to_string());
        } else if line.starts_with("when:") || line.starts_with("paths:") || line.starts_with("- ")
        {
            continue;
        } else if let Some(cmd) = current.as_mut().filter(|_| !line.is_empty()) {
            cmd.push(' ');
            cmd.push_str(line);
        }
    }
    commands.extend(current);
    commands
}

/// Pick the context commands from a parsed history (oldest first).
///
/// Looks at the last `2 * max_lines` entries, most recent first, drops
/// askit's own invocations and keeps at most `max_lines`.
pub fn recent_commands(history: &[String], max_lines: usize) -> Vec<String> {
    let fetch = max_lines.saturating_mul(2);
    history
        .iter()
        .rev()
        .take(fetch)
        .filter(|cmd| !cmd.contains(APP_NAME))
        .take(max_lines)
        .cloned()
        .collect()
}

/// Read the first available source.
pub fn read_history(sources: &[HistorySource], max_lines: usize) -> Vec<String> {
    for source in sources {
        let Ok(bytes) = std::fs::read(&source.path) else {
            continue;
        };
        let content = String::from_utf8_lossy(&bytes);
        let parsed = parse_history(&content, source.format);
        if !parsed.is_empty() {
            debug!(path = %source.path.display(), entries = parsed.len(), "Read shell history");
            return recent_commands(&parsed, max_lines);
        }
    }
    Vec::new()
}

/// The current user's recent shell commands, most recent first.
pub fn get_shell_history(max_lines: usize) -> Vec<String> {
    let Some(base) = BaseDirs::new() else {
        return Vec::new();
    };
    let shell = std::env::var("SHELL").ok();
    let sources = history_sources(base.home_dir(), shell.as_deref(), &OsFamily::current());
    read_history(&sources, max_lines)
}

/// Render history as numbered context lines.
pub fn format_history_context(commands: &[String]) -> String {
    if commands.is_empty() {
        return NO_HISTORY.to_string();
    }
    commands
        .iter()
        .enumerate()
        .map(|(i, cmd)| {
            let shown = if cmd.chars().count() > MAX_COMMAND_CHARS {
                let head: String = cmd.chars().take(TRUNCATED_CHARS).collect();
                format!("{head}...")
            } else {
                cmd.clone()
            };
            format!("{:2}. {shown}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
