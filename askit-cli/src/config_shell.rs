//! Interactive configuration shell (`askit-cli config`).
//!
//! A `rustyline` editor with file-backed history and nested tab completion
//! drives a [`ConfigSession`]. Changes stay staged until `commit`.

use crate::console::{BOLD, CYAN, DIM, GREEN, RED, RESET, YELLOW};
use askit_core::config::ExecutionMode;
use askit_core::credentials::{API_KEY_ACCOUNT, CredentialStore};
use askit_core::staging::{CommitError, CommitOutcome, ConfigSession};
use dialoguer::{Confirm, Password};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::io::{self, Write};
use tracing::{debug, warn};

const TOP_LEVEL: [&str; 8] = ["set", "show", "commit", "discard", "help", "?", "exit", "quit"];
const SET_TARGETS: [&str; 2] = ["mode", "api_key"];
const SHOW_TARGETS: [&str; 3] = ["config", "running", "staged"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShowTarget {
    Config,
    Running,
    Staged,
}

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ShellCommand {
    Empty,
    SetMode(ExecutionMode),
    SetApiKey,
    Show(ShowTarget),
    Commit,
    Discard,
    Help,
    Exit,
}

/// A line that could not be parsed, with the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ParseError {
    #[error("Missing parameter. Usage: set mode <value> or set api_key")]
    MissingSetParameter,
    #[error("Missing mode value. Usage: set mode <strike|normal>")]
    MissingModeValue,
    #[error("Invalid mode '{0}'. Valid modes: normal, strike")]
    InvalidMode(String),
    #[error("Unknown parameter '{0}'. Available: mode, api_key")]
    UnknownSetParameter(String),
    #[error("Missing show target. Usage: show <config|running|staged>")]
    MissingShowTarget,
    #[error("Unknown show target '{0}'. Available: config, running, staged")]
    UnknownShowTarget(String),
    #[error("Unknown command '{0}'. Type help or ? for available commands.")]
    UnknownCommand(String),
}

impl ShellCommand {
    pub(crate) fn parse(line: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = parts.first() else {
            return Ok(ShellCommand::Empty);
        };
        let arg = |i: usize| parts.get(i).map(|s| s.to_ascii_lowercase());

        match first.to_ascii_lowercase().as_str() {
            "help" | "?" => Ok(ShellCommand::Help),
            "exit" | "quit" => Ok(ShellCommand::Exit),
            "commit" => Ok(ShellCommand::Commit),
            "discard" => Ok(ShellCommand::Discard),
            "set" => match arg(1).as_deref() {
                None => Err(ParseError::MissingSetParameter),
                Some("mode") => {
                    let value = parts.get(2).ok_or(ParseError::MissingModeValue)?;
                    value
                        .parse::<ExecutionMode>()
                        .map(ShellCommand::SetMode)
                        .map_err(|_| ParseError::InvalidMode(value.to_string()))
                }
                Some("api_key") => Ok(ShellCommand::SetApiKey),
                Some(_) => Err(ParseError::UnknownSetParameter(parts[1].to_string())),
            },
            "show" => match arg(1).as_deref() {
                None => Err(ParseError::MissingShowTarget),
                Some("config") => Ok(ShellCommand::Show(ShowTarget::Config)),
                Some("running") => Ok(ShellCommand::Show(ShowTarget::Running)),
                Some("staged") => Ok(ShellCommand::Show(ShowTarget::Staged)),
                Some(_) => Err(ParseError::UnknownShowTarget(parts[1].to_string())),
            },
            _ => Err(ParseError::UnknownCommand(line.trim().to_string())),
        }
    }
}

/// Candidates for the word under the cursor. Returns the word start and the matches.
pub(crate) fn complete_words(line: &str) -> (usize, Vec<&'static str>) {
    let start = line
        .rfind(char::is_whitespace)
        .map(|i| i + 1)
        .unwrap_or(0);
    let current = &line[start..];
    let previous: Vec<String> = line[..start]
        .split_whitespace()
        .map(str::to_ascii_lowercase)
        .collect();
    let previous: Vec<&str> = previous.iter().map(String::as_str).collect();

    let choices: &[&'static str] = match previous.as_slice() {
        [] => &TOP_LEVEL,
        ["set"] => &SET_TARGETS,
        ["set", "mode"] => &["normal", "strike"],
        ["show"] => &SHOW_TARGETS,
        _ => &[],
    };
    let matches = choices
        .iter()
        .copied()
        .filter(|c| c.starts_with(current))
        .collect();
    (start, matches)
}

/// Line-editor helper providing nested completion.
pub(crate) struct ConfigHelper;

impl Completer for ConfigHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, words) = complete_words(&line[..pos]);
        let pairs = words
            .into_iter()
            .map(|w| Pair {
                display: w.to_string(),
                replacement: format!("{w} "),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ConfigHelper {
    type Hint = String;
}

impl Highlighter for ConfigHelper {}

impl Validator for ConfigHelper {}

impl Helper for ConfigHelper {}

/// Interactive questions the shell asks outside the line editor.
pub(crate) trait ShellPrompter {
    fn read_secret(&self, prompt: &str) -> io::Result<String>;
    fn confirm(&self, prompt: &str) -> io::Result<bool>;
}

/// Prompts through `dialoguer`.
pub(crate) struct DialoguerPrompter;

impl ShellPrompter for DialoguerPrompter {
    fn read_secret(&self, prompt: &str) -> io::Result<String> {
        Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(io::Error::other)
    }

    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(io::Error::other)
    }
}

/// Whether the loop keeps reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

/// Shell state: the staged session plus its collaborators.
pub(crate) struct ConfigShell<'a> {
    session: ConfigSession,
    store: &'a dyn CredentialStore,
    prompter: &'a dyn ShellPrompter,
}

impl<'a> ConfigShell<'a> {
    pub(crate) fn new(
        session: ConfigSession,
        store: &'a dyn CredentialStore,
        prompter: &'a dyn ShellPrompter,
    ) -> Self {
        Self {
            session,
            store,
            prompter,
        }
    }

    pub(crate) fn prompt(&self) -> String {
        if self.session.has_pending_changes() {
            format!("{CYAN}askit-config{YELLOW}{BOLD}*{RESET}{CYAN}> {RESET}")
        } else {
            format!("{CYAN}askit-config> {RESET}")
        }
    }

    pub(crate) fn banner(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{BOLD}{CYAN}AskIT-CLI Configuration Shell{RESET}")?;
        writeln!(out, "Type {CYAN}help{RESET} or {CYAN}?{RESET} for available commands")?;
        writeln!(out, "{DIM}Use Tab for autocompletion{RESET}")?;
        if self.session.was_restored() {
            writeln!(out, "{YELLOW}Uncommitted configuration changes found.{RESET}")?;
        }
        writeln!(out)
    }

    /// Handle one input line.
    pub(crate) fn handle_line(&mut self, line: &str, out: &mut dyn Write) -> io::Result<Flow> {
        match ShellCommand::parse(line) {
            Ok(command) => self.execute(command, out),
            Err(e) => {
                writeln!(out, "{RED}✗ {e}{RESET}")?;
                Ok(Flow::Continue)
            }
        }
    }

    fn execute(&mut self, command: ShellCommand, out: &mut dyn Write) -> io::Result<Flow> {
        match command {
            ShellCommand::Empty => {}
            ShellCommand::Help => show_help(out)?,
            ShellCommand::Exit => return self.exit(out),
            ShellCommand::Commit => self.commit(out)?,
            ShellCommand::Discard => self.discard(out)?,
            ShellCommand::SetMode(mode) => self.set_mode(mode, out)?,
            ShellCommand::SetApiKey => self.set_api_key(out)?,
            ShellCommand::Show(target) => self.show(target, out)?,
        }
        Ok(Flow::Continue)
    }

    fn exit(&mut self, out: &mut dyn Write) -> io::Result<Flow> {
        if self.session.has_pending_changes() {
            writeln!(out, "{YELLOW}⚠ You have uncommitted changes.{RESET}")?;
            if !self.prompter.confirm("Exit anyway?").unwrap_or(false) {
                return Ok(Flow::Continue);
            }
        }
        self.cleanup(out)?;
        Ok(Flow::Exit)
    }

    /// Ctrl-C / Ctrl-D: drop staged changes and leave.
    pub(crate) fn interrupt(&mut self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "\n{YELLOW}⚠ Interrupted by user.{RESET}")?;
        if self.session.has_pending_changes() {
            writeln!(out, "{DIM}Uncommitted changes discarded.{RESET}")?;
        }
        self.cleanup(out)
    }

    fn cleanup(&mut self, out: &mut dyn Write) -> io::Result<()> {
        if let Err(e) = self.session.clear_staging_files() {
            warn!(error = %e, "Could not remove staging files");
            writeln!(out, "{RED}✗ {e}{RESET}")?;
        }
        Ok(())
    }

    fn commit(&mut self, out: &mut dyn Write) -> io::Result<()> {
        match self.session.commit(self.store) {
            Ok(CommitOutcome::NothingToCommit) => {
                writeln!(out, "{YELLOW}ⓘ No pending changes to commit.{RESET}")
            }
            Ok(CommitOutcome::Committed { api_key_stored }) => {
                if api_key_stored {
                    writeln!(out, "{GREEN}✓ API key applied to system keychain.{RESET}")?;
                }
                writeln!(
                    out,
                    "{BOLD}{GREEN}✓ Configuration committed and applied successfully.{RESET}"
                )
            }
            Err(CommitError::Keychain(e)) => {
                writeln!(out, "{BOLD}{RED}✗ Failed to store API key in system keychain.{RESET}")?;
                writeln!(
                    out,
                    "{DIM}   Consider setting the {} environment variable instead. ({e}){RESET}",
                    self.session.running().llm.api_key_env
                )
            }
            Err(CommitError::Config(e)) => writeln!(out, "{RED}✗ {e}{RESET}"),
        }
    }

    fn discard(&mut self, out: &mut dyn Write) -> io::Result<()> {
        match self.session.discard() {
            Ok(None) => writeln!(out, "{YELLOW}ⓘ No pending changes to discard.{RESET}"),
            Ok(Some(changes)) if changes.is_empty() => {
                writeln!(out, "{BOLD}{YELLOW}✓ Staged changes discarded.{RESET}")
            }
            Ok(Some(changes)) => writeln!(
                out,
                "{BOLD}{YELLOW}✓ Staged changes discarded:{RESET} {}",
                changes.join(", ")
            ),
            Err(e) => writeln!(out, "{RED}✗ {e}{RESET}"),
        }
    }

    fn set_mode(&mut self, mode: ExecutionMode, out: &mut dyn Write) -> io::Result<()> {
        match self.session.set_mode(mode) {
            Ok(change) if change.changed() => {
                writeln!(
                    out,
                    "{GREEN}✓ Mode changed:{RESET} {DIM}{}{RESET} → {BOLD}{GREEN}{}{RESET}",
                    change.old, change.new
                )?;
                writeln!(out, "{DIM}   Use commit to apply changes.{RESET}")
            }
            Ok(change) => writeln!(
                out,
                "{YELLOW}ⓘ Mode already set to {BOLD}{}{RESET}{YELLOW}.{RESET}",
                change.new
            ),
            Err(e) => writeln!(out, "{RED}✗ {e}{RESET}"),
        }
    }

    fn set_api_key(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let key = match self.prompter.read_secret("Enter your API key (input hidden)") {
            Ok(key) => key,
            Err(e) => {
                debug!(error = %e, "API key prompt aborted");
                return writeln!(out, "{YELLOW}⚠ API key entry cancelled.{RESET}");
            }
        };
        if key.trim().is_empty() {
            return writeln!(out, "{YELLOW}⚠ Empty API key, operation cancelled.{RESET}");
        }

        let old_status = if self.store.has_key(API_KEY_ACCOUNT) {
            "present"
        } else {
            "missing"
        };
        match self.session.stage_api_key(&key) {
            Ok(()) => {
                writeln!(
                    out,
                    "{GREEN}✓ API key staged:{RESET} {DIM}{old_status}{RESET} → {BOLD}{GREEN}new key{RESET}"
                )?;
                writeln!(out, "{DIM}   Use commit to apply changes.{RESET}")
            }
            Err(e) => writeln!(out, "{RED}✗ {e}{RESET}"),
        }
    }

    fn key_status(&self) -> bool {
        self.store.has_key(API_KEY_ACCOUNT)
    }

    fn show(&self, target: ShowTarget, out: &mut dyn Write) -> io::Result<()> {
        let running = self.session.running();
        let staged = self.session.staged();
        match target {
            ShowTarget::Config => {
                writeln!(out, "\n{BOLD}{CYAN}Configuration Overview{RESET}\n")?;
                writeln!(out, "{BOLD}Active Configuration:{RESET}")?;
                writeln!(out, "   Mode: {GREEN}{}{RESET}", running.mode)?;
                writeln!(out, "   Model: {}", running.llm.model)?;
                writeln!(out, "   History lines: {}", running.history.lines)?;
                if self.key_status() {
                    writeln!(
                        out,
                        "   API Key: {BOLD}{GREEN}✓ Configured{RESET} (stored in keychain)"
                    )?;
                } else {
                    writeln!(out, "   API Key: {BOLD}{RED}✗ Missing{RESET}")?;
                }
                if self.session.has_pending_changes() {
                    writeln!(out, "\n{BOLD}{YELLOW}⚠ Pending Changes:{RESET}")?;
                    if staged.mode != running.mode {
                        writeln!(out, "   Mode: {YELLOW}{}{RESET} (staged)", staged.mode)?;
                    }
                    if self.session.has_staged_api_key() {
                        writeln!(out, "   API Key: {YELLOW}✓ New key staged{RESET}")?;
                    }
                    writeln!(out, "{DIM}   Use commit to apply or discard to cancel.{RESET}")?;
                }
                writeln!(out)
            }
            ShowTarget::Running => {
                writeln!(out, "\n{BOLD}{GREEN}Active Configuration:{RESET}")?;
                writeln!(out, "  Mode: {GREEN}{}{RESET}", running.mode)?;
                if self.key_status() {
                    writeln!(out, "  API Key: {BOLD}{GREEN}✓ Present{RESET}")?;
                } else {
                    writeln!(out, "  API Key: {BOLD}{RED}✗ Missing{RESET}")?;
                }
                writeln!(out)
            }
            ShowTarget::Staged => {
                if !self.session.has_pending_changes() {
                    return writeln!(out, "{YELLOW}ⓘ No staged changes.{RESET}");
                }
                writeln!(out, "\n{BOLD}{YELLOW}Staged Changes:{RESET}")?;
                let changes = self.session.pending_changes();
                if changes.contains(&"mode") {
                    writeln!(out, "  Mode: {YELLOW}{}{RESET}", staged.mode)?;
                }
                if changes.contains(&"api_key") {
                    writeln!(out, "  API Key: {YELLOW}✓ New key staged{RESET}")?;
                }
                if changes.is_empty() {
                    writeln!(out, "{DIM}  No changes detected.{RESET}")?;
                } else {
                    writeln!(out, "{DIM}  Use commit to apply these changes.{RESET}")?;
                }
                writeln!(out)
            }
        }
    }
}

fn show_help(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "\n{BOLD}Available Commands:{RESET}\n")?;
    writeln!(out, "{BOLD}{CYAN}Configuration Commands:{RESET}")?;
    writeln!(out, "  {CYAN}set mode <value>{RESET}        Set execution mode (strike|normal)")?;
    writeln!(out, "  {CYAN}set api_key{RESET}             Configure API key (secure input)\n")?;
    writeln!(out, "{BOLD}{CYAN}Information Commands:{RESET}")?;
    writeln!(out, "  {CYAN}show config{RESET}             Display current configuration")?;
    writeln!(out, "  {CYAN}show running{RESET}            Display active configuration")?;
    writeln!(out, "  {CYAN}show staged{RESET}             Display pending changes\n")?;
    writeln!(out, "{BOLD}{CYAN}Change Management:{RESET}")?;
    writeln!(out, "  {CYAN}commit{RESET}                  Apply staged changes")?;
    writeln!(out, "  {CYAN}discard{RESET}                 Cancel staged changes\n")?;
    writeln!(out, "{BOLD}{CYAN}General Commands:{RESET}")?;
    writeln!(out, "  {CYAN}help{RESET} or {CYAN}?{RESET}               Show this help")?;
    writeln!(
        out,
        "  {CYAN}exit{RESET} or {CYAN}quit{RESET}            Leave configuration shell\n"
    )?;
    writeln!(out, "{BOLD}Execution Modes:{RESET}")?;
    writeln!(out, "  {GREEN}normal{RESET}  - Safe mode: shows suggestions without auto-execution")?;
    writeln!(
        out,
        "  {YELLOW}strike{RESET}  - Fast mode: auto-executes commands when AI is confident\n"
    )?;
    writeln!(out, "{DIM}Note: Changes are staged until you run 'commit' to apply them.{RESET}\n")
}

/// Run the shell until the user leaves.
pub(crate) fn run(
    session: ConfigSession,
    store: &dyn CredentialStore,
) -> anyhow::Result<()> {
    let history_file = session.paths().shell_history_file();
    let prompter = DialoguerPrompter;
    let mut shell = ConfigShell::new(session, store, &prompter);

    let mut rl = Editor::<ConfigHelper, DefaultHistory>::new()?;
    rl.set_helper(Some(ConfigHelper));
    if rl.load_history(&history_file).is_err() {
        debug!(path = %history_file.display(), "No config shell history yet");
    }

    let mut stdout = io::stdout();
    shell.banner(&mut stdout)?;

    loop {
        match rl.readline(&shell.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                if shell.handle_line(&line, &mut stdout)? == Flow::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                shell.interrupt(&mut stdout)?;
                break;
            }
            Err(e) => {
                shell.interrupt(&mut stdout)?;
                return Err(e.into());
            }
        }
    }

    if let Err(e) = rl.save_history(&history_file) {
        warn!(error = %e, "Could not save config shell history");
    }
    writeln!(stdout, "{DIM}Configuration shell closed.{RESET}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use askit_core::credentials::InMemoryCredentialStore;
    use askit_core::paths::AppPaths;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    #[derive(Default)]
    struct ScriptedPrompter {
        secrets: RefCell<VecDeque<String>>,
        confirms: RefCell<VecDeque<bool>>,
    }

    impl ShellPrompter for ScriptedPrompter {
        fn read_secret(&self, _prompt: &str) -> io::Result<String> {
            self.secrets
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| io::Error::from(io::ErrorKind::Interrupted))
        }

        fn confirm(&self, _prompt: &str) -> io::Result<bool> {
            Ok(self.confirms.borrow_mut().pop_front().unwrap_or(false))
        }
    }

    fn run_lines(shell: &mut ConfigShell<'_>, lines: &[&str]) -> String {
        let mut out = Vec::new();
        for line in lines {
            shell.handle_line(line, &mut out).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ShellCommand::parse("  "), Ok(ShellCommand::Empty));
        assert_eq!(
            ShellCommand::parse("SET MODE Strike"),
            Ok(ShellCommand::SetMode(ExecutionMode::Strike))
        );
        assert_eq!(ShellCommand::parse("set api_key"), Ok(ShellCommand::SetApiKey));
        assert_eq!(
            ShellCommand::parse("show staged"),
            Ok(ShellCommand::Show(ShowTarget::Staged))
        );
        assert_eq!(ShellCommand::parse("?"), Ok(ShellCommand::Help));
        assert_eq!(ShellCommand::parse("quit"), Ok(ShellCommand::Exit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ShellCommand::parse("set"), Err(ParseError::MissingSetParameter));
        assert_eq!(ShellCommand::parse("set mode"), Err(ParseError::MissingModeValue));
        assert_eq!(
            ShellCommand::parse("set mode turbo"),
            Err(ParseError::InvalidMode("turbo".into()))
        );
        assert_eq!(
            ShellCommand::parse("set colour red"),
            Err(ParseError::UnknownSetParameter("colour".into()))
        );
        assert_eq!(
            ShellCommand::parse("show everything"),
            Err(ParseError::UnknownShowTarget("everything".into()))
        );
        assert_eq!(
            ShellCommand::parse("rm -rf"),
            Err(ParseError::UnknownCommand("rm -rf".into()))
        );
    }

    #[test]
    fn test_completion_is_nested() {
        assert_eq!(complete_words("s"), (0, vec!["set", "show"]));
        assert_eq!(complete_words("set "), (4, vec!["mode", "api_key"]));
        assert_eq!(complete_words("set mode s"), (9, vec!["strike"]));
        assert_eq!(complete_words("show r"), (5, vec!["running"]));
        assert_eq!(complete_words("commit x"), (7, Vec::<&str>::new()));
    }

    #[test]
    fn test_stage_commit_flow() {
        let dir = TempDir::new().unwrap();
        let session = ConfigSession::open(AppPaths::rooted(dir.path())).unwrap();
        let store = InMemoryCredentialStore::new();
        let prompter = ScriptedPrompter::default();
        prompter.secrets.borrow_mut().push_back("sk-ant-xyz".into());
        let mut shell = ConfigShell::new(session, &store, &prompter);

        assert_eq!(shell.prompt(), format!("{CYAN}askit-config> {RESET}"));
        let out = run_lines(&mut shell, &["set mode strike", "set api_key"]);
        assert!(out.contains("Mode changed:"));
        assert!(out.contains("API key staged:"));
        assert!(shell.prompt().contains('*'));

        let out = run_lines(&mut shell, &["show staged", "commit"]);
        assert!(out.contains("Mode: \x1b[33mstrike"));
        assert!(out.contains("API key applied to system keychain."));
        assert!(out.contains("Configuration committed and applied successfully."));
        assert_eq!(store.get_key(API_KEY_ACCOUNT).unwrap(), "sk-ant-xyz");
        assert!(!shell.prompt().contains('*'));
    }

    #[test]
    fn test_empty_api_key_is_not_staged() {
        let dir = TempDir::new().unwrap();
        let session = ConfigSession::open(AppPaths::rooted(dir.path())).unwrap();
        let store = InMemoryCredentialStore::new();
        let prompter = ScriptedPrompter::default();
        prompter.secrets.borrow_mut().push_back("   ".into());
        let mut shell = ConfigShell::new(session, &store, &prompter);

        let out = run_lines(&mut shell, &["set api_key", "show staged"]);
        assert!(out.contains("Empty API key, operation cancelled."));
        assert!(out.contains("No staged changes."));
    }

    #[test]
    fn test_discard_lists_settings() {
        let dir = TempDir::new().unwrap();
        let session = ConfigSession::open(AppPaths::rooted(dir.path())).unwrap();
        let store = InMemoryCredentialStore::new();
        let prompter = ScriptedPrompter::default();
        let mut shell = ConfigShell::new(session, &store, &prompter);

        let out = run_lines(&mut shell, &["discard", "set mode strike", "discard"]);
        assert!(out.contains("No pending changes to discard."));
        assert!(out.contains("Staged changes discarded:\x1b[0m mode"));
    }

    #[test]
    fn test_exit_with_pending_changes_asks_first() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::rooted(dir.path());
        let session = ConfigSession::open(paths.clone()).unwrap();
        let store = InMemoryCredentialStore::new();
        let prompter = ScriptedPrompter::default();
        prompter.confirms.borrow_mut().extend([false, true]);
        let mut shell = ConfigShell::new(session, &store, &prompter);
        let mut out = Vec::new();

        shell.handle_line("set mode strike", &mut out).unwrap();
        assert_eq!(shell.handle_line("exit", &mut out).unwrap(), Flow::Continue);
        assert_eq!(shell.handle_line("exit", &mut out).unwrap(), Flow::Exit);
        assert!(!paths.lock_file().exists());
        assert!(!paths.config_file().exists());
    }

    #[test]
    fn test_interrupt_discards_staging_files() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::rooted(dir.path());
        let session = ConfigSession::open(paths.clone()).unwrap();
        let store = InMemoryCredentialStore::new();
        let prompter = ScriptedPrompter::default();
        let mut shell = ConfigShell::new(session, &store, &prompter);
        let mut out = Vec::new();

        shell.handle_line("set mode strike", &mut out).unwrap();
        shell.interrupt(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Uncommitted changes discarded."));
        assert!(!paths.lock_file().exists());
        assert!(!paths.staged_config_file().exists());
    }
}
