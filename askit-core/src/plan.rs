//! Agent plan extraction.
//!
//! A single line-oriented pass over an AGENT explanation classifies every
//! fenced block exactly once:
//!
//! - a block opened with a shell tag (```` ```bash ````) contributes one
//!   [`Step::Shell`] per non-blank line;
//! - a block opened on the line right after a `FILE: <path>` marker
//!   (any tag, or none) contributes one [`Step::File`];
//! - any other block is ignored.
//!
//! The text must already have every `{{USER_INPUT:...}}` placeholder
//! substituted; see [`crate::input`].

use crate::types::{Plan, Step};
use tracing::debug;

const FENCE: &str = "```";
const FILE_MARKER: &str = "FILE:";
const SHELL_TAGS: [&str; 3] = ["bash", "sh", "shell"];

#[derive(Debug)]
enum BlockKind {
    Shell,
    File(String),
    Other,
}

#[derive(Debug)]
enum ScanState<'a> {
    Text {
        /// Path of a `FILE:` marker on the previous line, if any.
        pending_file: Option<String>,
    },
    InBlock {
        kind: BlockKind,
        body: Vec<&'a str>,
    },
}

/// Extract the ordered plan from a fully substituted explanation.
pub fn extract_plan(text: &str) -> Plan {
    let mut plan = Plan::default();
    let mut state = ScanState::Text { pending_file: None };

    for line in text.lines() {
        state = match state {
            ScanState::InBlock { kind, mut body } => {
                if is_fence_close(line) {
                    finish_block(kind, &body, &mut plan);
                    ScanState::Text { pending_file: None }
                } else {
                    body.push(line);
                    ScanState::InBlock { kind, body }
                }
            }
            ScanState::Text { pending_file } => match fence_open_tag(line) {
                Some(tag) => {
                    let kind = match pending_file {
                        Some(path) => BlockKind::File(path),
                        None if is_shell_tag(tag) => BlockKind::Shell,
                        None => BlockKind::Other,
                    };
                    ScanState::InBlock {
                        kind,
                        body: Vec::new(),
                    }
                }
                None => {
                    if let Some(orphan) = pending_file {
                        plan.orphan_file_markers.push(orphan);
                    }
                    ScanState::Text {
                        pending_file: file_marker_path(line),
                    }
                }
            },
        };
    }

    match state {
        ScanState::Text {
            pending_file: Some(path),
        } => plan.orphan_file_markers.push(path),
        ScanState::InBlock { kind, body } => {
            debug!(?kind, lines = body.len(), "Dropping unterminated fenced block");
            if let BlockKind::File(path) = kind {
                plan.orphan_file_markers.push(path);
            }
        }
        ScanState::Text { pending_file: None } => {}
    }

    debug!(
        steps = plan.steps.len(),
        orphan_markers = plan.orphan_file_markers.len(),
        "Extracted agent plan"
    );
    plan
}

fn finish_block(kind: BlockKind, body: &[&str], plan: &mut Plan) {
    match kind {
        BlockKind::Shell => plan.steps.extend(
            body.iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .map(Step::shell),
        ),
        BlockKind::File(path) => {
            let content = body.join("\n");
            plan.steps.push(Step::file(path, content.trim()));
        }
        BlockKind::Other => {}
    }
}

/// Return the language tag if `line` opens a fenced block.
///
/// Any line starting with a fence opens one; the tag is the first word of the
/// info string, so "```bash title" is a bash block.
fn fence_open_tag(line: &str) -> Option<&str> {
    let info = line.trim_start().strip_prefix(FENCE)?;
    Some(info.split_whitespace().next().unwrap_or(""))
}

fn is_fence_close(line: &str) -> bool {
    line.trim() == FENCE
}

fn is_shell_tag(tag: &str) -> bool {
    SHELL_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '/' | '\\' | '{' | '}' | '-')
}

/// Return the path if `line` is a `FILE: <path>` marker.
fn file_marker_path(line: &str) -> Option<String> {
    let path = line.trim_start().strip_prefix(FILE_MARKER)?.trim();
    if path.is_empty() || !path.chars().all(is_path_char) {
        return None;
    }
    Some(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_two_bash_blocks_yield_steps_in_order() {
        let text = "First:\n```bash\nmkdir app\n\ncd app\n```\nThen:\n```bash\ngit init\nnpm init -y\n   \nnpm install express\n```";
        let plan = extract_plan(text);
        assert_eq!(
            plan.shell_commands(),
            vec![
                "mkdir app",
                "cd app",
                "git init",
                "npm init -y",
                "npm install express"
            ]
        );
    }

    #[test]
    fn test_file_marker_with_block() {
        let plan = extract_plan("FILE: out/app.txt\n```\nhello\n```");
        assert_eq!(plan.steps, vec![Step::file("out/app.txt", "hello")]);
    }

    #[test]
    fn test_file_content_is_trimmed_and_keeps_inner_lines() {
        let text = "FILE: src/main.py\n```python\n\nimport os\n\nprint(os.getcwd())\n\n```";
        let plan = extract_plan(text);
        assert_eq!(
            plan.files(),
            vec![("src/main.py", "import os\n\nprint(os.getcwd())")]
        );
    }

    #[test]
    fn test_bash_block_after_file_marker_is_file_content_only() {
        let text = "FILE: scripts/run.sh\n```bash\necho hi\n```";
        let plan = extract_plan(text);
        assert!(plan.shell_commands().is_empty());
        assert_eq!(plan.files(), vec![("scripts/run.sh", "echo hi")]);
    }

    #[test]
    fn test_untagged_and_other_blocks_are_ignored() {
        let text = "```\nnot a command\n```\n```json\n{\"a\": 1}\n```\n```bash\nls\n```";
        let plan = extract_plan(text);
        assert_eq!(plan.steps, vec![Step::shell("ls")]);
    }

    #[test]
    fn test_orphan_file_marker_yields_no_step() {
        let text = "FILE: notes.txt\nThis file should contain notes.\n```bash\nls\n```";
        let plan = extract_plan(text);
        assert_eq!(plan.steps, vec![Step::shell("ls")]);
        assert_eq!(plan.orphan_file_markers, vec!["notes.txt".to_string()]);
    }

    #[test]
    fn test_orphan_file_marker_at_end_of_text() {
        let plan = extract_plan("Done.\nFILE: final.txt");
        assert!(plan.is_empty());
        assert_eq!(plan.orphan_file_markers, vec!["final.txt".to_string()]);
    }

    #[test]
    fn test_unterminated_block_is_dropped() {
        let plan = extract_plan("```bash\nrm -rf build\n");
        assert!(plan.is_empty());
    }

    #[test]
    fn test_fence_inside_other_block_does_not_open_shell_block() {
        let text = "```markdown\nExample:\n```bash\n```\nafter\n```bash\npwd\n```";
        // The markdown block closes at the first bare fence; "```bash" inside it is body text.
        let plan = extract_plan(text);
        assert_eq!(plan.steps, vec![Step::shell("pwd")]);
    }

    #[test]
    fn test_mixed_plan_preserves_source_order() {
        let text = "```bash\nmkdir -p site\n```\nFILE: site/index.html\n```html\n<h1>Hi</h1>\n```\n```bash\nls site\n```";
        let plan = extract_plan(text);
        assert_eq!(
            plan.steps,
            vec![
                Step::shell("mkdir -p site"),
                Step::file("site/index.html", "<h1>Hi</h1>"),
                Step::shell("ls site"),
            ]
        );
    }

    #[test]
    fn test_fence_with_info_string_keeps_following_block() {
        let plan = extract_plan("```bash x\nls\n```\n```bash\npwd\n```");
        assert_eq!(plan.shell_commands(), vec!["ls", "pwd"]);

        let plan = extract_plan("```python title=\"demo.py\"\nprint(1)\n```\n```sh\nmake\n```");
        assert_eq!(plan.shell_commands(), vec!["make"]);
    }

    #[test]
    fn test_file_marker_path_rules() {
        assert_eq!(file_marker_path("FILE: a/b.txt"), Some("a/b.txt".into()));
        assert_eq!(file_marker_path("FILE:  {app}/x-y_z.rs  "), Some("{app}/x-y_z.rs".into()));
        assert_eq!(file_marker_path("FILE: a b.txt"), None);
        assert_eq!(file_marker_path("FILE:"), None);
        assert_eq!(file_marker_path("PROFILE: x"), None);
    }

    #[test]
    fn test_crlf_line_endings() {
        let plan = extract_plan("```bash\r\necho one\r\n```\r\n");
        assert_eq!(plan.steps, vec![Step::shell("echo one")]);
    }
}
