// ABOUTME: regex-based extraction of bracketed command directives, with source
// ABOUTME: spans, from free-form llm output.

use std::sync::LazyLock;

use regex::Regex;
use warden_common::{Command, CommandKind};

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(OPEN|WRITE|EXEC|SEARCH):\s*([^\]]+?)\s*\]").expect("directive regex")
});

// A fenced block immediately following a WRITE directive carries its payload.
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A\s*```[^\n]*\n(.*?)```").expect("fence regex"));

/// Extracts the ordered list of commands embedded in `text`.
///
/// Recognized forms: `[OPEN: path]`, `[SEARCH: query]`, `[EXEC: command]`,
/// and `[WRITE: path]` followed by a fenced code block with the payload.
/// Each command carries the byte span and original text it was cut from.
pub fn parse_commands(text: &str) -> Vec<Command> {
    let mut commands = Vec::new();
    for caps in DIRECTIVE.captures_iter(text) {
        let matched = caps.get(0).expect("whole match");
        let kind = match &caps[1] {
            "OPEN" => CommandKind::Open,
            "WRITE" => CommandKind::Write,
            "EXEC" => CommandKind::Exec,
            "SEARCH" => CommandKind::Search,
            _ => continue,
        };
        let argument = caps[2].trim().to_string();

        let mut end = matched.end();
        let mut content = None;
        if kind == CommandKind::Write {
            if let Some(fence) = FENCE.captures(&text[matched.end()..]) {
                content = Some(fence.get(1).expect("fence body").as_str().to_string());
                end = matched.end() + fence.get(0).expect("fence match").end();
            }
        }

        commands.push(Command {
            kind,
            argument,
            content,
            span: None,
        }
        .with_span(matched.start(), end, &text[matched.start()..end]));
    }
    commands
}
