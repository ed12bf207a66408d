use std::fmt;

use serde::{Deserialize, Serialize};

/// The four mediated request types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Open,
    Write,
    Exec,
    Search,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Open => "open",
            CommandKind::Write => "write",
            CommandKind::Exec => "exec",
            CommandKind::Search => "search",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the source text a command was extracted from.
///
/// Consumed only by the formatting layer; the executor ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
    pub original: String,
}

/// One request extracted from model output: a path, query, or shell string,
/// plus an optional write payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub argument: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
}

impl Command {
    pub fn open(argument: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Open,
            argument: argument.into(),
            content: None,
            span: None,
        }
    }

    pub fn write(argument: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Write,
            argument: argument.into(),
            content: Some(content.into()),
            span: None,
        }
    }

    pub fn exec(argument: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Exec,
            argument: argument.into(),
            content: None,
            span: None,
        }
    }

    pub fn search(argument: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Search,
            argument: argument.into(),
            content: None,
            span: None,
        }
    }

    pub fn with_span(mut self, start: usize, end: usize, original: impl Into<String>) -> Self {
        self.span = Some(SourceSpan {
            start,
            end,
            original: original.into(),
        });
        self
    }
}
