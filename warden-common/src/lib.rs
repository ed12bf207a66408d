// ABOUTME: defines the shared command protocol, result envelopes, and policy config
// ABOUTME: used by the warden mediation core and its front-door clients.

mod command;
mod config;
mod error;
mod result;

pub use command::{Command, CommandKind, SourceSpan};
pub use config::{Config, ConfigError, ExecConfig, SearchConfig};
pub use error::{ErrorKind, MediationError};
pub use result::{ExecOutcome, ExecutionResult, SearchHit, WriteAction, WriteOutcome};
