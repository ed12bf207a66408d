// ABOUTME: trust-mediation core confining llm-requested file, exec, and search
// ABOUTME: operations to a repository boundary with audit logging throughout.

pub mod audit;
pub mod executor;
pub mod extension;
pub mod files;
pub mod path;
pub mod sandbox;
pub mod search;
pub mod session;

pub use audit::AuditLogger;
pub use executor::Executor;
pub use files::{FileCapability, FileHandler};
pub use sandbox::{ContainerRuntime, DockerCli, ExecCapability, ExecSandbox};
pub use search::{SearchProvider, WalkdirSearch};
pub use session::Session;
