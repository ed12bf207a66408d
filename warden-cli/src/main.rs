// ABOUTME: cli front door: loads policy, builds the executor, and feeds it
// ABOUTME: commands extracted from piped or interactive llm output.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use warden_cli::{parser, render};
use warden_common::Config;
use warden_core::{AuditLogger, Executor};

#[derive(Debug, Parser)]
#[command(
    name = "warden",
    about = "Mediates llm-issued open/write/exec/search commands inside a repository boundary"
)]
struct Args {
    /// JSON policy file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Repository root override.
    #[arg(long)]
    repo_root: Option<PathBuf>,

    #[arg(long, default_value = "./warden-audit.log")]
    audit_path: PathBuf,

    /// Emit the JSON schema for the config file and exit.
    #[arg(long)]
    print_schema: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.print_schema {
        let schema = schemars::schema_for!(Config);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("load {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(root) = &args.repo_root {
        config.repository_root = root.clone();
    }
    config.validate()?;

    let audit = Arc::new(AuditLogger::to_file(&args.audit_path));
    let executor = Executor::new(Arc::new(config), Some(audit));

    if std::io::stdin().is_terminal() {
        interactive(&executor).await
    } else {
        pipe(&executor).await
    }
}

async fn pipe(executor: &Executor) -> anyhow::Result<()> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("read stdin")?;

    let commands = parser::parse_commands(&input);
    if commands.is_empty() {
        eprintln!("no commands found in input");
        return Ok(());
    }
    for command in &commands {
        let result = executor.execute(command).await;
        print!("{}", render::render(&result));
    }
    Ok(())
}

async fn interactive(executor: &Executor) -> anyhow::Result<()> {
    eprintln!(
        "warden session {}; directives: [OPEN: path] [WRITE: path] [EXEC: cmd] [SEARCH: query]; 'exit' to quit",
        executor.session().id()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        let commands = parser::parse_commands(line);
        if commands.is_empty() {
            eprintln!("no directive in line");
            continue;
        }
        for command in &commands {
            let result = executor.execute(command).await;
            print!("{}", render::render(&result));
        }
    }

    eprintln!(
        "session {} finished, {} commands run",
        executor.session().id(),
        executor.session().commands_run()
    );
    Ok(())
}
