//! CLI for the dlite manager client. Each invocation performs one call.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dlite_core::config::{self, DliteConfig};
use dlite_core::transport::CurlTransport;
use dlite_core::{CancelScope, ManagerClient, StaticToken, TaskCode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use commands::{run_acquire, run_heartbeat, run_poll, run_register, run_send_status};

/// Top-level CLI for the dlite delegate client.
#[derive(Debug, Parser)]
#[command(name = "dlite")]
#[command(about = "dlite: talk to a task dispatch manager as a delegate", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Overrides for values normally read from config.toml.
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Config file to use instead of ~/.config/dlite/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Manager base URL.
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    #[arg(long, global = true, value_name = "ID")]
    pub account_id: Option<String>,

    /// Delegate token (overrides DLITE_TOKEN and the config file).
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Do not verify the manager's TLS certificate.
    #[arg(long, global = true)]
    pub skip_verify: bool,

    /// Give up on the call (including retries) after this many seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Delegate identity fields sent on register and heartbeat.
#[derive(Debug, Args)]
pub struct IdentityArgs {
    /// Delegate name.
    #[arg(long, default_value = "dlite")]
    pub name: String,

    /// Comma-separated delegate tags.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Host name reported to the manager (defaults to $HOSTNAME).
    #[arg(long)]
    pub host_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CodeArg {
    Ok,
    Failed,
}

impl From<CodeArg> for TaskCode {
    fn from(code: CodeArg) -> Self {
        match code {
            CodeArg::Ok => TaskCode::Ok,
            CodeArg::Failed => TaskCode::Failed,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Register this delegate and print the assigned id.
    Register {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Send one heartbeat.
    Heartbeat {
        /// Delegate id returned by register.
        #[arg(long)]
        id: String,

        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// List pending task events for a delegate.
    Poll {
        /// Delegate id returned by register.
        #[arg(long)]
        id: String,
    },

    /// Acquire a task and print it as JSON.
    Acquire {
        /// Delegate id returned by register.
        #[arg(long)]
        id: String,

        /// Task identifier from poll.
        task_id: String,
    },

    /// Report the outcome of a task.
    SendStatus {
        /// Delegate id returned by register.
        #[arg(long)]
        id: String,

        /// Task identifier.
        task_id: String,

        #[arg(long, value_enum, default_value = "ok")]
        code: CodeArg,

        /// Task type echoed back to the manager.
        #[arg(long = "type", value_name = "TYPE")]
        task_type: Option<String>,

        /// Result payload as a JSON document.
        #[arg(long, value_name = "JSON")]
        data: Option<String>,
    },
}

impl Cli {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = cli.global.resolve_config()?;
        tracing::debug!(endpoint = %cfg.endpoint, account_id = %cfg.account_id, "loaded config");
        let client = build_client(&cfg, cli.global.token.as_deref())?;
        let scope = cli.global.scope();

        match cli.command {
            CliCommand::Register { identity } => run_register(&client, &identity, &scope)?,
            CliCommand::Heartbeat { id, identity } => {
                run_heartbeat(&client, &id, &identity, &scope)?
            }
            CliCommand::Poll { id } => run_poll(&client, &id, &scope)?,
            CliCommand::Acquire { id, task_id } => run_acquire(&client, &id, &task_id, &scope)?,
            CliCommand::SendStatus {
                id,
                task_id,
                code,
                task_type,
                data,
            } => run_send_status(
                &client,
                &id,
                &task_id,
                code.into(),
                task_type.unwrap_or_default(),
                data.as_deref(),
                &scope,
            )?,
        }

        Ok(())
    }
}

impl GlobalArgs {
    /// Config file plus command-line overrides, validated.
    pub fn resolve_config(&self) -> Result<DliteConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        self.apply(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply(&self, cfg: &mut DliteConfig) {
        if let Some(endpoint) = &self.endpoint {
            cfg.endpoint = endpoint.clone();
        }
        if let Some(account_id) = &self.account_id {
            cfg.account_id = account_id.clone();
        }
        if self.skip_verify {
            cfg.skip_verify = true;
        }
    }

    fn scope(&self) -> CancelScope {
        match self.timeout {
            Some(secs) => CancelScope::with_timeout(Duration::from_secs(secs)),
            None => CancelScope::new(),
        }
    }
}

/// `--token` beats `DLITE_TOKEN`, which beats the config file.
fn select_token(cfg: &DliteConfig, token_flag: Option<&str>) -> Result<String> {
    cfg.resolve_token_with(token_flag)
        .context("no delegate token: pass --token, set DLITE_TOKEN or add token to config.toml")
}

fn build_client(cfg: &DliteConfig, token_flag: Option<&str>) -> Result<ManagerClient> {
    let token = select_token(cfg, token_flag)?;
    let transport = CurlTransport::new(cfg.transport_options());
    Ok(ManagerClient::with_transport(
        cfg.endpoint.clone(),
        cfg.account_id.clone(),
        Arc::new(StaticToken::new(token)),
        Arc::new(transport),
        cfg.client_options(),
    ))
}

#[cfg(test)]
mod tests;
