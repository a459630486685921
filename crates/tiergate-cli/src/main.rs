//! `tiergate`: command-line client for the tiergate server.
//!
//! # Usage
//!
//! ```
//! tiergate --identity 6f1c..  whoami
//! tiergate --config ~/.config/tiergate/cli.toml search alice --limit 5
//! TIERGATE_IDENTITY=6f1c.. tiergate set-role 0b2e.. paid
//! ```

mod client;

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use serde::Deserialize;
use tiergate_core::{
  Identity,
  gate::{AccessDecision, QuotaScope, ReasonCode},
};

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tiergate", about = "Query and manage tiergate subscriptions")]
struct Args {
  /// Path to a TOML config file (url, identity).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the tiergate server (default: http://localhost:8080).
  #[arg(long, env = "TIERGATE_URL")]
  url: Option<String>,

  /// Identity to act as, sent in the x-identity header.
  #[arg(long, env = "TIERGATE_IDENTITY")]
  identity: Option<Identity>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Register the calling identity.
  Register {
    email:     String,
    #[arg(long)]
    name:      Option<String>,
    #[arg(long)]
    phone:     Option<String>,
  },
  /// Show the caller's subscription summary.
  Whoami,
  /// Ask whether the caller may enter the admin area.
  CanAdmin,
  /// Ask whether the caller may proceed to a path.
  CanCreate {
    #[arg(long, default_value = "/listings/create")]
    path: String,
  },
  /// Reserve one resource slot for the caller.
  Claim,
  /// Return one resource slot.
  Release,
  /// List roles with their quotas and benefits.
  Roles,
  /// Search accounts by email or name (admin).
  Search {
    #[arg(default_value = "")]
    term:   String,
    #[arg(long)]
    limit:  Option<usize>,
    #[arg(long)]
    offset: Option<usize>,
  },
  /// Show one account (admin).
  Show { id: Identity },
  /// Replace role, status and validity window (admin).
  SetSubscription {
    id:     Identity,
    #[arg(long)]
    role:   String,
    #[arg(long)]
    status: String,
    /// RFC 3339 start of the validity window.
    #[arg(long)]
    from:   Option<DateTime<Utc>>,
    /// RFC 3339 end of the validity window.
    #[arg(long)]
    until:  Option<DateTime<Utc>>,
  },
  /// Change only the role (admin).
  SetRole { id: Identity, role: String },
  /// Dashboard counts (admin).
  Stats,
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  identity: Option<Identity>,
}

/// CLI flags override the config file, which overrides defaults.
fn resolve(url: Option<String>, identity: Option<Identity>, file: ConfigFile) -> ApiConfig {
  ApiConfig {
    base_url: url
      .or_else(|| (!file.url.is_empty()).then_some(file.url))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    identity: identity.or(file.identity),
  }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode> {
  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let client = ApiClient::new(resolve(args.url, args.identity, file_cfg))?;
  run(&client, args.command).await
}

async fn run(client: &ApiClient, command: Command) -> Result<ExitCode> {
  match command {
    Command::Register { email, name, phone } => {
      print_json(&client.register(&email, name.as_deref(), phone.as_deref()).await?)?
    }
    Command::Whoami => print_json(&client.whoami().await?)?,
    Command::CanAdmin => return Ok(print_decision(&client.can_admin().await?)),
    Command::CanCreate { path } => return Ok(print_decision(&client.can_create(&path).await?)),
    Command::Claim => return Ok(print_decision(&client.claim().await?)),
    Command::Release => {
      client.release().await?;
      println!("released");
    }
    Command::Roles => print_json(&client.roles().await?)?,
    Command::Search { term, limit, offset } => {
      for user in client.search(&term, limit, offset).await? {
        println!(
          "{}  {:<32}  {:<6}  {:<8}  {}",
          user.identity, user.email, user.role, user.status, user.resource_count
        );
      }
    }
    Command::Show { id } => print_json(&client.show(id).await?)?,
    Command::SetSubscription { id, role, status, from, until } => {
      print_json(&client.set_subscription(id, &role, &status, from, until).await?)?
    }
    Command::SetRole { id, role } => print_json(&client.set_role(id, &role).await?)?,
    Command::Stats => print_json(&client.stats().await?)?,
  }
  Ok(ExitCode::SUCCESS)
}

// ─── Output ──────────────────────────────────────────────────────────────────

fn print_json(value: &impl serde::Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value).context("encoding output")?);
  Ok(())
}

/// Print a decision and map it to the exit status: 0 if allowed, 1 if not.
fn print_decision(decision: &AccessDecision) -> ExitCode {
  let verdict = if decision.allowed { "allowed" } else { "denied" };
  println!("{verdict} ({}): {}", reason_label(decision.reason), decision.message);
  if decision.allowed { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn reason_label(reason: ReasonCode) -> &'static str {
  match reason {
    ReasonCode::Granted => "granted",
    ReasonCode::NotGated => "not gated",
    ReasonCode::InsufficientRole => "insufficient role",
    ReasonCode::QuotaExceeded(QuotaScope::Free) => "free quota exceeded",
    ReasonCode::QuotaExceeded(QuotaScope::Other) => "quota exceeded",
    ReasonCode::UnknownIdentity => "unknown identity",
    ReasonCode::StoreUnavailable => "store unavailable",
  }
}
