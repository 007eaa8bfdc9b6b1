//! APAAI accountability protocol: demo CLI
//!
//! Drives the action lifecycle against a live APAAI service, or against the
//! in-process reference transport with `--offline`.
//!
//! Usage:
//!   cargo run -p apaai-demo -- --offline send-email
//!   cargo run -p apaai-demo -- propose --type send_email --actor mail-bot --target mailto:a@b.com
//!   cargo run -p apaai-demo -- evidence <ACTION_ID> --check email_sent=true:id=msg_1
//!   cargo run -p apaai-demo -- approve <ACTION_ID> --approver sarah
//!   APAAI_ENDPOINT=https://apaai.example.com cargo run -p apaai-demo -- list-actions --status requires-approval

use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use apaai_contracts::{
    ActionFilters, Actor, ActorKind, ApaaiError, ApaaiResult, Check, Decision, DecisionStatus,
    Policy, PolicyRule,
};
use apaai_core::{normalize::new_action_id, with_action, AccountabilityLayer, ActionHooks, Proposal};
use apaai_http::ClientConfig;
use apaai_memory::InMemoryTransport;

type DemoResult = Result<(), Box<dyn Error>>;

// ── CLI definition ────────────────────────────────────────────────────────────

/// APAAI: accountability for autonomous agent actions.
///
/// Propose actions, approve or reject them, and attach evidence of what
/// actually happened.
#[derive(Parser)]
#[command(
    name = "apaai-demo",
    about = "APAAI accountability protocol demo",
    long_about = "Runs the APAAI action lifecycle (propose, approve, execute, evidence)\n\
                  against a live service or, with --offline, an in-process transport."
)]
struct Cli {
    /// Base URL of the APAAI service.
    #[arg(long, env = "APAAI_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Bearer credential for the APAAI service.
    #[arg(long, env = "APAAI_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// TOML client configuration file. Flags and environment override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-process transport instead of the network.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full lifecycle walkthrough: propose, approve if required, send, attest.
    SendEmail {
        #[arg(long, default_value = "sarah@acme.com")]
        to: String,
        #[arg(long, default_value = "Pricing")]
        subject: String,
        /// Simulate a delivery failure to show failure evidence.
        #[arg(long)]
        fail: bool,
    },
    /// Propose an action and print the decision.
    Propose {
        #[arg(long = "type")]
        action_type: String,
        /// Actor name.
        #[arg(long)]
        actor: String,
        #[arg(long, value_enum, default_value_t = KindArg::Agent)]
        kind: KindArg,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        target: Option<String>,
        /// Action parameters as a JSON object.
        #[arg(long)]
        params: Option<String>,
        #[arg(long)]
        id: Option<String>,
    },
    /// Attach evidence to an action.
    Evidence {
        action_id: String,
        /// `name=pass[:note]`, e.g. `email_sent=true:id=msg_1`. Repeatable.
        #[arg(long = "check", required = true)]
        checks: Vec<String>,
    },
    /// Approve an action awaiting approval.
    Approve {
        action_id: String,
        #[arg(long)]
        approver: Option<String>,
    },
    /// Reject an action awaiting approval.
    Reject {
        action_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Print the policy for an action type, or the default policy.
    Policy {
        #[arg(long = "type")]
        action_type: Option<String>,
    },
    /// Report the recorded decision for an action.
    Evaluate { action_id: String },
    GetAction { action_id: String },
    ListActions {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long = "type")]
        action_type: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    GetEvidence { action_id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Agent,
    Human,
    System,
}

impl From<KindArg> for ActorKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Agent => ActorKind::Agent,
            KindArg::Human => ActorKind::Human,
            KindArg::System => ActorKind::System,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Approved,
    Rejected,
    RequiresApproval,
    Observed,
}

impl From<StatusArg> for DecisionStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Approved => DecisionStatus::Approved,
            StatusArg::Rejected => DecisionStatus::Rejected,
            StatusArg::RequiresApproval => DecisionStatus::RequiresApproval,
            StatusArg::Observed => DecisionStatus::Observed,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> DemoResult {
    let layer = build_layer(&cli)?;

    match cli.command {
        Command::SendEmail { to, subject, fail } => run_send_email(&layer, &to, &subject, fail),
        Command::Propose {
            action_type,
            actor,
            kind,
            provider,
            target,
            params,
            id,
        } => {
            let mut actor = Actor::new(kind.into(), actor);
            actor.provider = provider;
            let mut proposal = Proposal::new(action_type, actor);
            if let Some(target) = target {
                proposal = proposal.target(target);
            }
            if let Some(params) = params {
                proposal = proposal.params(parse_params(&params)?);
            }
            if let Some(id) = id {
                proposal = proposal.id(id);
            }
            print_json(&layer.propose(proposal)?)
        }
        Command::Evidence { action_id, checks } => {
            let checks = checks.iter().map(|c| parse_check(c)).collect::<ApaaiResult<Vec<_>>>()?;
            print_json(&layer.evidence(&action_id, checks)?)
        }
        Command::Approve { action_id, approver } => {
            print_json(&layer.human().approve(&action_id, approver.as_deref())?)
        }
        Command::Reject { action_id, reason } => {
            print_json(&layer.human().reject(&action_id, reason.as_deref())?)
        }
        Command::Policy { action_type } => print_json(&layer.policy(action_type.as_deref())?),
        Command::Evaluate { action_id } => print_json(&layer.policies().evaluate(&action_id)?),
        Command::GetAction { action_id } => print_json(&layer.actions().get(&action_id)?),
        Command::ListActions {
            status,
            action_type,
            limit,
        } => {
            let mut filters = ActionFilters::new();
            if let Some(status) = status {
                filters = filters.status(status.into());
            }
            if let Some(action_type) = action_type {
                filters = filters.action_type(action_type);
            }
            if let Some(limit) = limit {
                filters = filters.limit(limit);
            }
            let filters = (!filters.is_empty()).then_some(filters);
            print_json(&layer.actions().list(filters.as_ref())?)
        }
        Command::GetEvidence { action_id } => print_json(&layer.evidences().get(&action_id)?),
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

fn build_layer(cli: &Cli) -> ApaaiResult<AccountabilityLayer> {
    if cli.offline {
        info!("using in-process transport");
        return Ok(AccountabilityLayer::with_transport(InMemoryTransport::with_policy(
            demo_policy(),
        )));
    }

    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(api_key) = &cli.api_key {
        config.api_key = Some(api_key.clone());
    }
    info!(endpoint = %config.endpoint, "connecting");
    apaai_http::connect(&config)
}

/// Outbound email needs a reviewer; everything else is approved.
fn demo_policy() -> Policy {
    Policy::with_rules(vec![PolicyRule::requiring("send_email", ["reviewer_approval"])])
}

// ── Argument parsing ──────────────────────────────────────────────────────────

fn parse_params(raw: &str) -> ApaaiResult<Value> {
    serde_json::from_str(raw)
        .map_err(|e| ApaaiError::validation(format!("--params is not valid JSON: {e}")))
}

/// `name=pass[:note]` into an open check mapping. `pass` is left as text so
/// that normalization decides whether it reads as a boolean.
fn parse_check(raw: &str) -> ApaaiResult<Value> {
    let (name, rest) = raw
        .split_once('=')
        .ok_or_else(|| ApaaiError::validation(format!("--check '{raw}' must look like name=pass[:note]")))?;

    let mut check = Map::new();
    check.insert("name".into(), json!(name));
    match rest.split_once(':') {
        Some((pass, note)) => {
            check.insert("pass".into(), json!(pass));
            check.insert("note".into(), json!(note));
        }
        None => {
            check.insert("pass".into(), json!(rest));
        }
    }
    Ok(Value::Object(check))
}

fn print_json<T: Serialize>(value: &T) -> DemoResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Walkthrough ───────────────────────────────────────────────────────────────

/// What the fake mailer returns.
#[derive(Debug, Serialize)]
struct SentEmail {
    id: String,
    to: String,
    subject: String,
}

fn send_fake_email(to: &str, subject: &str, fail: bool) -> Result<SentEmail, String> {
    if fail {
        return Err(format!("mailbox {to} rejected the message"));
    }
    Ok(SentEmail {
        id: "msg_demo_123".to_string(),
        to: to.to_string(),
        subject: subject.to_string(),
    })
}

fn run_send_email(layer: &AccountabilityLayer, to: &str, subject: &str, fail: bool) -> DemoResult {
    let action_id = new_action_id();
    let proposal = Proposal::new("send_email", Actor::agent("mail-bot").with_provider("openai"))
        .id(action_id.clone())
        .target(format!("mailto:{to}"))
        .params(json!({ "subject": subject, "body": "Hi!" }));

    println!("[1] Proposing send_email as agent 'mail-bot' (action {action_id})");

    let hooks = ActionHooks::new()
        .on_approval(|decision: &Decision| {
            let required: Vec<&str> = decision.checks.iter().map(|c| c.name()).collect();
            println!("[2] Approval required: {}", required.join(", "));
            let verdict = layer.human().approve(&decision.action_id, Some("demo-reviewer"))?;
            println!("    Reviewer decided: {}", verdict.status);
            Ok(verdict)
        })
        .on_success(|sent: &SentEmail| {
            vec![Check::passed("email_sent").with_note(format!("id={}", sent.id))]
        })
        .on_error(|err: &String| vec![Check::failed("email_failed").with_note(err.clone())]);

    let outcome = with_action(layer, proposal, hooks, || send_fake_email(to, subject, fail));

    match &outcome {
        Ok(sent) => println!("[3] Sent {} to {}", sent.id, sent.to),
        Err(e) => println!("[3] Not sent: {e}"),
    }

    println!("[4] Evidence on record:");
    print_json(&layer.evidences().get(&action_id)?)?;

    outcome.map(|_| ()).map_err(Into::into)
}
