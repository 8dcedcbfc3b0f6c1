//! Simulate command implementation.

use crate::commands::report::SnapshotReport;
use async_trait::async_trait;
use formsync_core::Snapshot;
use formsync_engine::{
    Session, SessionConfig, SessionTransport, SyncError, SyncResult, SyncStats,
};
use formsync_protocol::{FullStateRequest, Item, StateResponse, UpdateRequest, ValueSet};
use formsync_server::{ServerConfig, SessionServer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A form to host: the same inputs `SessionServer::create_session` takes.
#[derive(Debug, Deserialize)]
pub struct FormDefinition {
    /// Session ID.
    #[serde(default = "default_session_id")]
    pub session_id: String,
    /// Items of the form.
    pub items: Vec<Item>,
    /// Value sets referenced by the items.
    #[serde(default)]
    pub value_sets: Vec<ValueSet>,
    /// Locale.
    #[serde(default)]
    pub locale: Option<String>,
}

fn default_session_id() -> String {
    "simulated".to_string()
}

/// Sync counters worth printing.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    /// Successful pulls.
    pub pulls: u64,
    /// Successful pushes.
    pub pushes: u64,
    /// Actions sent.
    pub actions_pushed: u64,
    /// Actions received.
    pub actions_received: u64,
    /// Failed round trips.
    pub failures: u64,
}

impl From<&SyncStats> for StatsReport {
    fn from(stats: &SyncStats) -> Self {
        Self {
            pulls: stats.pulls_completed,
            pushes: stats.pushes_completed,
            actions_pushed: stats.actions_pushed,
            actions_received: stats.actions_received,
            failures: stats.failures,
        }
    }
}

/// What a simulation run produced.
#[derive(Debug)]
pub struct Simulation {
    /// Final client snapshot.
    pub snapshot: Arc<Snapshot>,
    /// Coordinator stats.
    pub stats: SyncStats,
    /// Sync and error events, in emission order.
    pub events: Vec<String>,
}

/// Transport that hands JSON bodies straight to an in-process server.
struct LoopbackTransport {
    server: Arc<SessionServer>,
}

#[async_trait]
impl SessionTransport for LoopbackTransport {
    async fn get_full_state(&self, session_id: &str) -> SyncResult<StateResponse> {
        let body = FullStateRequest::new(session_id).encode()?;
        let reply = self
            .server
            .handle_get_full_state_json(&body)
            .map_err(|e| SyncError::ServerError(e.to_string()))?;
        Ok(StateResponse::decode(&reply)?)
    }

    async fn update(&self, request: &UpdateRequest) -> SyncResult<StateResponse> {
        let body = request.encode()?;
        let reply = self
            .server
            .handle_update_json(&body)
            .map_err(|e| SyncError::ServerError(e.to_string()))?;
        Ok(StateResponse::decode(&reply)?)
    }
}

/// Parses an `ID=VALUE` answer. VALUE is read as JSON, falling back to a
/// plain string.
pub fn parse_answer(arg: &str) -> Result<(String, Value), String> {
    let (id, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("Invalid answer {arg:?}, expected ID=VALUE"))?;
    if id.is_empty() {
        return Err(format!("Invalid answer {arg:?}, empty item ID"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((id.to_string(), value))
}

/// Loads a form definition from a JSON file.
pub fn load_form(path: &Path) -> Result<FormDefinition, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path).map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Hosts `form`, opens a session on it, answers, and syncs.
pub async fn simulate(
    form: FormDefinition,
    answers: Vec<(String, Value)>,
    complete: bool,
    debounce: Duration,
) -> Result<Simulation, Box<dyn std::error::Error>> {
    let server = Arc::new(SessionServer::new(ServerConfig::default()));
    server.create_session(
        form.session_id.clone(),
        form.items,
        form.value_sets,
        form.locale,
    )?;
    info!("Hosting session {:?}", form.session_id);

    let config = SessionConfig::new(form.session_id).with_debounce(debounce);
    let session = Session::new(config, LoopbackTransport { server });

    let events = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&events);
    session.on_sync(move |status| {
        log.lock().push(format!("sync {}", status.as_str()));
    });
    let log = Arc::clone(&events);
    session.on_error(move |event| {
        log.lock().push(format!("error {event}"));
    });

    session.pull().await?;

    for (id, value) in answers {
        session.set_answer(id, value);
    }
    if complete {
        session.complete();
    }

    // Let the debounce timer fire, then push whatever is left.
    tokio::time::sleep(debounce + Duration::from_millis(20)).await;
    let snapshot = session.flush().await?;
    info!("Flush complete at revision {}", snapshot.rev());

    let events = events.lock().clone();
    Ok(Simulation {
        snapshot,
        stats: session.sync_stats(),
        events,
    })
}

/// Runs the simulate command.
pub fn run(
    form_path: &Path,
    answers: &[String],
    complete: bool,
    debounce_ms: u64,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Loading form from {:?}", form_path);
    let form = load_form(form_path)?;
    let answers = answers
        .iter()
        .map(|arg| parse_answer(arg))
        .collect::<Result<Vec<_>, _>>()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(simulate(
        form,
        answers,
        complete,
        Duration::from_millis(debounce_ms),
    ))?;

    let report = SnapshotReport::new(&outcome.snapshot);
    let stats = StatsReport::from(&outcome.stats);

    match format {
        "json" => {
            let output = serde_json::json!({
                "snapshot": report,
                "stats": stats,
                "events": outcome.events,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            print!("{}", report.to_text());
            println!("\nSync:");
            println!("  Pulls:            {}", stats.pulls);
            println!("  Pushes:           {}", stats.pushes);
            println!("  Actions pushed:   {}", stats.actions_pushed);
            println!("  Actions received: {}", stats.actions_received);
            println!("  Failures:         {}", stats.failures);
            println!("\nEvents:");
            for event in &outcome.events {
                println!("  {event}");
            }
        }
    }

    Ok(())
}
