//! Integration tests for sessions against the reference authority.

use async_trait::async_trait;
use formsync_engine::{
    ErrorClass, Session, SessionConfig, SessionTransport, SyncError, SyncResult, SyncState,
};
use formsync_protocol::{Action, FullStateRequest, Item, StateResponse, UpdateRequest, ValueSet};
use formsync_server::{ServerConfig, SessionServer};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// A transport that talks JSON to an in-memory server.
struct InMemoryTransport {
    server: Arc<SessionServer>,
}

impl InMemoryTransport {
    fn new(server: Arc<SessionServer>) -> Self {
        Self { server }
    }
}

#[async_trait]
impl SessionTransport for InMemoryTransport {
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

fn hosted_server() -> Arc<SessionServer> {
    let server = SessionServer::new(ServerConfig::default());
    server
        .create_session(
            "intake",
            vec![
                Item::questionnaire("root", ["about", "consent"]),
                Item::group("about", ["name", "smoker"]),
                Item::group("consent", ["agree", "fine-print"]),
                Item::new("name", "text"),
                Item::new("smoker", "choice").with_attribute("valueSet", json!("yn")),
                Item::new("agree", "boolean"),
                Item::note("fine-print"),
            ],
            vec![ValueSet::new("yn").with_field("codes", json!(["y", "n"]))],
            Some("en-GB".into()),
        )
        .unwrap();
    Arc::new(server)
}

fn open(server: &Arc<SessionServer>) -> Session<InMemoryTransport> {
    let config = SessionConfig::new("intake").with_debounce(Duration::from_millis(200));
    Session::new(config, InMemoryTransport::new(Arc::clone(server)))
}

#[tokio::test(start_paused = true)]
async fn pull_mirrors_the_authority() {
    let server = hosted_server();
    let session = open(&server);

    let snapshot = session.pull().await.unwrap();

    assert_eq!(snapshot.rev(), 1);
    assert_eq!(session.locale().as_deref(), Some("en-GB"));
    assert!(session.get_value_set("yn").is_some());
    assert_eq!(
        session.get_item("about").unwrap().children().to_vec(),
        vec!["name".to_string(), "smoker".to_string()]
    );
    assert!(snapshot.reverse_index_consistent());
    assert_eq!(*snapshot, server.snapshot("intake").unwrap());
}

#[tokio::test(start_paused = true)]
async fn debounced_answers_are_canonicalised() {
    let server = hosted_server();
    let session = open(&server);
    session.pull().await.unwrap();

    session.set_answer("name", json!("  Grace Hopper "));
    session.set_answer("smoker", json!("n"));
    assert_eq!(
        session.get_item("name").unwrap().value,
        Some(json!("  Grace Hopper "))
    );

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(session.rev(), 2);
    assert_eq!(session.pending_len(), 0);
    assert_eq!(
        session.get_item("name").unwrap().value,
        Some(json!("Grace Hopper"))
    );
    assert_eq!(session.get_item("smoker").unwrap().value, Some(json!("n")));
    assert_eq!(server.rev("intake"), Some(2));
    assert_eq!(*session.snapshot(), server.snapshot("intake").unwrap());
}

#[tokio::test(start_paused = true)]
async fn cleared_answer_converges_with_the_authority() {
    let server = hosted_server();
    let session = open(&server);
    session.pull().await.unwrap();

    session.set_answer("name", json!("Ada"));
    session.flush().await.unwrap();
    session.set_answer("name", serde_json::Value::Null);
    assert_eq!(session.get_item("name").unwrap().value, None);
    session.flush().await.unwrap();

    assert_eq!(session.rev(), 3);
    assert_eq!(session.get_item("name").unwrap().value, None);
    assert_eq!(*session.snapshot(), server.snapshot("intake").unwrap());
}

#[tokio::test(start_paused = true)]
async fn invalid_answer_comes_back_as_error_record() {
    let server = hosted_server();
    let session = open(&server);
    session.pull().await.unwrap();

    let client_errors = Arc::new(Mutex::new(0));
    let c = Arc::clone(&client_errors);
    session.on_error(move |event| {
        if event.class() == ErrorClass::Client {
            *c.lock() += 1;
        }
    });

    session.set_answer("fine-print", json!("read it"));
    session.flush().await.unwrap();

    assert_eq!(*client_errors.lock(), 1);
    let errors = session.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code.as_deref(), Some("invalid_answer"));
    assert_eq!(session.get_item("fine-print").unwrap().value, None);
}

#[tokio::test(start_paused = true)]
async fn stale_session_is_resynced() {
    let server = hosted_server();
    let ahead = open(&server);
    let behind = open(&server);
    ahead.pull().await.unwrap();
    behind.pull().await.unwrap();

    ahead.set_answer("agree", json!(true));
    ahead.flush().await.unwrap();

    behind.set_answer("name", json!("Ada"));
    let snapshot = behind.flush().await.unwrap();

    assert_eq!(snapshot.rev(), 3);
    assert_eq!(behind.get_item("agree").unwrap().value, Some(json!(true)));
    assert_eq!(behind.get_item("name").unwrap().value, Some(json!("Ada")));
    assert_eq!(*snapshot, server.snapshot("intake").unwrap());
}

#[tokio::test(start_paused = true)]
async fn navigation_and_completion() {
    let server = hosted_server();
    let session = open(&server);
    session.pull().await.unwrap();

    session.next();
    session.next();
    session.previous();
    session.next();
    session.complete();
    assert!(session.is_complete());

    session.flush().await.unwrap();

    assert_eq!(server.page("intake"), Some(1));
    assert!(session.is_complete());
    assert!(server.snapshot("intake").unwrap().is_complete());
    assert_eq!(session.sync_state(), SyncState::Synced);

    let stats = session.sync_stats();
    assert_eq!(stats.pulls_completed, 1);
    assert_eq!(stats.pushes_completed, 1);
    assert_eq!(stats.actions_pushed, 5);
}

#[tokio::test(start_paused = true)]
async fn unknown_session_is_a_sync_error() {
    let server = hosted_server();
    let session = Session::new(
        SessionConfig::new("missing"),
        InMemoryTransport::new(Arc::clone(&server)),
    );

    let err = session.pull().await.unwrap_err();

    assert!(matches!(err, SyncError::ServerError(msg) if msg.contains("missing")));
    assert_eq!(session.sync_state(), SyncState::Error);
}

#[tokio::test(start_paused = true)]
async fn full_state_replay_matches_server_actions() {
    let server = hosted_server();
    let session = open(&server);
    session.pull().await.unwrap();
    session.set_answer("agree", json!(false));
    session.flush().await.unwrap();

    let state = server.handle_get_full_state("intake").unwrap();
    assert_eq!(state.actions.first(), Some(&Action::Reset));
    assert_eq!(state.rev, session.rev());
}
