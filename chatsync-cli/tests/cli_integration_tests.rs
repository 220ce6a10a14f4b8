//! Integration tests for the CLI commands.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use assert_cmd::cargo::cargo_bin_cmd;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use predicates::prelude::PredicateBooleanExt;
use shared::models::{
    Author, Message, MessageId, MessageKind, MessagePage, PostMessageRequest,
    StreamAccessResponse, Timestamp,
};
use tempfile::TempDir;
use uuid::Uuid;

const SUBJECT: &str = "00000000-0000-0000-0000-000000000001";

fn free_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/")
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = cargo_bin_cmd!("cli");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicates::str::contains("watch"))
        .stdout(predicates::str::contains("history"))
        .stdout(predicates::str::contains("replies"))
        .stdout(predicates::str::contains("like"))
        .stdout(predicates::str::contains("post"));
}

#[test]
fn test_history_requires_subject() {
    let mut cmd = cargo_bin_cmd!("cli");
    cmd.arg("history").timeout(std::time::Duration::from_secs(5));

    cmd.assert()
        .failure()
        .stderr(predicates::str::contains(
            "the following required arguments were not provided",
        ))
        .stderr(predicates::str::contains("<SUBJECT>"));
}

#[test]
fn test_watch_rejects_invalid_subject() {
    let mut cmd = cargo_bin_cmd!("cli");
    cmd.arg("watch")
        .arg("not-a-uuid")
        .timeout(std::time::Duration::from_secs(5));

    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("invalid value"));
}

#[test]
fn test_history_connection_failure() {
    let mut cmd = cargo_bin_cmd!("cli");
    cmd.arg("--api")
        .arg(free_port_url())
        .arg("history")
        .arg(SUBJECT)
        .timeout(std::time::Duration::from_secs(10));

    cmd.assert().failure().stderr(
        predicates::str::contains("failed to open stream")
            .or(predicates::str::contains("request failed")),
    );
}

#[test]
fn test_config_generates_yaml() {
    let dir = TempDir::new().unwrap();
    let mut cmd = cargo_bin_cmd!("cli");
    cmd.current_dir(dir.path()).arg("config");

    cmd.assert()
        .success()
        .stdout(predicates::str::contains("chatsync.yaml"));
    let written = std::fs::read_to_string(dir.path().join("chatsync.yaml")).unwrap();
    assert!(written.contains("poll_interval_secs: 15"));
}

#[test]
fn test_spec_streams_json() {
    let mut cmd = cargo_bin_cmd!("cli");
    cmd.arg("spec").arg("json");

    let output = cmd.assert().success().get_output().stdout.clone();
    let document: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(document["components"]["schemas"]["Message"].is_object());
}

#[test]
fn test_completion_for_bash() {
    let mut cmd = cargo_bin_cmd!("cli");
    cmd.arg("completion").arg("--shell").arg("bash");

    cmd.assert()
        .success()
        .stdout(predicates::str::contains("chatsync"));
}

type Messages = Arc<Mutex<Vec<Message>>>;

#[derive(serde::Deserialize)]
struct Paging {
    page: usize,
    page_size: usize,
}

fn message(id: u128, content: &str) -> Message {
    Message {
        id: MessageId(Uuid::from_u128(id)),
        kind: MessageKind::Top,
        author: Author {
            label: "viewer42".into(),
            ..Author::default()
        },
        content: content.to_string(),
        created_at: Timestamp::now(),
        like_count: 0,
        viewer_has_liked: false,
        reply_count: 0,
    }
}

async fn spawn_backend(messages: Messages) -> String {
    async fn list(
        State(messages): State<Messages>,
        Query(paging): Query<Paging>,
    ) -> Json<MessagePage> {
        let messages = messages.lock().unwrap();
        let end = messages
            .len()
            .saturating_sub((paging.page - 1) * paging.page_size);
        let start = end.saturating_sub(paging.page_size);
        Json(MessagePage {
            items: messages[start..end].to_vec(),
        })
    }

    async fn create(
        State(messages): State<Messages>,
        Json(request): Json<PostMessageRequest>,
    ) -> Json<Message> {
        let mut messages = messages.lock().unwrap();
        let created = message(500 + messages.len() as u128, &request.content);
        messages.push(created.clone());
        Json(created)
    }

    async fn access(Path(_subject): Path<Uuid>) -> Json<StreamAccessResponse> {
        Json(StreamAccessResponse::default())
    }

    let app = Router::new()
        .route("/api/subjects/{subject}/messages", get(list).post(create))
        .route("/api/subjects/{subject}/access", get(access))
        .with_state(messages);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_post_then_history_against_server() {
    let messages: Messages = Arc::new(Mutex::new(
        (1..=12).map(|n| message(n, &format!("line {n}"))).collect(),
    ));
    let api = spawn_backend(messages.clone()).await;

    let post_api = api.clone();
    tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("cli")
            .arg("--api")
            .arg(post_api)
            .arg("post")
            .arg(SUBJECT)
            .arg("hello from the terminal")
            .timeout(std::time::Duration::from_secs(10))
            .assert()
            .success()
            .stdout(predicates::str::contains("viewer42: hello from the terminal"));
    })
    .await
    .unwrap();
    assert_eq!(messages.lock().unwrap().len(), 13);

    let blank_api = api.clone();
    tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("cli")
            .arg("--api")
            .arg(blank_api)
            .arg("post")
            .arg(SUBJECT)
            .arg("   ")
            .timeout(std::time::Duration::from_secs(10))
            .assert()
            .failure()
            .stderr(predicates::str::contains("must not be empty"));
    })
    .await
    .unwrap();
    assert_eq!(messages.lock().unwrap().len(), 13);

    tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("cli")
            .arg("--api")
            .arg(api)
            .arg("history")
            .arg(SUBJECT)
            .arg("--pages")
            .arg("1")
            .timeout(std::time::Duration::from_secs(10))
            .assert()
            .success()
            .stdout(predicates::str::contains("-- beginning of stream --"))
            .stdout(predicates::str::contains("line 1 "))
            .stdout(predicates::str::contains("hello from the terminal"));
    })
    .await
    .unwrap();
}

#[derive(Default)]
struct ThreadBackend {
    chat_disabled: AtomicBool,
    reply_requests: AtomicUsize,
}

const PARENT: u128 = 3;

async fn spawn_thread_backend(backend: Arc<ThreadBackend>) -> String {
    async fn list(Query(paging): Query<Paging>) -> Json<MessagePage> {
        let items = if paging.page == 1 {
            (1..=PARENT).map(|n| message(n, &format!("line {n}"))).collect()
        } else {
            Vec::new()
        };
        Json(MessagePage { items })
    }

    async fn replies(
        State(backend): State<Arc<ThreadBackend>>,
        Path(parent): Path<Uuid>,
        Query(paging): Query<Paging>,
    ) -> Json<MessagePage> {
        backend.reply_requests.fetch_add(1, Ordering::SeqCst);
        let items = if paging.page == 1 {
            (0..2u128)
                .map(|n| Message {
                    kind: MessageKind::Reply {
                        parent_id: MessageId(parent),
                    },
                    ..message(700 + n, &format!("reply {n}"))
                })
                .collect()
        } else {
            Vec::new()
        };
        Json(MessagePage { items })
    }

    async fn access(State(backend): State<Arc<ThreadBackend>>) -> Json<StreamAccessResponse> {
        Json(StreamAccessResponse {
            chat_disabled: backend.chat_disabled.load(Ordering::SeqCst),
            ..StreamAccessResponse::default()
        })
    }

    let app = Router::new()
        .route("/api/subjects/{subject}/messages", get(list))
        .route("/api/subjects/{subject}/access", get(access))
        .route("/api/messages/{parent}/replies", get(replies))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_replies_prints_thread() {
    let backend = Arc::new(ThreadBackend::default());
    let api = spawn_thread_backend(backend.clone()).await;

    tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("cli")
            .arg("--api")
            .arg(api)
            .arg("replies")
            .arg(SUBJECT)
            .arg(Uuid::from_u128(PARENT).to_string())
            .timeout(std::time::Duration::from_secs(10))
            .assert()
            .success()
            .stdout(predicates::str::contains("    > "))
            .stdout(predicates::str::contains("reply 0"))
            .stdout(predicates::str::contains("reply 1"));
    })
    .await
    .unwrap();
    assert_eq!(backend.reply_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_replies_refused_when_chat_disabled() {
    let backend = Arc::new(ThreadBackend::default());
    backend.chat_disabled.store(true, Ordering::SeqCst);
    let api = spawn_thread_backend(backend.clone()).await;

    tokio::task::spawn_blocking(move || {
        cargo_bin_cmd!("cli")
            .arg("--api")
            .arg(api)
            .arg("replies")
            .arg(SUBJECT)
            .arg(Uuid::from_u128(PARENT).to_string())
            .timeout(std::time::Duration::from_secs(10))
            .assert()
            .failure()
            .stderr(predicates::str::contains("chat is disabled"));
    })
    .await
    .unwrap();
    assert_eq!(backend.reply_requests.load(Ordering::SeqCst), 0);
}
