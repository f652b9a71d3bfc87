//! End-to-end test driving the full stack — supervisor, connection, RecordIO
//! decode, actor, subscriber fan-out — against a real HTTP server standing
//! in for a Mesos master's Operator API.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::response::IntoResponse;
use axum::routing::post;
use mesos_tracker::model::{Ref, TaskId};
use mesos_tracker::{Config, TrackerEvent, client};

fn frame(json: &str) -> String {
    format!("{}\n{}", json.len(), json)
}

fn subscribed_json() -> String {
    serde_json::json!({
        "type": "SUBSCRIBED",
        "subscribed": {
            "heartbeat_interval_seconds": 5.0,
            "get_agents": {"agents": []},
            "get_frameworks": {"frameworks": [
                {"framework_info": {"id": {"value": "fw1"}, "name": "marathon"}}
            ]},
            "get_tasks": {"tasks": [
                {
                    "task_id": {"value": "task1"},
                    "name": "app",
                    "framework_id": {"value": "fw1"},
                    "agent_id": {"value": "agent1"},
                    "statuses": [
                        {"task_id": {"value": "task1"}, "agent_id": {"value": "agent1"}, "state": "TASK_RUNNING", "timestamp": 1.0}
                    ]
                }
            ]}
        }
    })
    .to_string()
}

fn agent_added_json() -> &'static str {
    r#"{"type":"AGENT_ADDED","agent_added":{"agent":{"agent_info":{"id":{"value":"agent1"},"hostname":"10.0.0.5"}}}}"#
}

async fn subscribe_handler() -> impl IntoResponse {
    let frames = vec![frame(&subscribed_json()), frame(agent_added_json())];
    let stream = futures_util::stream::unfold(frames.into_iter(), |mut it| async move {
        let next = it.next()?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        Some((Ok::<_, std::io::Error>(bytes::Bytes::from(next)), it))
    });
    Body::from_stream(stream)
}

async fn redirect_handler() -> impl IntoResponse {
    axum::response::Redirect::temporary("/api/v1")
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new().route("/api/v1", post(subscribe_handler)).route("/redirect", post(redirect_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A task arrives referencing an agent that hasn't been seen yet; the
/// task stays `Unresolved` until `AGENT_ADDED` resolves it, at which
/// point a delta is emitted with the resolved IP.
#[tokio::test]
async fn agent_arriving_after_task_resolves_the_waiting_reference() {
    let addr = spawn_server().await;
    let master = format!("http://{addr}/api/v1").parse().unwrap();

    let mut config = Config::default();
    config.reconnect_delay_ms = 10;
    let supervisor = client::standalone(master, config);
    let handle = supervisor.handle();
    tokio::spawn(supervisor.run());

    let mut subscription = loop {
        match handle.subscribe().await {
            Ok(sub) => break sub,
            Err(_) => tokio::time::sleep(Duration::from_millis(5)).await,
        }
    };

    let task_id = TaskId::from("task1");
    let initial = subscription.snapshot.get(&task_id).cloned().expect("task1 should be in the initial snapshot");
    assert!(initial.agent_ip.is_unresolved(), "agent1 hasn't been seen yet, so the reference should still be waiting");

    let event = tokio::time::timeout(Duration::from_secs(2), subscription.next_update())
        .await
        .expect("a delta resolving task1 should arrive")
        .expect("the delta channel should still be open");

    let TrackerEvent::TaskUpdated(resolved) = event;
    assert_eq!(resolved.id, task_id);
    assert_eq!(resolved.agent_ip, Ref::Resolved(Some("10.0.0.5".parse().unwrap())));
}

/// A 307 from a non-leading master must surface as a redirect, never be
/// silently followed to whatever `Location` it names.
#[tokio::test]
async fn non_leader_redirect_is_reported_not_followed() {
    let addr = spawn_server().await;
    let redirect_url = format!("http://{addr}/redirect").parse().unwrap();

    let manager = mesos_tracker::connection::ConnectionManager::new();
    let err = manager.connect(&redirect_url).await.expect_err("a 307 must not be treated as success");
    assert!(matches!(err, mesos_tracker::TrackerError::Redirect));
}
