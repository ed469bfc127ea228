//! Event stream convergence across transport loss.

use crate::prelude::*;
use serde_json::json;
use std::time::Duration;
use usher_backend::FakeBackend;
use usher_engine::{ChangeBus, EventStreamClient, StreamState};

fn stream(backend: &FakeBackend) -> EventStreamClient<FakeBackend> {
    EventStreamClient::new(
        backend.clone(),
        ChangeBus::new(),
        "r1".into(),
        Some("p1".into()),
        Duration::from_millis(5),
    )
}

#[tokio::test]
async fn log_converges_after_a_transport_drop() {
    let backend = FakeBackend::new();
    let client = stream(&backend);
    client.start();

    eventually("first connection", || backend.last_stream_sender().is_some()).await;
    let sender = backend.last_stream_sender().unwrap();
    sender
        .send(json!({"id": "e1", "message": "one"}).to_string())
        .await
        .unwrap();
    eventually("first event", || client.len() == 1).await;

    // Transport drops mid-run. The channel only closes once every sender
    // clone is gone, ours included.
    drop(sender);
    backend.close_streams();
    eventually("reconnect", || backend.stream_open_count() >= 2).await;
    eventually("connected again", || client.state() == StreamState::Connected).await;

    // The server replays the window: the duplicate is absorbed, the new
    // event lands, order is first-seen.
    let sender = backend.last_stream_sender().unwrap();
    sender
        .send(
            json!({"events": [
                {"id": "e1", "message": "one"},
                {"id": "e2", "message": "two"},
            ]})
            .to_string(),
        )
        .await
        .unwrap();
    eventually("convergence", || client.len() == 2).await;
    let keys: Vec<String> = client.events().into_iter().map(|e| e.key).collect();
    assert_eq!(keys, ["e1", "e2"]);
    client.stop();
}

#[tokio::test]
async fn history_pull_overlaps_the_live_window_safely() {
    let backend = FakeBackend::new();
    backend.set_history(
        "r1",
        &[
            json!({"id": "e1", "message": "one"}),
            json!({"id": "e2", "message": "two"}),
        ],
    );
    let client = stream(&backend);
    client.start();
    eventually("connection", || backend.last_stream_sender().is_some()).await;

    // Live events arrive while history is still being pulled.
    let sender = backend.last_stream_sender().unwrap();
    sender
        .send(json!({"id": "e2", "message": "two"}).to_string())
        .await
        .unwrap();
    client.load_history().await.unwrap();

    eventually("merged log", || client.len() == 2).await;
    client.stop();
}
