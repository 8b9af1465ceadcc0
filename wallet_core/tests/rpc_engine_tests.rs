//! `RpcEngine` against an in-process HTTP wallet engine.
//!
//! The engine answers `state` polls slowly, reporting whatever it knew when
//! the poll arrived, so a reply can describe the state from before a resync.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout_at, Instant};

use night_types::{NetworkId, NetworkProfile};
use night_wallet_core::{RpcEngine, SigningMaterial, WalletEngine};

const STATE_DELAY: Duration = Duration::from_millis(300);

#[derive(Default)]
struct EngineState {
    resynced: AtomicBool,
    state_polls: AtomicU32,
}

/// Start the engine on a loopback port and return its URL.
async fn spawn_engine(engine: Arc<EngineState>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let url = format!("http://{}", listener.local_addr().expect("local addr"));
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(handle(stream, Arc::clone(&engine)));
        }
    });
    url
}

async fn handle(mut stream: TcpStream, engine: Arc<EngineState>) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    let result = match request["action"].as_str() {
        Some("start") => json!({ "session": "s1" }),
        Some("state") => {
            engine.state_polls.fetch_add(1, Ordering::SeqCst);
            let synced = !engine.resynced.load(Ordering::SeqCst);
            tokio::time::sleep(STATE_DELAY).await;
            json!({ "synced": synced, "applied": 5, "highest": 5 })
        }
        Some("resync") => {
            engine.resynced.store(true, Ordering::SeqCst);
            json!({})
        }
        _ => json!({}),
    };
    let body = json!({ "result": result }).to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Read one HTTP request and parse its JSON body.
async fn read_request(stream: &mut TcpStream) -> Option<Value> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let body_start = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..read]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break end + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..body_start]).to_ascii_lowercase();
    let length: usize = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0);
    while buf.len() < body_start + length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..read]);
    }
    serde_json::from_slice(&buf[body_start..body_start + length]).ok()
}

#[tokio::test]
async fn state_polled_before_resync_does_not_mark_the_session_synced() {
    let state = Arc::new(EngineState::default());
    let url = spawn_engine(Arc::clone(&state)).await;
    let engine = RpcEngine::new(url)
        .expect("client")
        .with_poll_interval(Duration::from_millis(10));
    let material = SigningMaterial::from_hex(&"11".repeat(32)).expect("seed");
    let (warnings, _warnings_rx) = tokio::sync::mpsc::unbounded_channel();
    let profile = NetworkProfile::for_network(NetworkId::Undeployed);

    let session = engine.start(&material, &profile, warnings).await.expect("start");
    let mut rx = engine.state(&session);
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.synced))
        .await
        .expect("first poll lands")
        .expect("state channel open");

    // Let the next poll reach the engine before the resync does.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let polls_before_resync = state.state_polls.load(Ordering::SeqCst);
    assert!(polls_before_resync >= 2, "a poll should be in flight");

    engine.resync(&session).await.expect("resync");
    assert!(!rx.borrow_and_update().synced);

    // The in-flight reply (synced) and at least one post-resync reply
    // (not synced) arrive within this window.
    let deadline = Instant::now() + STATE_DELAY * 3;
    while let Ok(changed) = timeout_at(deadline, rx.changed()).await {
        changed.expect("state channel open");
        assert!(
            !rx.borrow_and_update().synced,
            "a reply from before the resync was published"
        );
    }
    assert!(state.state_polls.load(Ordering::SeqCst) > polls_before_resync);

    engine.stop(session).await.expect("stop");
}
