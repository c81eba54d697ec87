//! Integration tests for the socket client worker.
//!
//! These drive a real `SocketClient` against scripted Unix socket servers in
//! a temp directory, covering connect/init, reconnect after peer close, and
//! terminal give-up.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - the panic-free policy applies
//! to production code only.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mn_core::{ChannelConfig, ChannelKind, RetryPolicy};
use mnd::client::{ChunkHandler, ClientExit, SocketClient};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Grace period for the worker to process a write.
const PROCESS_GRACE: Duration = Duration::from_millis(100);

/// Upper bound on any single test phase.
const PHASE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Test Helpers
// ============================================================================

/// A scripted socket server plus a worker connected to it.
struct TestChannel {
    listener: UnixListener,
    endpoint: PathBuf,
    chunks: Arc<Mutex<Vec<String>>>,
    cancel_token: CancellationToken,
    worker: tokio::task::JoinHandle<ClientExit>,
    _temp_dir: TempDir, // Keep alive for RAII cleanup
}

impl TestChannel {
    /// Binds a listener and spawns a worker for the given channel shape.
    fn start(name: &str, init_message: Option<&str>, kind: ChannelKind) -> Self {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let endpoint = temp_dir.path().join(name);
        let listener = UnixListener::bind(&endpoint).expect("bind listener");

        let config = ChannelConfig::new(
            name,
            &endpoint,
            init_message.map(str::to_string),
            kind,
        );

        let chunks = Arc::new(Mutex::new(Vec::new()));
        let sink = chunks.clone();
        let handler: ChunkHandler = Arc::new(move |text: &str| {
            sink.lock().unwrap().push(text.to_string());
        });

        let cancel_token = CancellationToken::new();
        let client = SocketClient::new(
            config,
            fast_policy(),
            handler,
            cancel_token.clone(),
        );
        let worker = tokio::spawn(client.run());

        Self {
            listener,
            endpoint,
            chunks,
            cancel_token,
            worker,
            _temp_dir: temp_dir,
        }
    }

    async fn accept(&self) -> UnixStream {
        let (stream, _) = timeout(PHASE_TIMEOUT, self.listener.accept())
            .await
            .expect("accept timed out")
            .expect("accept failed");
        stream
    }

    fn chunks(&self) -> Vec<String> {
        self.chunks.lock().unwrap().clone()
    }

    async fn shutdown(self) -> ClientExit {
        self.cancel_token.cancel();
        timeout(PHASE_TIMEOUT, self.worker)
            .await
            .expect("worker did not stop")
            .expect("worker task failed")
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy::with_schedule([Duration::from_millis(5); 5])
}

// ============================================================================
// Connect & init behavior
// ============================================================================

#[tokio::test]
async fn worker_sends_subscription_lines_on_every_connect() {
    let channel = TestChannel::start(
        "slogmodem",
        Some("SUBSCRIBE 5MODE DUMP"),
        ChannelKind::SystemLog,
    );

    let expected = "SUBSCRIBE 5MODE DUMP\nSUBSCRIBE WCN DUMP\n";

    // First connection: both lines arrive in order.
    let mut server = channel.accept().await;
    let mut buf = vec![0u8; expected.len()];
    server.read_exact(&mut buf).await.unwrap();
    assert_eq!(std::str::from_utf8(&buf).unwrap(), expected);

    // Close the connection; the reconnected worker must re-subscribe.
    drop(server);
    let mut server = channel.accept().await;
    server.read_exact(&mut buf).await.unwrap();
    assert_eq!(std::str::from_utf8(&buf).unwrap(), expected);

    assert_eq!(channel.shutdown().await, ClientExit::Cancelled);
}

#[tokio::test]
async fn worker_survives_daemon_restart() {
    let channel = TestChannel::start("modemd", None, ChannelKind::Modem);

    let mut server = channel.accept().await;
    server.write_all(b"Modem Assert: cause A").await.unwrap();
    server.flush().await.unwrap();
    sleep(PROCESS_GRACE).await;

    // Simulate the daemon restarting: close, then accept the reconnect.
    drop(server);
    let mut server = channel.accept().await;
    server.write_all(b"Modem Alive").await.unwrap();
    server.flush().await.unwrap();
    sleep(PROCESS_GRACE).await;

    assert_eq!(
        channel.chunks(),
        vec!["Modem Assert: cause A".to_string(), "Modem Alive".to_string()]
    );

    assert_eq!(channel.shutdown().await, ClientExit::Cancelled);
}

#[tokio::test]
async fn worker_skips_empty_and_undecodable_reads() {
    let channel = TestChannel::start("modemd", None, ChannelKind::Modem);

    let mut server = channel.accept().await;
    server.write_all(&[0xc3, 0x28]).await.unwrap(); // invalid UTF-8
    server.flush().await.unwrap();
    sleep(PROCESS_GRACE).await;
    server.write_all(b"Modem Blocked").await.unwrap();
    server.flush().await.unwrap();
    sleep(PROCESS_GRACE).await;

    assert_eq!(channel.chunks(), vec!["Modem Blocked".to_string()]);

    assert_eq!(channel.shutdown().await, ClientExit::Cancelled);
}

// ============================================================================
// Give-up behavior
// ============================================================================

#[tokio::test]
async fn worker_gives_up_when_endpoint_never_appears() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let endpoint = temp_dir.path().join("modemd");

    let config = ChannelConfig::new("modemd", &endpoint, None, ChannelKind::Modem);
    let handler: ChunkHandler = Arc::new(|_| {});
    let client = SocketClient::new(
        config,
        fast_policy(),
        handler,
        CancellationToken::new(),
    );

    let exit = timeout(PHASE_TIMEOUT, client.run())
        .await
        .expect("worker should give up promptly");
    assert_eq!(exit, ClientExit::RetryBudgetExhausted);
}

#[tokio::test]
async fn worker_gives_up_when_endpoint_disappears_for_good() {
    let channel = TestChannel::start("wcnd", None, ChannelKind::Connectivity);

    // Serve one connection, then tear the endpoint down entirely.
    let server = channel.accept().await;
    drop(server);
    drop(channel.listener);
    std::fs::remove_file(&channel.endpoint).unwrap();

    // The worker reconnects into nothing and exhausts its retry budget.
    let exit = timeout(PHASE_TIMEOUT, channel.worker)
        .await
        .expect("worker should give up promptly")
        .expect("worker task failed");
    assert_eq!(exit, ClientExit::RetryBudgetExhausted);
}
