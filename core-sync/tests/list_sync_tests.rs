//! Integration tests for the live audio list
//!
//! A channel-backed fake database stands in for the realtime database so
//! each test controls exactly which snapshots and errors arrive.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    DataSnapshot, RealtimeDatabase, SnapshotStream,
};
use core_sync::{AudioCatalog, AudioEntry, ListSync, SyncError};
use futures::channel::mpsc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tokio::time::timeout;

// ============================================================================
// Fake database
// ============================================================================

struct FakeDatabase {
    feed: Mutex<Option<mpsc::UnboundedReceiver<BridgeResult<DataSnapshot>>>>,
    connect_error: Mutex<Option<BridgeError>>,
    listened_paths: Mutex<Vec<String>>,
}

type Feed = mpsc::UnboundedSender<BridgeResult<DataSnapshot>>;

impl FakeDatabase {
    fn new() -> (Arc<Self>, Feed) {
        let (tx, rx) = mpsc::unbounded();
        let db = Arc::new(Self {
            feed: Mutex::new(Some(rx)),
            connect_error: Mutex::new(None),
            listened_paths: Mutex::new(Vec::new()),
        });
        (db, tx)
    }

    fn failing(error: BridgeError) -> Arc<Self> {
        let (db, _) = Self::new();
        *db.connect_error.lock() = Some(error);
        db
    }
}

#[async_trait]
impl RealtimeDatabase for FakeDatabase {
    async fn listen(&self, path: &str) -> BridgeResult<SnapshotStream> {
        self.listened_paths.lock().push(path.to_string());
        if let Some(error) = self.connect_error.lock().take() {
            return Err(error);
        }
        let rx = self
            .feed
            .lock()
            .take()
            .ok_or_else(|| BridgeError::OperationFailed("already listening".to_string()))?;
        Ok(Box::pin(rx))
    }
}

fn snapshot(value: Value) -> BridgeResult<DataSnapshot> {
    Ok(DataSnapshot::at_path("voice_files", value))
}

/// Subscribe and forward callbacks onto channels the test can await.
fn subscribe(
    sync: &ListSync,
) -> (
    core_sync::Subscription,
    tokio_mpsc::UnboundedReceiver<Arc<AudioCatalog>>,
    tokio_mpsc::UnboundedReceiver<SyncError>,
) {
    let (updates_tx, updates_rx) = tokio_mpsc::unbounded_channel();
    let (errors_tx, errors_rx) = tokio_mpsc::unbounded_channel();
    let subscription = sync
        .subscribe(
            move |catalog| {
                let _ = updates_tx.send(catalog);
            },
            move |error| {
                let _ = errors_tx.send(error);
            },
        )
        .unwrap();
    (subscription, updates_rx, errors_rx)
}

async fn next<T>(rx: &mut tokio_mpsc::UnboundedReceiver<T>) -> T {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for callback")
        .expect("channel closed")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_catalog_tracks_latest_snapshot() {
    let (db, feed) = FakeDatabase::new();
    let sync = ListSync::new(db.clone(), "voice_files");
    let (_subscription, mut updates, _errors) = subscribe(&sync);

    assert!(sync.catalog().is_empty());

    feed.unbounded_send(snapshot(json!({
        "clip1": { "file_url": "https://x/a.mp3" },
        "clip2": { "file_url": "https://x/b.mp3" }
    })))
    .unwrap();
    let first = next(&mut updates).await;
    assert_eq!(first.names(), vec!["clip1", "clip2"]);

    feed.unbounded_send(snapshot(json!({
        "clip2": { "file_url": "https://x/b2.mp3" },
        "clip3": {}
    })))
    .unwrap();
    let second = next(&mut updates).await;

    assert_eq!(
        second.entries(),
        &[
            AudioEntry::new("clip2", Some("https://x/b2.mp3".to_string())),
            AudioEntry::new("clip3", None),
        ]
    );
    assert_eq!(*sync.catalog(), *second);
    assert_eq!(first.len(), 2, "published catalogs are never mutated");
    assert_eq!(db.listened_paths.lock().as_slice(), &["voice_files".to_string()]);
}

#[tokio::test]
async fn test_missing_file_url_yields_entry_without_url() {
    let (db, feed) = FakeDatabase::new();
    let sync = ListSync::new(db, "voice_files");
    let (_subscription, mut updates, _errors) = subscribe(&sync);

    feed.unbounded_send(snapshot(json!({ "orphan": { "title": "no link" } })))
        .unwrap();

    let catalog = next(&mut updates).await;
    assert_eq!(catalog.get(0), Some(&AudioEntry::new("orphan", None)));
}

#[tokio::test]
async fn test_empty_node_gives_empty_catalog() {
    let (db, feed) = FakeDatabase::new();
    let sync = ListSync::new(db, "voice_files");
    let (_subscription, mut updates, _errors) = subscribe(&sync);

    feed.unbounded_send(snapshot(json!({ "clip1": { "file_url": "https://x/a.mp3" } })))
        .unwrap();
    next(&mut updates).await;

    feed.unbounded_send(snapshot(json!({}))).unwrap();
    let catalog = next(&mut updates).await;
    assert!(catalog.is_empty());
    assert!(sync.catalog().get(0).is_none());
}

#[tokio::test]
async fn test_denial_keeps_last_catalog() {
    let (db, feed) = FakeDatabase::new();
    let sync = ListSync::new(db, "voice_files");
    let (subscription, mut updates, mut errors) = subscribe(&sync);

    feed.unbounded_send(snapshot(json!({ "clip1": { "file_url": "https://x/a.mp3" } })))
        .unwrap();
    next(&mut updates).await;

    feed.unbounded_send(Err(BridgeError::PermissionDenied(
        "Permission denied".to_string(),
    )))
    .unwrap();

    let error = next(&mut errors).await;
    assert!(matches!(error, SyncError::ListFetchDenied { ref reason } if reason == "Permission denied"));
    assert_eq!(sync.catalog().names(), vec!["clip1"]);

    timeout(Duration::from_secs(2), async {
        while !subscription.is_finished() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_denied_on_connect_reports_error() {
    let db = FakeDatabase::failing(BridgeError::PermissionDenied("401".to_string()));
    let sync = ListSync::new(db, "voice_files");
    let (_subscription, _updates, mut errors) = subscribe(&sync);

    assert!(next(&mut errors).await.is_denied());
    assert!(sync.catalog().is_empty());
}

#[tokio::test]
async fn test_stream_end_reports_closed() {
    let (db, feed) = FakeDatabase::new();
    let sync = ListSync::new(db, "voice_files");
    let (_subscription, _updates, mut errors) = subscribe(&sync);

    drop(feed);
    assert!(matches!(next(&mut errors).await, SyncError::ListenerClosed));
}

#[tokio::test]
async fn test_unsubscribe_stops_updates() {
    let (db, feed) = FakeDatabase::new();
    let sync = ListSync::new(db, "voice_files");
    let (subscription, mut updates, mut errors) = subscribe(&sync);

    feed.unbounded_send(snapshot(json!({ "a": {} }))).unwrap();
    next(&mut updates).await;

    subscription.unsubscribe();
    let _ = feed.unbounded_send(snapshot(json!({ "b": {} })));

    // The task was aborted, so its callbacks (and their senders) are gone.
    assert!(timeout(Duration::from_secs(2), updates.recv()).await.unwrap().is_none());
    assert!(errors.recv().await.is_none());
    assert_eq!(sync.catalog().names(), vec!["a"]);
}

#[test]
fn test_subscribe_outside_runtime_fails() {
    let (db, _feed) = FakeDatabase::new();
    let sync = ListSync::new(db, "voice_files");
    let result = sync.subscribe(|_| {}, |_| {});
    assert!(matches!(result, Err(SyncError::Runtime(_))));
}

#[test]
fn test_apply_snapshot_publishes_atomically() {
    let (db, _feed) = FakeDatabase::new();
    let sync = ListSync::new(db, "voice_files");
    let before = sync.catalog();

    let published = sync.apply_snapshot(&DataSnapshot::at_path(
        "voice_files",
        json!({ "2": { "file_url": "https://x/2.mp3" }, "1": { "file_url": "https://x/1.mp3" } }),
    ));

    assert!(before.is_empty());
    assert!(Arc::ptr_eq(&published, &sync.catalog()));
    assert_eq!(published.names(), vec!["1", "2"]);
}
