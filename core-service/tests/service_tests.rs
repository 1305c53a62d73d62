//! End-to-end tests for the core service: snapshot in, prompt out, decision
//! in, notification out.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    AudioAttributes, DataSnapshot, MediaPlayer, MediaPlayerFactory, PrepareCallback,
    RealtimeDatabase, SnapshotStream,
};
use core_service::{
    CatalogEvent, ConfirmationPrompt, CoreConfig, CoreError, CoreEvent, CoreService, Decision,
    EventStream, Notification, Notifier, PlaybackEvent,
};
use futures::channel::mpsc;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc as tokio_mpsc;
use tokio::time::timeout;

// ============================================================================
// Fakes
// ============================================================================

type Feed = mpsc::UnboundedSender<BridgeResult<DataSnapshot>>;

struct FakeDatabase {
    feed: Mutex<Option<mpsc::UnboundedReceiver<BridgeResult<DataSnapshot>>>>,
}

#[async_trait]
impl RealtimeDatabase for FakeDatabase {
    async fn listen(&self, _path: &str) -> BridgeResult<SnapshotStream> {
        let rx = self
            .feed
            .lock()
            .take()
            .ok_or_else(|| BridgeError::OperationFailed("already listening".to_string()))?;
        Ok(Box::pin(rx))
    }
}

#[derive(Default)]
struct PlayerLog {
    created: AtomicUsize,
    started: AtomicUsize,
    released: AtomicUsize,
}

struct FakePlayer {
    log: Arc<PlayerLog>,
    released: bool,
}

impl MediaPlayer for FakePlayer {
    fn set_audio_attributes(&mut self, _attributes: AudioAttributes) -> BridgeResult<()> {
        Ok(())
    }

    fn set_data_source(&mut self, url: &str) -> BridgeResult<()> {
        if url.starts_with("https://") {
            Ok(())
        } else {
            Err(BridgeError::InvalidSource(url.to_string()))
        }
    }

    fn prepare_async(&mut self, on_complete: PrepareCallback) -> BridgeResult<()> {
        on_complete(Ok(()));
        Ok(())
    }

    fn start(&mut self) -> BridgeResult<()> {
        self.log.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct FakeFactory {
    log: Arc<PlayerLog>,
}

impl MediaPlayerFactory for FakeFactory {
    fn create(&self) -> BridgeResult<Box<dyn MediaPlayer>> {
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePlayer {
            log: Arc::clone(&self.log),
            released: false,
        }))
    }
}

struct ChannelNotifier(tokio_mpsc::UnboundedSender<Notification>);

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        let _ = self.0.send(notification);
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    service: CoreService,
    feed: Feed,
    events: EventStream,
    notifications: tokio_mpsc::UnboundedReceiver<Notification>,
    players: Arc<PlayerLog>,
}

fn config(database: Arc<FakeDatabase>, players: Arc<PlayerLog>) -> CoreConfig {
    CoreConfig::builder()
        .database_url("https://clipdeck-test.firebaseio.com")
        .realtime_database(database)
        .media_player_factory(Arc::new(FakeFactory { log: players }))
        .build()
        .unwrap()
}

fn start() -> Harness {
    let (feed, rx) = mpsc::unbounded();
    let database = Arc::new(FakeDatabase {
        feed: Mutex::new(Some(rx)),
    });
    let players = Arc::new(PlayerLog::default());
    let (notify_tx, notifications) = tokio_mpsc::unbounded_channel();

    let service = CoreService::with_notifier(
        config(database, Arc::clone(&players)),
        Arc::new(ChannelNotifier(notify_tx)),
    )
    .unwrap();
    let events = service.subscribe_events();

    Harness {
        service,
        feed,
        events,
        notifications,
        players,
    }
}

impl Harness {
    fn push(&self, value: Value) {
        self.feed
            .unbounded_send(Ok(DataSnapshot::at_path("voice_files", value)))
            .unwrap();
    }

    async fn next_event(&mut self) -> CoreEvent {
        timeout(Duration::from_secs(2), self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event bus closed")
    }

    async fn next_notification(&mut self) -> Notification {
        timeout(Duration::from_secs(2), self.notifications.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("notifier dropped")
    }

    async fn catalog_updated(&mut self) -> Vec<String> {
        match self.next_event().await {
            CoreEvent::Catalog(CatalogEvent::Updated { entries }) => entries,
            other => panic!("expected catalog update, got {other:?}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_select_confirm_plays_clip() {
    let mut h = start();
    h.push(json!({ "clip1": { "file_url": "https://x/a.mp3" } }));

    assert_eq!(h.catalog_updated().await, vec!["clip1"]);
    assert_eq!(h.service.entries(), vec!["clip1"]);

    let prompt = h.service.select(0).expect("prompt for clip1");
    assert_eq!(prompt.title, "Audio URL");
    assert_eq!(prompt.message, "https://x/a.mp3");

    h.service.decide(prompt, Decision::Confirm).unwrap();

    assert_eq!(h.next_notification().await, Notification::PlaybackStarted);
    assert_eq!(
        h.next_event().await,
        CoreEvent::Playback(PlaybackEvent::Preparing {
            url: "https://x/a.mp3".to_string()
        })
    );
    assert_eq!(
        h.next_event().await,
        CoreEvent::Playback(PlaybackEvent::Started {
            url: "https://x/a.mp3".to_string()
        })
    );
    assert_eq!(h.players.created.load(Ordering::SeqCst), 1);
    assert_eq!(h.players.started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_catalog_yields_no_prompt() {
    let mut h = start();
    h.push(json!({}));

    assert!(h.catalog_updated().await.is_empty());
    assert!(h.service.select(0).is_none());
    assert!(h.service.entries().is_empty());
}

#[tokio::test]
async fn test_entry_without_url_reports_failure() {
    let mut h = start();
    h.push(json!({ "orphan": { "title": "no link" } }));
    h.catalog_updated().await;

    let prompt = h.service.select(0).unwrap();
    assert_eq!(prompt.message, "");

    h.service.decide(prompt, Decision::Confirm).unwrap();

    assert_eq!(h.next_notification().await, Notification::PlaybackFailed);
    match h.next_event().await {
        CoreEvent::Playback(PlaybackEvent::Failed { url, .. }) => assert_eq!(url, None),
        other => panic!("expected playback failure, got {other:?}"),
    }
    assert_eq!(h.players.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancel_has_no_side_effect() {
    let mut h = start();
    h.push(json!({ "clip1": { "file_url": "https://x/a.mp3" } }));
    h.catalog_updated().await;

    let prompt = h.service.select(0).unwrap();
    h.service.decide(prompt, Decision::Cancel).unwrap();
    h.service.shutdown().await.unwrap();

    assert_eq!(h.players.created.load(Ordering::SeqCst), 0);
    assert!(h.notifications.try_recv().is_err());
    assert!(h.events.try_recv().is_none());
}

#[tokio::test]
async fn test_list_denial_notifies_and_keeps_catalog() {
    let mut h = start();
    h.push(json!({ "clip1": { "file_url": "https://x/a.mp3" } }));
    h.catalog_updated().await;

    h.feed
        .unbounded_send(Err(BridgeError::PermissionDenied(
            "Permission denied".to_string(),
        )))
        .unwrap();

    assert_eq!(h.next_notification().await, Notification::ListFetchFailed);
    match h.next_event().await {
        CoreEvent::Catalog(CatalogEvent::FetchDenied { reason }) => {
            assert!(reason.contains("Permission denied"), "reason: {reason}")
        }
        other => panic!("expected fetch denied, got {other:?}"),
    }
    assert_eq!(h.service.entries(), vec!["clip1"]);
    assert!(h.service.select(0).is_some());
}

#[tokio::test]
async fn test_new_selection_replaces_playing_clip() {
    let mut h = start();
    h.push(json!({
        "clip1": { "file_url": "https://x/a.mp3" },
        "clip2": { "file_url": "https://x/b.mp3" }
    }));
    h.catalog_updated().await;

    let first = h.service.select(0).unwrap();
    h.service.decide(first, Decision::Confirm).unwrap();
    assert_eq!(h.next_notification().await, Notification::PlaybackStarted);

    let second = h.service.select(1).unwrap();
    h.service.decide(second, Decision::Confirm).unwrap();
    assert_eq!(h.next_notification().await, Notification::PlaybackStarted);

    assert_eq!(h.players.created.load(Ordering::SeqCst), 2);
    assert_eq!(h.players.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shutdown_releases_and_is_idempotent() {
    let mut h = start();
    h.push(json!({ "clip1": { "file_url": "https://x/a.mp3" } }));
    h.catalog_updated().await;

    let prompt = h.service.select(0).unwrap();
    h.service.decide(prompt.clone(), Decision::Confirm).unwrap();
    assert_eq!(h.next_notification().await, Notification::PlaybackStarted);

    h.service.shutdown().await.unwrap();
    h.service.shutdown().await.unwrap();

    assert_eq!(h.players.released.load(Ordering::SeqCst), 1);
    assert!(matches!(
        h.service.decide(prompt, Decision::Confirm),
        Err(CoreError::ShutDown)
    ));
}

#[test]
fn test_start_outside_runtime_fails() {
    let (_feed, rx) = mpsc::unbounded();
    let database = Arc::new(FakeDatabase {
        feed: Mutex::new(Some(rx)),
    });
    let result = CoreService::start(config(database, Arc::new(PlayerLog::default())));

    assert!(matches!(result, Err(CoreError::InitializationFailed(_))));
}

#[test]
fn test_prompt_is_plain_data() {
    let entry = core_service::AudioEntry::new("clip1", Some("https://x/a.mp3".to_string()));
    let prompt = ConfirmationPrompt::for_entry(&entry);
    let json = serde_json::to_value(&prompt).unwrap();

    assert_eq!(json["title"], "Audio URL");
    assert_eq!(json["message"], "https://x/a.mp3");
}
