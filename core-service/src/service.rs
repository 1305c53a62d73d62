//! # Core Service
//!
//! Wires the live audio list and the playback session behind one façade.
//!
//! ## Event Loop
//!
//! A single task owns the [`PlaybackSession`]. Catalog updates, listener
//! failures, confirmed selections and prepare completions all arrive on
//! that task, so the playback slot is only ever mutated from one place.
//!
//! ```text
//!  ListSync ──updates/errors──┐
//!  decide(Confirm) ──Play─────┼──► event loop ──► PlaybackSession
//!  player ──completions───────┘        │
//!                                      ├──► EventBus
//!                                      └──► Notifier
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let service = CoreService::start(config)?;
//!
//! if let Some(prompt) = service.select(0) {
//!     service.decide(prompt, Decision::Confirm)?;
//! }
//!
//! service.shutdown().await?;
//! ```

use crate::error::{CoreError, Result};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::prompt::{ConfirmationPrompt, Decision};
use bridge_traits::logging::redact_url;
use core_playback::{PlaybackError, PlaybackSession, PrepareCompletions};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus, EventStream, PlaybackEvent};
use core_sync::{AudioCatalog, ListSync, Subscription, SyncError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

enum Command {
    CatalogUpdated(Arc<AudioCatalog>),
    ListFailed(SyncError),
    Play { url: Option<String> },
    Shutdown,
}

/// Primary façade exposed to host applications.
pub struct CoreService {
    sync: ListSync,
    events: EventBus,
    commands: mpsc::UnboundedSender<Command>,
    subscription: Mutex<Option<Subscription>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CoreService {
    /// Start the service with notifications written to the log.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InitializationFailed`] when called outside a
    /// Tokio runtime.
    pub fn start(config: CoreConfig) -> Result<Self> {
        Self::with_notifier(config, Arc::new(TracingNotifier))
    }

    /// Start the service, subscribe to the configured collection and spawn
    /// the event loop.
    pub fn with_notifier(config: CoreConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let runtime =
            Handle::try_current().map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        let events = EventBus::new(config.event_buffer_size);
        let sync = ListSync::new(
            Arc::clone(&config.realtime_database),
            config.collection_path.clone(),
        );
        let (session, completions) =
            PlaybackSession::new(Arc::clone(&config.media_player_factory));
        let (commands, inbox) = mpsc::unbounded_channel();

        let updates = commands.clone();
        let failures = commands.clone();
        let subscription = sync.subscribe(
            move |catalog| {
                let _ = updates.send(Command::CatalogUpdated(catalog));
            },
            move |error| {
                let _ = failures.send(Command::ListFailed(error));
            },
        )?;

        let event_loop = EventLoop {
            session,
            completions,
            inbox,
            events: events.clone(),
            notifier,
        };
        let task = runtime.spawn(event_loop.run());

        info!(
            collection = %config.collection_path,
            database = %redact_url(&config.database_url),
            "Core service started"
        );

        Ok(Self {
            sync,
            events,
            commands,
            subscription: Mutex::new(Some(subscription)),
            task: Mutex::new(Some(task)),
        })
    }

    /// The most recently published catalog.
    pub fn catalog(&self) -> Arc<AudioCatalog> {
        self.sync.catalog()
    }

    /// Display text of each entry, in list order.
    pub fn entries(&self) -> Vec<String> {
        self.sync.catalog().names()
    }

    /// Prompt for the entry at `index`, or `None` when the index is out of
    /// range of the current catalog.
    pub fn select(&self, index: usize) -> Option<ConfirmationPrompt> {
        let catalog = self.sync.catalog();
        let entry = catalog.get(index)?;
        debug!(index, entry = entry.name(), "Entry selected");
        Some(ConfirmationPrompt::for_entry(entry))
    }

    /// Apply the user's answer to a prompt.
    ///
    /// [`Decision::Confirm`] queues playback of the prompted locator; the
    /// outcome is reported through the notifier and the event bus.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ShutDown`] when confirming after
    /// [`shutdown`](Self::shutdown).
    pub fn decide(&self, prompt: ConfirmationPrompt, decision: Decision) -> Result<()> {
        match decision {
            Decision::Cancel => {
                debug!(entry = prompt.entry(), "Prompt dismissed");
                Ok(())
            }
            Decision::Confirm => {
                debug!(entry = prompt.entry(), "Playback confirmed");
                self.commands
                    .send(Command::Play {
                        url: prompt.url().map(str::to_string),
                    })
                    .map_err(|_| CoreError::ShutDown)
            }
        }
    }

    /// Subscribe to catalog and playback events.
    pub fn subscribe_events(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Stop listening, release any held player and wait for the event loop
    /// to finish. Idempotent.
    pub async fn shutdown(&self) -> Result<()> {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }

        let _ = self.commands.send(Command::Shutdown);

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Event loop ended abnormally");
            }
            info!("Core service shut down");
        }
        Ok(())
    }
}

impl Drop for CoreService {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.get_mut().take() {
            subscription.unsubscribe();
        }
        let _ = self.commands.send(Command::Shutdown);
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("sync", &self.sync)
            .field("events", &self.events)
            .finish()
    }
}

/// State owned by the event loop task.
struct EventLoop {
    session: PlaybackSession,
    completions: PrepareCompletions,
    inbox: mpsc::UnboundedReceiver<Command>,
    events: EventBus,
    notifier: Arc<dyn Notifier>,
}

impl EventLoop {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                command = self.inbox.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(completion) = self.completions.recv() => {
                    self.session.handle_prepared(completion);
                }
            }
        }

        self.release();
        debug!("Event loop stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::CatalogUpdated(catalog) => {
                debug!(entries = catalog.len(), "Audio list updated");
                self.events
                    .emit(CoreEvent::Catalog(CatalogEvent::Updated {
                        entries: catalog.names(),
                    }));
            }
            Command::ListFailed(error) => {
                warn!(error = %error, "Audio list unavailable");
                self.events
                    .emit(CoreEvent::Catalog(CatalogEvent::FetchDenied {
                        reason: error.to_string(),
                    }));
                self.notifier.notify(Notification::ListFetchFailed);
            }
            Command::Play { url } => self.play(url),
            Command::Shutdown => {}
        }
    }

    fn play(&mut self, url: Option<String>) {
        if self.session.current_handle().is_some() {
            self.events.emit(CoreEvent::Playback(PlaybackEvent::Released));
        }

        let on_started = {
            let events = self.events.clone();
            let notifier = Arc::clone(&self.notifier);
            let url = url.clone().unwrap_or_default();
            move || {
                events.emit(CoreEvent::Playback(PlaybackEvent::Started { url }));
                notifier.notify(Notification::PlaybackStarted);
            }
        };
        let on_failed = {
            let events = self.events.clone();
            let notifier = Arc::clone(&self.notifier);
            let url = url.clone();
            move |error: PlaybackError| {
                events.emit(CoreEvent::Playback(PlaybackEvent::Failed {
                    url,
                    message: error.to_string(),
                }));
                notifier.notify(Notification::PlaybackFailed);
            }
        };

        self.session.play(url.as_deref(), on_started, on_failed);

        if let Some(current) = self.session.current_url() {
            info!(url = %redact_url(current), "Preparing audio");
            self.events
                .emit(CoreEvent::Playback(PlaybackEvent::Preparing {
                    url: current.to_string(),
                }));
        }
    }

    fn release(&mut self) {
        let held = self.session.current_handle().is_some();
        self.session.shutdown();
        if held {
            self.events.emit(CoreEvent::Playback(PlaybackEvent::Released));
        }
    }
}
