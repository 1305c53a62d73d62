//! # List Sync
//!
//! Keeps an [`AudioCatalog`] in step with a live node of the realtime
//! database.
//!
//! ## Overview
//!
//! [`ListSync::subscribe`] spawns a listener task that consumes the
//! database's snapshot stream. Each snapshot replaces the catalog wholesale
//! and the new catalog is published with a single pointer swap, so readers
//! calling [`ListSync::catalog`] see either the previous list or the new one,
//! never a mix.
//!
//! A denied or failed listener is reported once through the error callback;
//! the last published catalog stays in place.
//!
//! ## Usage
//!
//! ```ignore
//! let sync = ListSync::new(database, "voice_files");
//! let subscription = sync.subscribe(
//!     |catalog| println!("{} clips", catalog.len()),
//!     |error| eprintln!("{}", error),
//! )?;
//! // ...
//! subscription.unsubscribe();
//! ```

use crate::catalog::AudioCatalog;
use crate::error::{Result, SyncError};
use bridge_traits::{DataSnapshot, RealtimeDatabase};
use futures::StreamExt;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Projects a remote collection node into an ordered catalog.
#[derive(Clone)]
pub struct ListSync {
    database: Arc<dyn RealtimeDatabase>,
    path: String,
    catalog: Arc<RwLock<Arc<AudioCatalog>>>,
}

impl ListSync {
    pub fn new(database: Arc<dyn RealtimeDatabase>, path: impl Into<String>) -> Self {
        Self {
            database,
            path: path.into(),
            catalog: Arc::new(RwLock::new(Arc::new(AudioCatalog::default()))),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current catalog. Empty until the first snapshot arrives.
    pub fn catalog(&self) -> Arc<AudioCatalog> {
        Arc::clone(&self.catalog.read())
    }

    /// Rebuild the catalog from `snapshot` and publish it.
    pub fn apply_snapshot(&self, snapshot: &DataSnapshot) -> Arc<AudioCatalog> {
        let catalog = Arc::new(AudioCatalog::from_snapshot(snapshot));
        *self.catalog.write() = Arc::clone(&catalog);
        debug!(path = %self.path, entries = catalog.len(), "Catalog published");
        catalog
    }

    /// Start listening to the collection node.
    ///
    /// `on_updated` receives every newly published catalog. `on_error` is
    /// called at most once, when the listener stops for any reason other
    /// than [`Subscription::unsubscribe`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Runtime`] when called outside a Tokio runtime.
    pub fn subscribe<U, E>(&self, on_updated: U, on_error: E) -> Result<Subscription>
    where
        U: Fn(Arc<AudioCatalog>) + Send + Sync + 'static,
        E: FnOnce(SyncError) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|e| SyncError::Runtime(e.to_string()))?;
        let token = CancellationToken::new();
        let sync = self.clone();
        let task_token = token.clone();

        let task = runtime.spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {
                    debug!(path = %sync.path, "Listener cancelled");
                }
                outcome = sync.run_listener(on_updated) => {
                    if let Err(error) = outcome {
                        on_error(error);
                    }
                }
            }
        });

        info!(path = %self.path, "Subscribed to audio list");
        Ok(Subscription {
            token,
            task: Some(task),
        })
    }

    #[instrument(skip(self, on_updated), fields(path = %self.path))]
    async fn run_listener<U>(&self, on_updated: U) -> Result<()>
    where
        U: Fn(Arc<AudioCatalog>) + Send + Sync + 'static,
    {
        let mut stream = self
            .database
            .listen(&self.path)
            .await
            .map_err(SyncError::from_listener)?;

        while let Some(item) = stream.next().await {
            match item {
                Ok(snapshot) => on_updated(self.apply_snapshot(&snapshot)),
                Err(e) => {
                    let error = SyncError::from_listener(e);
                    warn!(error = %error, "Audio list listener stopped");
                    return Err(error);
                }
            }
        }

        warn!("Audio list stream ended");
        Err(SyncError::ListenerClosed)
    }
}

impl std::fmt::Debug for ListSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListSync")
            .field("path", &self.path)
            .field("entries", &self.catalog.read().len())
            .finish()
    }
}

/// Handle to a running listener. Dropping it also unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop the listener and close the remote stream.
    ///
    /// No callback fires after this returns, except one that was already
    /// running on another thread.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    /// Whether the listener task has ended (cancelled, denied or closed).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map(JoinHandle::is_finished).unwrap_or(true)
    }

    fn cancel(&mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
