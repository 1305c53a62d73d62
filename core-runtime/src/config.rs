//! # Core Configuration Module
//!
//! Provides configuration management for the player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all necessary dependencies and settings. It enforces
//! fail-fast validation so a misconfigured host fails at startup rather than
//! on the first remote update.
//!
//! ## Required Settings
//!
//! - `database_url` - Base URL of the realtime database (`http`/`https`)
//!
//! ## Bridges (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - `RealtimeDatabase` - Live audio list feed (desktop default: Firebase REST streaming)
//! - `MediaPlayerFactory` - Audio output (desktop default: symphonia + cpal)
//!
//! When the `desktop-shims` feature is enabled, desktop defaults are injected
//! for any bridge that was not provided. Without it, every bridge must be
//! supplied by the host.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_url("https://demo-default-rtdb.firebaseio.com")
//!     .collection_path("voice_files")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, MediaPlayerFactory, RealtimeDatabase};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Database node holding the audio list when none is configured.
pub const DEFAULT_COLLECTION_PATH: &str = "voice_files";

/// Request timeout for buffered HTTP calls (clip downloads).
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the database base URL.
pub const ENV_DATABASE_URL: &str = "CLIPDECK_DATABASE_URL";

/// Environment variable overriding the collection path.
pub const ENV_COLLECTION_PATH: &str = "CLIPDECK_COLLECTION_PATH";

/// Core configuration for the player core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL of the realtime database
    pub database_url: String,

    /// Node listing the audio clips
    pub collection_path: String,

    /// Timeout for buffered HTTP requests
    pub http_timeout: Duration,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// HTTP client shared by the database feed and the media player
    pub http_client: Arc<dyn HttpClient>,

    /// Realtime database bridge
    pub realtime_database: Arc<dyn RealtimeDatabase>,

    /// Media player factory
    pub media_player_factory: Arc<dyn MediaPlayerFactory>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_url", &self.database_url)
            .field("collection_path", &self.collection_path)
            .field("http_timeout", &self.http_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("realtime_database", &"RealtimeDatabase { ... }")
            .field("media_player_factory", &"MediaPlayerFactory { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Builder pre-filled from `CLIPDECK_DATABASE_URL` and `CLIPDECK_COLLECTION_PATH`.
    ///
    /// Bridges can still be injected on the returned builder.
    pub fn from_env() -> CoreConfigBuilder {
        Self::builder_from_vars(|key| std::env::var(key).ok())
    }

    fn builder_from_vars<F>(lookup: F) -> CoreConfigBuilder
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            builder = builder.database_url(url);
        }
        if let Some(path) = lookup(ENV_COLLECTION_PATH) {
            builder = builder.collection_path(path);
        }
        builder
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database URL parses and uses `http` or `https`
    /// - Collection path is not empty
    /// - Timeout and event buffer are non-zero
    pub fn validate(&self) -> Result<()> {
        validate_database_url(&self.database_url)?;

        if self.collection_path.trim_matches('/').is_empty() {
            return Err(Error::Config("Collection path cannot be empty".to_string()));
        }

        if self.http_timeout.is_zero() {
            return Err(Error::Config(
                "HTTP timeout must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_database_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| Error::Config(format!("Database URL is not a valid URL: {}", e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!(
            "Database URL must use http or https, got '{}'",
            other
        ))),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn bridge_missing_error(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use the default. \
             Other hosts: inject a platform implementation through the builder.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout).map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(bridge_missing_error("HttpClient", "network access"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_realtime_database(
    http: Arc<dyn HttpClient>,
    database_url: &str,
) -> Result<Arc<dyn RealtimeDatabase>> {
    use bridge_desktop::FirebaseRealtimeDatabase;

    Ok(Arc::new(FirebaseRealtimeDatabase::new(http, database_url)))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_realtime_database(
    _http: Arc<dyn HttpClient>,
    _database_url: &str,
) -> Result<Arc<dyn RealtimeDatabase>> {
    Err(bridge_missing_error(
        "RealtimeDatabase",
        "listening to the audio list",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_media_player_factory(
    http: Arc<dyn HttpClient>,
) -> Result<Arc<dyn MediaPlayerFactory>> {
    use bridge_desktop::SymphoniaPlayerFactory;

    let factory = SymphoniaPlayerFactory::from_current(http).map_err(|e| {
        Error::Internal(format!(
            "Default MediaPlayerFactory needs a running Tokio runtime: {}",
            e
        ))
    })?;
    Ok(Arc::new(factory))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_media_player_factory(
    _http: Arc<dyn HttpClient>,
) -> Result<Arc<dyn MediaPlayerFactory>> {
    Err(bridge_missing_error("MediaPlayerFactory", "audio playback"))
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) once everything is set; it
/// returns an actionable error when a setting or bridge is missing.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_url: Option<String>,
    collection_path: Option<String>,
    http_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    realtime_database: Option<Arc<dyn RealtimeDatabase>>,
    media_player_factory: Option<Arc<dyn MediaPlayerFactory>>,
}

impl CoreConfigBuilder {
    /// Sets the realtime database base URL.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .database_url("https://demo-default-rtdb.firebaseio.com");
    /// ```
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Sets the node holding the audio list.
    ///
    /// Default: `voice_files`
    pub fn collection_path(mut self, path: impl Into<String>) -> Self {
        self.collection_path = Some(path.into());
        self
    }

    /// Sets the timeout for buffered HTTP requests.
    ///
    /// Default: 30 seconds. Only used when the default HTTP client is created.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the realtime database implementation.
    pub fn realtime_database(mut self, database: Arc<dyn RealtimeDatabase>) -> Self {
        self.realtime_database = Some(database);
        self
    }

    /// Sets the media player factory implementation.
    pub fn media_player_factory(mut self, factory: Arc<dyn MediaPlayerFactory>) -> Self {
        self.media_player_factory = Some(factory);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when the database URL is missing or invalid, or a
    ///   value fails validation
    /// - `Error::CapabilityMissing` when a bridge is missing and no default
    ///   is available
    pub fn build(self) -> Result<CoreConfig> {
        let database_url = self.database_url.ok_or_else(|| {
            Error::Config(format!(
                "Database URL is required. Use .database_url() or set {}.",
                ENV_DATABASE_URL
            ))
        })?;
        validate_database_url(&database_url)?;

        let http_timeout = self.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT);

        let needs_http = self.http_client.is_none()
            && (self.realtime_database.is_none() || self.media_player_factory.is_none());
        let http_client = match self.http_client {
            Some(client) => client,
            None if needs_http => provide_default_http_client(http_timeout)?,
            None => Arc::new(UnusedHttpClient),
        };

        let realtime_database = match self.realtime_database {
            Some(database) => database,
            None => provide_default_realtime_database(Arc::clone(&http_client), &database_url)?,
        };

        let media_player_factory = match self.media_player_factory {
            Some(factory) => factory,
            None => provide_default_media_player_factory(Arc::clone(&http_client))?,
        };

        let config = CoreConfig {
            database_url,
            collection_path: self
                .collection_path
                .unwrap_or_else(|| DEFAULT_COLLECTION_PATH.to_string()),
            http_timeout,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            realtime_database,
            media_player_factory,
        };

        config.validate()?;

        Ok(config)
    }
}

/// Stand-in when every bridge that needs HTTP was injected by the host.
struct UnusedHttpClient;

#[async_trait::async_trait]
impl HttpClient for UnusedHttpClient {
    async fn execute(
        &self,
        _request: bridge_traits::HttpRequest,
    ) -> bridge_traits::error::Result<bridge_traits::HttpResponse> {
        Err(bridge_traits::BridgeError::NotAvailable(
            "No HttpClient configured".to_string(),
        ))
    }

    async fn execute_streaming(
        &self,
        _request: bridge_traits::HttpRequest,
    ) -> bridge_traits::error::Result<bridge_traits::StreamingResponse> {
        Err(bridge_traits::BridgeError::NotAvailable(
            "No HttpClient configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{DataSnapshot, MediaPlayer, SnapshotStream};
    use futures::stream;
    use std::collections::HashMap;

    struct StubDatabase;

    #[async_trait::async_trait]
    impl RealtimeDatabase for StubDatabase {
        async fn listen(&self, _path: &str) -> bridge_traits::error::Result<SnapshotStream> {
            Ok(Box::pin(stream::iter(vec![Ok(DataSnapshot::new(
                None,
                serde_json::Value::Null,
            ))])))
        }
    }

    struct StubFactory;

    impl MediaPlayerFactory for StubFactory {
        fn create(&self) -> bridge_traits::error::Result<Box<dyn MediaPlayer>> {
            Err(bridge_traits::BridgeError::NotAvailable("stub".to_string()))
        }
    }

    fn injected() -> CoreConfigBuilder {
        CoreConfig::builder()
            .realtime_database(Arc::new(StubDatabase))
            .media_player_factory(Arc::new(StubFactory))
    }

    #[test]
    fn test_builder_requires_database_url() {
        let err = injected().build().unwrap_err();
        assert!(err.to_string().contains("Database URL is required"));
    }

    #[test]
    fn test_builder_rejects_non_http_url() {
        let err = injected()
            .database_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http or https"));

        let err = injected().database_url("not a url").build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_builder_defaults() {
        let config = injected()
            .database_url("https://demo.firebaseio.com")
            .build()
            .unwrap();

        assert_eq!(config.collection_path, DEFAULT_COLLECTION_PATH);
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
        assert_eq!(config.event_buffer_size, 100);
    }

    #[test]
    fn test_builder_overrides() {
        let config = injected()
            .database_url("http://localhost:9000")
            .collection_path("clips/en")
            .http_timeout(Duration::from_secs(5))
            .event_buffer_size(8)
            .build()
            .unwrap();

        assert_eq!(config.collection_path, "clips/en");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.event_buffer_size, 8);
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        let err = injected()
            .database_url("https://demo.firebaseio.com")
            .collection_path("/")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Collection path"));

        let err = injected()
            .database_url("https://demo.firebaseio.com")
            .event_buffer_size(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Event buffer size"));

        let err = injected()
            .database_url("https://demo.firebaseio.com")
            .http_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("HTTP timeout"));
    }

    #[test]
    fn test_builder_from_vars() {
        let vars: HashMap<&str, &str> = [
            (ENV_DATABASE_URL, "https://env.firebaseio.com"),
            (ENV_COLLECTION_PATH, "greetings"),
        ]
        .into_iter()
        .collect();

        let config = CoreConfig::builder_from_vars(|key| vars.get(key).map(|v| v.to_string()))
            .realtime_database(Arc::new(StubDatabase))
            .media_player_factory(Arc::new(StubFactory))
            .build()
            .unwrap();

        assert_eq!(config.database_url, "https://env.firebaseio.com");
        assert_eq!(config.collection_path, "greetings");
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_bridge_is_capability_error() {
        let err = CoreConfig::builder()
            .database_url("https://demo.firebaseio.com")
            .build()
            .unwrap_err();

        match err {
            Error::CapabilityMissing { capability, .. } => assert_eq!(capability, "HttpClient"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_desktop_defaults_fill_bridges() {
        let config = CoreConfig::builder()
            .database_url("https://demo.firebaseio.com")
            .build()
            .unwrap();

        assert!(config.media_player_factory.create().is_ok());
    }

    #[test]
    fn test_config_debug_hides_bridges() {
        let config = injected()
            .database_url("https://demo.firebaseio.com")
            .build()
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("RealtimeDatabase { ... }"));
        assert!(debug.contains("voice_files"));
    }
}
