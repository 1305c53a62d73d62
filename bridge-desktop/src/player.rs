//! Desktop media player: fetch, decode with symphonia, play through cpal.

use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpRequest},
    logging::redact_url,
    playback::{AudioAttributes, MediaPlayer, MediaPlayerFactory, PrepareCallback},
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::decode::{decode_clip, DecodedClip};
use crate::output::OutputThread;

/// Hands out [`SymphoniaPlayer`]s that share one HTTP client and runtime.
pub struct SymphoniaPlayerFactory {
    http: Arc<dyn HttpClient>,
    runtime: Handle,
}

impl SymphoniaPlayerFactory {
    pub fn new(http: Arc<dyn HttpClient>, runtime: Handle) -> Self {
        Self { http, runtime }
    }

    /// Use the runtime of the calling task.
    pub fn from_current(http: Arc<dyn HttpClient>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| BridgeError::NotAvailable(format!("No Tokio runtime: {}", e)))?;
        Ok(Self::new(http, runtime))
    }
}

impl MediaPlayerFactory for SymphoniaPlayerFactory {
    fn create(&self) -> Result<Box<dyn MediaPlayer>> {
        Ok(Box::new(SymphoniaPlayer::new(
            Arc::clone(&self.http),
            self.runtime.clone(),
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerState {
    Idle,
    Bound,
    Preparing,
    Started,
    Released,
}

/// Single-use player for one clip.
///
/// The whole clip is fetched and decoded during preparation, so `start`
/// only has to open the output device.
pub struct SymphoniaPlayer {
    http: Arc<dyn HttpClient>,
    runtime: Handle,
    state: PlayerState,
    attributes: AudioAttributes,
    source: Option<Url>,
    prepared: Arc<Mutex<Option<DecodedClip>>>,
    prepare_task: Option<JoinHandle<()>>,
    output: Option<OutputThread>,
}

impl SymphoniaPlayer {
    pub fn new(http: Arc<dyn HttpClient>, runtime: Handle) -> Self {
        Self {
            http,
            runtime,
            state: PlayerState::Idle,
            attributes: AudioAttributes::default(),
            source: None,
            prepared: Arc::new(Mutex::new(None)),
            prepare_task: None,
            output: None,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.state == PlayerState::Released {
            return Err(BridgeError::OperationFailed(
                "Player has been released".to_string(),
            ));
        }
        Ok(())
    }
}

impl MediaPlayer for SymphoniaPlayer {
    fn set_audio_attributes(&mut self, attributes: AudioAttributes) -> Result<()> {
        self.ensure_live()?;
        // cpal has a single output role; attributes are recorded for logging only.
        self.attributes = attributes;
        Ok(())
    }

    fn set_data_source(&mut self, url: &str) -> Result<()> {
        self.ensure_live()?;
        if self.state != PlayerState::Idle {
            return Err(BridgeError::OperationFailed(
                "Data source already set".to_string(),
            ));
        }

        let parsed = Url::parse(url).map_err(|e| {
            BridgeError::InvalidSource(format!("Malformed locator {}: {}", redact_url(url), e))
        })?;
        match parsed.scheme() {
            "http" | "https" | "file" => {}
            other => {
                return Err(BridgeError::InvalidSource(format!(
                    "Unsupported scheme: {}",
                    other
                )))
            }
        }

        debug!(url = %redact_url(url), "Data source bound");
        self.source = Some(parsed);
        self.state = PlayerState::Bound;
        Ok(())
    }

    fn prepare_async(&mut self, on_complete: PrepareCallback) -> Result<()> {
        self.ensure_live()?;
        let source = match (self.state, &self.source) {
            (PlayerState::Bound, Some(source)) => source.clone(),
            _ => {
                return Err(BridgeError::OperationFailed(
                    "Player has no data source to prepare".to_string(),
                ))
            }
        };

        let http = Arc::clone(&self.http);
        let slot = Arc::clone(&self.prepared);
        let attributes = self.attributes;

        self.prepare_task = Some(self.runtime.spawn(async move {
            match load_clip(http, &source).await {
                Ok(clip) => {
                    info!(
                        url = %redact_url(source.as_str()),
                        usage = ?attributes.usage,
                        frames = clip.frames(),
                        "Clip prepared"
                    );
                    *slot.lock() = Some(clip);
                    on_complete(Ok(()));
                }
                Err(e) => {
                    warn!(url = %redact_url(source.as_str()), error = %e, "Clip preparation failed");
                    on_complete(Err(e));
                }
            }
        }));
        self.state = PlayerState::Preparing;
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.state != PlayerState::Preparing {
            return Err(BridgeError::OperationFailed(
                "Player is not prepared".to_string(),
            ));
        }

        let clip = self.prepared.lock().take().ok_or_else(|| {
            BridgeError::OperationFailed("Player is not prepared".to_string())
        })?;

        self.output = Some(OutputThread::spawn(clip)?);
        self.state = PlayerState::Started;
        Ok(())
    }

    fn release(&mut self) {
        if self.state == PlayerState::Released {
            return;
        }

        if let Some(task) = self.prepare_task.take() {
            task.abort();
        }
        if let Some(mut output) = self.output.take() {
            output.stop();
        }
        self.prepared.lock().take();
        self.source = None;
        self.state = PlayerState::Released;
        debug!("Player released");
    }
}

impl Drop for SymphoniaPlayer {
    fn drop(&mut self) {
        self.release();
    }
}

async fn load_clip(http: Arc<dyn HttpClient>, source: &Url) -> Result<DecodedClip> {
    let data = fetch(http, source).await?;
    let extension = Path::new(source.path())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    tokio::task::spawn_blocking(move || decode_clip(data, extension.as_deref()))
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Decode task failed: {}", e)))?
}

async fn fetch(http: Arc<dyn HttpClient>, source: &Url) -> Result<Bytes> {
    if source.scheme() == "file" {
        let path = source
            .to_file_path()
            .map_err(|_| BridgeError::InvalidSource("Invalid file locator".to_string()))?;
        let data = tokio::fs::read(path).await?;
        return Ok(Bytes::from(data));
    }

    let response = http.execute(HttpRequest::get(source.as_str())).await?;
    if !response.is_success() {
        return Err(BridgeError::OperationFailed(format!(
            "Fetching clip failed with HTTP {}",
            response.status
        )));
    }
    Ok(response.body)
}
