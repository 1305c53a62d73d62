//! Media output bridge traits.
//!
//! A [`MediaPlayer`] is a single-use decoder/output resource bound to one
//! locator: configure it, bind a data source, prepare it asynchronously,
//! start it, release it. Host applications provide a [`MediaPlayerFactory`]
//! that hands out fresh players (desktop: symphonia + cpal, mobile: the
//! platform media player).

use crate::error::Result;

/// What the audio is for; hosts use it to pick output routing and focus policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioUsage {
    #[default]
    Media,
}

/// What kind of content the stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Music,
}

/// Output attributes applied to a player before binding a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioAttributes {
    pub usage: AudioUsage,
    pub content_type: ContentType,
}

impl AudioAttributes {
    /// Media usage with music content.
    pub fn music() -> Self {
        Self {
            usage: AudioUsage::Media,
            content_type: ContentType::Music,
        }
    }
}

/// Completion callback for [`MediaPlayer::prepare_async`].
///
/// Invoked exactly once, from whatever thread finished preparation.
pub type PrepareCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// Platform media player bound to a single locator.
///
/// Calls other than `release` after `release` must fail; `release` itself
/// is idempotent.
pub trait MediaPlayer: Send {
    /// Configure output attributes. Must be called before binding a source.
    fn set_audio_attributes(&mut self, attributes: AudioAttributes) -> Result<()>;

    /// Bind the player to a URL-style locator. Fails synchronously for
    /// malformed or unsupported locators.
    fn set_data_source(&mut self, url: &str) -> Result<()>;

    /// Begin non-blocking preparation. `on_complete` is invoked once with the
    /// outcome. Returns an error only if preparation could not be scheduled.
    fn prepare_async(&mut self, on_complete: PrepareCallback) -> Result<()>;

    /// Begin playback of a prepared source.
    fn start(&mut self) -> Result<()>;

    /// Stop output and free decoder/device resources.
    fn release(&mut self);
}

/// Creates fresh [`MediaPlayer`] instances.
pub trait MediaPlayerFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn MediaPlayer>>;
}
