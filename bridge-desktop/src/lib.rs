//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `RealtimeDatabase` over the Firebase Realtime Database REST streaming API
//! - `MediaPlayerFactory` decoding with `symphonia`, resampling with `rubato`
//!   and playing through `cpal`
//!
//! ## Feature Flags
//!
//! - `audio-output`: Enable the symphonia/cpal media player (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FirebaseRealtimeDatabase, ReqwestHttpClient, SymphoniaPlayerFactory};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let http = Arc::new(ReqwestHttpClient::new().unwrap());
//!     let database = FirebaseRealtimeDatabase::new(http.clone(), "https://demo.firebaseio.com");
//!     let players = SymphoniaPlayerFactory::from_current(http).unwrap();
//! }
//! ```

mod firebase;
mod http;
mod sse;

#[cfg(feature = "audio-output")]
mod decode;
#[cfg(feature = "audio-output")]
mod output;
#[cfg(feature = "audio-output")]
mod player;
#[cfg(feature = "audio-output")]
mod resample;

pub use firebase::FirebaseRealtimeDatabase;
pub use http::ReqwestHttpClient;
pub use sse::{SseDecoder, SseEvent};

#[cfg(feature = "audio-output")]
pub use decode::{decode_clip, DecodedClip};
#[cfg(feature = "audio-output")]
pub use player::{SymphoniaPlayer, SymphoniaPlayerFactory};
