//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that is implemented differently per platform.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Buffered and streaming HTTP requests
//! - [`RealtimeDatabase`](realtime::RealtimeDatabase) - Snapshot listeners on a remote JSON tree
//!
//! ### Media
//! - [`MediaPlayer`](playback::MediaPlayer) - Single-locator prepare/start/release player
//! - [`MediaPlayerFactory`](playback::MediaPlayerFactory) - Creates fresh players
//!
//! ### Utilities
//! - [`redact_url`](logging::redact_url) - Strip tokens from clip locators before logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Tests    | in-crate fakes      |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it, and report a refused remote read
//! as [`BridgeError::PermissionDenied`] so the core can tell denial apart
//! from transport failure.
//!
//! ## Thread Safety
//!
//! Shared bridges require `Send + Sync`; a [`MediaPlayer`](playback::MediaPlayer)
//! is owned by one playback slot and only needs `Send`.

pub mod error;
pub mod http;
pub mod logging;
pub mod playback;
pub mod realtime;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpRequest, HttpResponse, StreamingResponse};
pub use playback::{
    AudioAttributes, AudioUsage, ContentType, MediaPlayer, MediaPlayerFactory, PrepareCallback,
};
pub use realtime::{DataSnapshot, RealtimeDatabase, SnapshotStream};
