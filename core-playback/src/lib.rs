//! # Playback Session Module
//!
//! Keeps at most one media player alive and drives it through
//! bind → prepare → start.
//!
//! ## Overview
//!
//! This module handles:
//! - Acquiring a fresh player per requested clip, releasing the previous one first
//! - Routing asynchronous prepare completions back to the session owner
//! - Ignoring completions from players that were superseded or shut down

pub mod error;
pub mod session;

pub use error::{PlaybackError, Result};
pub use session::{
    HandleId, HandleState, PlaybackHandle, PlaybackSession, PrepareCompletion, PrepareCompletions,
};
