//! Whole-clip decoding with symphonia.

use bridge_traits::error::{BridgeError, Result};
use bytes::Bytes;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Interleaved f32 PCM for a whole clip.
#[derive(Debug, Clone)]
pub struct DecodedClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedClip {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// Collects interleaved PCM as long as every packet shares one layout.
#[derive(Debug, Default)]
struct PcmAccumulator {
    samples: Vec<f32>,
    layout: Option<(u32, u16)>,
}

impl PcmAccumulator {
    /// Append one decoded packet. Returns `false`, leaving the buffer
    /// untouched, when the packet's rate or channel count differs from the
    /// first packet's.
    fn push(&mut self, sample_rate: u32, channels: u16, samples: &[f32]) -> bool {
        match self.layout {
            Some(layout) if layout != (sample_rate, channels) => return false,
            Some(_) => {}
            None => self.layout = Some((sample_rate, channels)),
        }
        self.samples.extend_from_slice(samples);
        true
    }

    fn finish(self) -> Result<DecodedClip> {
        match self.layout {
            Some((sample_rate, channels))
                if !self.samples.is_empty() && sample_rate > 0 && channels > 0 =>
            {
                Ok(DecodedClip {
                    samples: self.samples,
                    sample_rate,
                    channels,
                })
            }
            _ => Err(BridgeError::InvalidSource(
                "Clip contains no audio".to_string(),
            )),
        }
    }
}

/// Decode an encoded clip held in memory.
///
/// `extension` is a container hint taken from the locator (`mp3`, `m4a`, ...).
/// Blocking; run it off the async executor.
pub fn decode_clip(data: Bytes, extension: Option<&str>) -> Result<DecodedClip> {
    let source = Box::new(Cursor::new(data)) as Box<dyn MediaSource>;
    let mss = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let opened = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| BridgeError::InvalidSource(format!("Unrecognized audio format: {}", e)))?;
    let mut format = opened.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| BridgeError::InvalidSource("No decodable audio track".to_string()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| BridgeError::InvalidSource(format!("Unsupported codec: {}", e)))?;

    let mut pcm = PcmAccumulator::default();
    let mut consecutive_errors = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                debug!("Track list changed mid-stream; stopping at current position");
                break;
            }
            Err(e) => {
                return Err(BridgeError::OperationFailed(format!(
                    "Failed to read packet: {}",
                    e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                consecutive_errors = 0;
                let spec = *decoded.spec();
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);

                if !pcm.push(spec.rate, spec.channels.count() as u16, buffer.samples()) {
                    warn!(
                        sample_rate = spec.rate,
                        channels = spec.channels.count(),
                        "Audio layout changed mid-stream; stopping at current position"
                    );
                    break;
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    return Err(BridgeError::OperationFailed(format!(
                        "Decoder failure after {} packets: {}",
                        MAX_CONSECUTIVE_ERRORS, e
                    )));
                }
                warn!(attempt = consecutive_errors, error = %e, "Skipping undecodable packet");
            }
            Err(e) => {
                return Err(BridgeError::OperationFailed(format!(
                    "Decoding failed: {}",
                    e
                )))
            }
        }
    }

    let clip = pcm.finish()?;
    debug!(
        frames = clip.frames(),
        sample_rate = clip.sample_rate,
        channels = clip.channels,
        "Clip decoded"
    );
    Ok(clip)
}
