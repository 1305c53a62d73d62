//! Audio output using cpal.
//!
//! The output stream lives on a dedicated thread for its whole life: cpal
//! streams are not `Send` on every host.

use bridge_traits::error::{BridgeError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, info};

use crate::decode::DecodedClip;
use crate::resample::resample_clip;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Reads a clip that is already at the device rate, frame by frame.
///
/// Source channels are mapped onto output channels modulo the source
/// channel count.
pub(crate) struct PcmCursor {
    clip: DecodedClip,
    frame: usize,
}

impl PcmCursor {
    pub(crate) fn new(clip: DecodedClip) -> Self {
        Self { clip, frame: 0 }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.frame >= self.clip.frames()
    }

    /// Sample for output channel `channel` of the current frame.
    pub(crate) fn sample(&self, channel: usize) -> f32 {
        if self.is_finished() {
            return 0.0;
        }
        let source_channels = self.clip.channels as usize;
        self.clip.samples[self.frame * source_channels + channel % source_channels]
    }

    pub(crate) fn advance(&mut self) {
        self.frame += 1;
    }
}

/// Run a blocking wait from code that may be on a Tokio worker.
///
/// On a multi-thread runtime the worker is handed back to the scheduler for
/// the duration; elsewhere (current-thread runtime, plain threads) the wait
/// simply blocks.
pub(crate) fn blocking_wait<T>(wait: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(wait)
        }
        _ => wait(),
    }
}

/// Handle to the thread that owns a playing output stream.
pub(crate) struct OutputThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl OutputThread {
    /// Open the default output device and start playing `clip`.
    ///
    /// Resampling to the device rate and opening the device happen on the
    /// output thread; this returns once the stream is running or failed to
    /// open. See [`blocking_wait`] for how the wait behaves on a runtime.
    pub(crate) fn spawn(clip: DecodedClip) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread_stop = Arc::clone(&stop);
        let thread_finished = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new()
            .name("clipdeck-output".to_string())
            .spawn(move || {
                let stream = match open_stream(clip, Arc::clone(&thread_finished)) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                while !thread_stop.load(Ordering::Acquire)
                    && !thread_finished.load(Ordering::Acquire)
                {
                    thread::sleep(POLL_INTERVAL);
                }

                let _ = stream.pause();
                drop(stream);
                debug!("Output stream closed");
            })
            .map_err(|e| BridgeError::AudioDevice(format!("Failed to spawn output thread: {}", e)))?;

        let mut output = Self {
            stop,
            handle: Some(handle),
        };

        match blocking_wait(|| ready_rx.recv()) {
            Ok(Ok(())) => Ok(output),
            Ok(Err(e)) => {
                output.stop();
                Err(e)
            }
            Err(_) => {
                output.stop();
                Err(BridgeError::AudioDevice(
                    "Output thread exited before opening the device".to_string(),
                ))
            }
        }
    }

    /// Stop the stream and wait for the thread. Idempotent.
    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if blocking_wait(|| handle.join()).is_err() {
                error!("Output thread panicked");
            }
        }
    }
}

impl Drop for OutputThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_stream(clip: DecodedClip, finished: Arc<AtomicBool>) -> Result<Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| BridgeError::AudioDevice("No default output device found".to_string()))?;

    let supported = device
        .default_output_config()
        .map_err(|e| BridgeError::AudioDevice(format!("Failed to get default config: {}", e)))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    info!(
        device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
        sample_rate = config.sample_rate.0,
        channels = config.channels,
        format = ?sample_format,
        "Opening audio output"
    );

    let cursor = PcmCursor::new(resample_clip(clip, config.sample_rate.0)?);
    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, cursor, finished),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, cursor, finished),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, cursor, finished),
        other => Err(BridgeError::AudioDevice(format!(
            "Unsupported sample format: {:?}",
            other
        ))),
    }?;

    stream
        .play()
        .map_err(|e| BridgeError::AudioDevice(format!("Failed to start stream: {}", e)))?;

    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut cursor: PcmCursor,
    finished: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    for (channel, sample) in frame.iter_mut().enumerate() {
                        *sample = T::from_sample(cursor.sample(channel));
                    }
                    cursor.advance();
                }
                if cursor.is_finished() {
                    finished.store(true, Ordering::Release);
                }
            },
            |err| error!(error = %err, "Audio output stream error"),
            None,
        )
        .map_err(|e| BridgeError::AudioDevice(format!("Failed to build output stream: {}", e)))
}
