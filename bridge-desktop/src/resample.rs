//! Whole-clip sample-rate conversion with rubato.

use bridge_traits::error::{BridgeError, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use crate::decode::DecodedClip;

/// Convert `clip` to `output_rate`. Clips already at that rate pass through.
///
/// The whole clip is processed as a single rubato chunk, so this is blocking
/// and proportional to clip length; call it off the async executor.
pub(crate) fn resample_clip(clip: DecodedClip, output_rate: u32) -> Result<DecodedClip> {
    if clip.sample_rate == output_rate || clip.frames() == 0 {
        return Ok(clip);
    }
    if output_rate == 0 {
        return Err(BridgeError::AudioDevice(
            "Output device reports a zero sample rate".to_string(),
        ));
    }

    let channels = clip.channels as usize;
    let planar = deinterleave(&clip.samples, channels);
    let frames = planar[0].len();

    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / clip.sample_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        frames,
        channels,
    )
    .map_err(|e| BridgeError::OperationFailed(format!("Failed to create resampler: {}", e)))?;

    let resampled = resampler
        .process(&planar, None)
        .map_err(|e| BridgeError::OperationFailed(format!("Resampling failed: {}", e)))?;

    let out = DecodedClip {
        samples: interleave(&resampled),
        sample_rate: output_rate,
        channels: clip.channels,
    };
    debug!(
        from = clip.sample_rate,
        to = output_rate,
        frames_in = frames,
        frames_out = out.frames(),
        "Clip resampled"
    );
    Ok(out)
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (plane, sample) in planar.iter_mut().zip(frame) {
            plane.push(*sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.iter().map(Vec::len).min().unwrap_or(0);
    let mut samples = Vec::with_capacity(frames * planar.len());
    for frame in 0..frames {
        for plane in planar {
            samples.push(plane[frame]);
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(samples: Vec<f32>, sample_rate: u32, channels: u16) -> DecodedClip {
        DecodedClip {
            samples,
            sample_rate,
            channels,
        }
    }

    #[test]
    fn native_rate_passes_through() {
        let input = clip(vec![0.1, 0.2, 0.3], 48_000, 1);
        let out = resample_clip(input, 48_000).unwrap();
        assert_eq!(out.samples, vec![0.1, 0.2, 0.3]);
        assert_eq!(out.sample_rate, 48_000);
    }

    #[test]
    fn upsampling_scales_frame_count() {
        let samples: Vec<f32> = (0..22_050)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 22_050.0).sin() * 0.5)
            .collect();
        let out = resample_clip(clip(samples, 22_050, 1), 44_100).unwrap();

        assert_eq!(out.sample_rate, 44_100);
        assert_eq!(out.channels, 1);
        let frames = out.frames() as f64;
        assert!((frames - 44_100.0).abs() / 44_100.0 < 0.02, "frames: {frames}");
    }

    #[test]
    fn stereo_planes_stay_apart() {
        let samples: Vec<f32> = (0..4_000).flat_map(|_| [0.5, -0.5]).collect();
        let out = resample_clip(clip(samples, 32_000, 2), 48_000).unwrap();

        assert_eq!(out.channels, 2);
        let middle = out.frames() / 2;
        assert!((out.samples[middle * 2] - 0.5).abs() < 1e-3);
        assert!((out.samples[middle * 2 + 1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn deinterleave_round_trips_layout() {
        let planar = deinterleave(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2);
        assert_eq!(planar, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
        assert_eq!(interleave(&planar), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
