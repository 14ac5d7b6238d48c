//! Signal Conditioner
//!
//! Turns raw integer samples into a normalized signal ready for thresholding:
//! upsampling of slow recordings, DC removal, peak normalization, clipping
//! detection and the optional low-pass filter. This stage never fails; it only
//! classifies the recording and picks the hysteresis thresholds accordingly.

use log::{debug, info};

use crate::audio::SampleBuffer;
use crate::config::DecodeConfig;
use crate::dsp::filter::ButterworthLowPass;

/// Number of buckets in the amplitude histogram used for clipping detection
pub const HISTOGRAM_BUCKETS: usize = 20;

/// Level statistics of the raw recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalStats {
    /// Smallest raw sample
    pub min: i32,
    /// Largest raw sample
    pub max: i32,
    /// Mean of the raw samples (DC offset)
    pub mean: f64,
    /// Largest absolute raw sample
    pub peak: f64,
}

/// Output of the conditioner, consumed by the demodulator
#[derive(Debug, Clone)]
pub struct ConditionedSignal {
    /// Normalized (and possibly filtered) samples
    pub samples: Vec<f64>,
    /// Sample rate after upsampling
    pub sample_rate: u32,
    /// Whether the recording was classified as clipped
    pub clipped: bool,
    /// Whether the low-pass filter was applied
    pub filtered: bool,
    /// Schmitt trigger rising threshold
    pub high_threshold: f64,
    /// Schmitt trigger falling threshold
    pub low_threshold: f64,
    /// Raw level statistics
    pub stats: SignalStats,
}

/// Condition a recording for demodulation
pub fn condition(buffer: SampleBuffer, config: &DecodeConfig) -> ConditionedSignal {
    let buffer = upsample(buffer, config.min_sample_rate);
    let (normalized, stats) = normalize(&buffer.samples);

    debug!(
        "Min: {}, max: {}, average is {:.3}",
        stats.min, stats.max, stats.mean
    );

    let clipped = is_clipped(&normalized);
    if clipped {
        info!("Signal appears to be clipped, treating it as rectangular");
        return ConditionedSignal {
            samples: normalized,
            sample_rate: buffer.sample_rate,
            clipped,
            filtered: false,
            high_threshold: config.clipped_threshold,
            low_threshold: -config.clipped_threshold,
            stats,
        };
    }

    let (samples, filtered) = if config.lowpass {
        let filter = ButterworthLowPass::new(
            config.lowpass_order,
            config.lowpass_cutoff_hz,
            buffer.sample_rate as f64,
        );
        let filtered = filter.filter(&normalized);
        if config.verbose {
            let (lo, hi) = extent(&filtered);
            debug!("Filtered min: {:.4}, and max {:.4}", lo, hi);
        }
        (filtered, true)
    } else {
        (normalized, false)
    };

    ConditionedSignal {
        samples,
        sample_rate: buffer.sample_rate,
        clipped,
        filtered,
        high_threshold: config.hysteresis_threshold,
        low_threshold: -config.hysteresis_threshold,
        stats,
    }
}

/// Double the sample rate by repeating every sample until it reaches `min_rate`
pub fn upsample(buffer: SampleBuffer, min_rate: u32) -> SampleBuffer {
    let SampleBuffer {
        mut sample_rate,
        mut samples,
    } = buffer;

    if sample_rate > 0 && sample_rate < min_rate {
        debug!(
            "Sample frequency {} Hz is less than {} Hz, upsampling...",
            sample_rate, min_rate
        );
    }
    while sample_rate > 0 && sample_rate < min_rate {
        samples = samples.iter().flat_map(|&s| [s, s]).collect();
        sample_rate *= 2;
    }

    SampleBuffer::new(sample_rate, samples)
}

/// Remove the DC offset and scale by the peak magnitude
///
/// The peak is taken from the raw samples, so the result lies in about [-1, 1].
/// Digital silence (peak of zero) normalizes to all zeros.
pub fn normalize(samples: &[i32]) -> (Vec<f64>, SignalStats) {
    let min = samples.iter().copied().min().unwrap_or(0);
    let max = samples.iter().copied().max().unwrap_or(0);
    let peak = (min as f64).abs().max((max as f64).abs());
    let mean = if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64
    };

    let normalized = if peak > 0.0 {
        samples.iter().map(|&s| (s as f64 - mean) / peak).collect()
    } else {
        vec![0.0; samples.len()]
    };

    (
        normalized,
        SignalStats {
            min,
            max,
            mean,
            peak,
        },
    )
}

/// Histogram of sample values over equal-width buckets spanning [min, max]
///
/// The last bucket includes the maximum. A constant signal spans [v - 0.5, v + 0.5].
pub fn amplitude_histogram(data: &[f64]) -> [usize; HISTOGRAM_BUCKETS] {
    let mut histogram = [0usize; HISTOGRAM_BUCKETS];
    if data.is_empty() {
        return histogram;
    }

    let (mut lo, mut hi) = extent(data);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = hi - lo;
    for &value in data {
        let bucket = ((value - lo) / width * HISTOGRAM_BUCKETS as f64) as usize;
        histogram[bucket.min(HISTOGRAM_BUCKETS - 1)] += 1;
    }
    histogram
}

/// A recording is clipped when both outer buckets outnumber their inner neighbours
pub fn is_clipped(data: &[f64]) -> bool {
    let histogram = amplitude_histogram(data);
    let last = HISTOGRAM_BUCKETS - 1;
    histogram[0] > histogram[1] && histogram[last] > histogram[last - 1]
}

fn extent(data: &[f64]) -> (f64, f64) {
    data.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_upsample_doubles_until_rate_reached() {
        let buffer = SampleBuffer::new(11025, vec![1, -2, 3]);
        let upsampled = upsample(buffer, 44000);

        assert_eq!(upsampled.sample_rate, 44100);
        assert_eq!(
            upsampled.samples,
            vec![1, 1, 1, 1, -2, -2, -2, -2, 3, 3, 3, 3]
        );
    }

    #[test]
    fn test_upsample_leaves_fast_recordings_alone() {
        let buffer = SampleBuffer::new(48000, vec![1, 2, 3]);
        assert_eq!(upsample(buffer.clone(), 44000), buffer);
    }

    #[test]
    fn test_normalize_removes_dc_and_scales_by_peak() {
        let (normalized, stats) = normalize(&[110, 90, 110, 90]);

        assert_eq!(stats.min, 90);
        assert_eq!(stats.max, 110);
        assert_relative_eq!(stats.mean, 100.0);
        assert_relative_eq!(stats.peak, 110.0);
        assert_relative_eq!(normalized[0], 10.0 / 110.0);
        assert_relative_eq!(normalized[1], -10.0 / 110.0);
    }

    #[test]
    fn test_normalize_silence() {
        let (normalized, stats) = normalize(&[0, 0, 0]);
        assert_eq!(normalized, vec![0.0, 0.0, 0.0]);
        assert_eq!(stats.peak, 0.0);
    }

    #[test]
    fn test_histogram_includes_maximum_in_last_bucket() {
        let mut data: Vec<f64> = (0..20).map(|i| (i as f64 + 0.5) / 20.0).collect();
        data.push(0.0);
        data.push(1.0);
        let histogram = amplitude_histogram(&data);

        assert_eq!(histogram.iter().sum::<usize>(), 22);
        assert_eq!(histogram[0], 2);
        assert_eq!(histogram[10], 1);
        assert_eq!(histogram[19], 2);
    }

    #[test]
    fn test_square_wave_is_clipped() {
        let data: Vec<f64> = (0..1000)
            .map(|i| if (i / 10) % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        assert!(is_clipped(&data));
    }

    #[test]
    fn test_spikes_over_quieter_tone_is_not_clipped() {
        let mut data: Vec<f64> = (0..4000)
            .map(|i| 0.85 * (i as f64 * 0.05).sin())
            .collect();
        data.push(1.0);
        data.push(-1.0);
        assert!(!is_clipped(&data));
    }

    #[test]
    fn test_clipped_recording_skips_filter() {
        let samples: Vec<i32> = (0..2000)
            .map(|i| if (i / 10) % 2 == 0 { 20000 } else { -20000 })
            .collect();
        let config = DecodeConfig::default();
        let conditioned = condition(SampleBuffer::new(44100, samples), &config);

        assert!(conditioned.clipped);
        assert!(!conditioned.filtered);
        assert_eq!(conditioned.high_threshold, 0.8);
        assert_eq!(conditioned.low_threshold, -0.8);
    }

    #[test]
    fn test_unclipped_recording_is_filtered() {
        let mut samples: Vec<i32> = (0..2000)
            .map(|i| if (i / 10) % 2 == 0 { 17000 } else { -17000 })
            .collect();
        samples[0] = 20000;
        samples[1] = -20000;

        let config = DecodeConfig {
            hysteresis_threshold: 0.1,
            ..Default::default()
        };
        let conditioned = condition(SampleBuffer::new(44100, samples), &config);

        assert!(!conditioned.clipped);
        assert!(conditioned.filtered);
        assert_eq!(conditioned.high_threshold, 0.1);
        assert_eq!(conditioned.low_threshold, -0.1);
    }

    #[test]
    fn test_lowpass_can_be_disabled() {
        let mut samples: Vec<i32> = (0..2000)
            .map(|i| if (i / 10) % 2 == 0 { 17000 } else { -17000 })
            .collect();
        samples[0] = 20000;
        samples[1] = -20000;

        let config = DecodeConfig {
            lowpass: false,
            ..Default::default()
        };
        let conditioned = condition(SampleBuffer::new(44100, samples.clone()), &config);

        assert!(!conditioned.filtered);
        let (normalized, _) = normalize(&samples);
        assert_eq!(conditioned.samples, normalized);
    }
}
