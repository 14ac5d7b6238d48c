//! Raw sample buffer
//!
//! The single-channel integer samples handed from the WAV reader to the
//! signal conditioner.

/// Single-channel signed samples at a known sample rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Signed integer samples, first channel only
    pub samples: Vec<i32>,
}

impl SampleBuffer {
    /// Create a buffer from existing samples
    pub fn new(sample_rate: u32, samples: Vec<i32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
