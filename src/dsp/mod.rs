//! Signal processing
//!
//! Conditioning of raw tape recordings before demodulation.

pub mod conditioner;
pub mod filter;

pub use conditioner::{
    amplitude_histogram, condition, is_clipped, normalize, upsample, ConditionedSignal,
    SignalStats, HISTOGRAM_BUCKETS,
};
pub use filter::ButterworthLowPass;
