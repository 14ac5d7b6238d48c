//! Butterworth low-pass filter
//!
//! An order-N Butterworth low-pass realised as a cascade of biquad sections
//! (plus one first-order section for odd orders). Each section is the bilinear
//! transform of its analog prototype with the cutoff pre-warped, so the cascade
//! has the same response as a direct-form digital Butterworth design while
//! staying numerically well behaved at high orders.

use std::f64::consts::PI;

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Second-order low-pass section (Audio EQ Cookbook)
    fn low_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let a0 = 1.0 + alpha;
        BiquadCoeffs {
            b0: (1.0 - cos_w0) / 2.0 / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: (1.0 - cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// First-order low-pass section, expressed with b2 = a2 = 0
    fn first_order_low_pass(sample_rate: f64, frequency: f64) -> Self {
        let k = (PI * frequency / sample_rate).tan();
        BiquadCoeffs {
            b0: k / (1.0 + k),
            b1: k / (1.0 + k),
            b2: 0.0,
            a1: (k - 1.0) / (k + 1.0),
            a2: 0.0,
        }
    }

    /// Gain at DC, 1.0 for a low-pass section
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

/// Biquad filter state for one section
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64, // x[n-1]
    x2: f64, // x[n-2]
    y1: f64, // y[n-1]
    y2: f64, // y[n-2]
}

impl BiquadState {
    /// Process a single sample (Direct Form I)
    fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Digital Butterworth low-pass filter of arbitrary order
#[derive(Debug, Clone)]
pub struct ButterworthLowPass {
    sections: Vec<BiquadCoeffs>,
}

impl ButterworthLowPass {
    /// Design a filter of `order` (at least 1) with the given corner frequency
    ///
    /// The corner is kept between 1 Hz and just below Nyquist; a sample rate too
    /// low to hold that range pins it at 1 Hz.
    pub fn new(order: usize, cutoff_hz: f64, sample_rate: f64) -> Self {
        let order = order.max(1);
        let cutoff = cutoff_hz.min(sample_rate / 2.0 - 1.0).max(1.0);

        // Conjugate pole pairs of the analog prototype sit at angles
        // theta_k = (2k + 1) * pi / (2N) from the imaginary axis.
        let mut sections: Vec<BiquadCoeffs> = (0..order / 2)
            .map(|k| {
                let theta = (2 * k + 1) as f64 * PI / (2 * order) as f64;
                let q = 1.0 / (2.0 * theta.sin());
                BiquadCoeffs::low_pass(sample_rate, cutoff, q)
            })
            .collect();

        if order % 2 == 1 {
            sections.push(BiquadCoeffs::first_order_low_pass(sample_rate, cutoff));
        }

        Self { sections }
    }

    /// Number of cascaded sections
    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    /// Filter a whole signal, starting from rest
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let mut states = vec![BiquadState::default(); self.sections.len()];
        input
            .iter()
            .map(|&x| {
                self.sections
                    .iter()
                    .zip(states.iter_mut())
                    .fold(x, |acc, (coeffs, state)| state.process(acc, coeffs))
            })
            .collect()
    }

    /// Gain of the whole cascade at DC
    pub fn dc_gain(&self) -> f64 {
        self.sections.iter().map(BiquadCoeffs::dc_gain).product()
    }
}
