//! Binary Demodulator
//!
//! Converts the conditioned signal into bits in three scans:
//! 1. a Schmitt trigger turns samples into logic levels,
//! 2. level changes are turned into run lengths,
//! 3. each run length is classified as a short (1) or long (0) half-cycle.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};

use crate::config::DecodeConfig;
use crate::dsp::ConditionedSignal;

/// Discrete level of the squared-up tape signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicLevel {
    Low,
    High,
}

/// Internal state of the trigger; `Undecided` reads as `Low`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerState {
    Undecided,
    Low,
    High,
}

/// Hysteresis comparator with separate rising and falling thresholds
#[derive(Debug, Clone)]
pub struct SchmittTrigger {
    high: f64,
    low: f64,
    state: TriggerState,
}

impl SchmittTrigger {
    /// Create a trigger; `low` must be below `high`
    pub fn new(high: f64, low: f64) -> Self {
        Self {
            high,
            low,
            state: TriggerState::Undecided,
        }
    }

    /// Feed one sample and return the resulting level
    pub fn feed(&mut self, sample: f64) -> LogicLevel {
        self.state = match self.state {
            TriggerState::Undecided if sample > self.high => TriggerState::High,
            TriggerState::Undecided if sample < self.low => TriggerState::Low,
            TriggerState::Low if sample > self.high => TriggerState::High,
            TriggerState::High if sample < self.low => TriggerState::Low,
            unchanged => unchanged,
        };
        self.level()
    }

    /// Current output level
    pub fn level(&self) -> LogicLevel {
        match self.state {
            TriggerState::High => LogicLevel::High,
            TriggerState::Low | TriggerState::Undecided => LogicLevel::Low,
        }
    }

    /// True until the first threshold crossing
    pub fn is_undecided(&self) -> bool {
        self.state == TriggerState::Undecided
    }
}

/// Square up a signal, one level per sample
pub fn schmitt_trigger(samples: &[f64], high: f64, low: f64) -> Vec<LogicLevel> {
    let mut trigger = SchmittTrigger::new(high, low);
    samples.iter().map(|&s| trigger.feed(s)).collect()
}

/// Lengths of the runs that end in a level change
///
/// The run still in progress at the end of the input is not emitted because its
/// true length is unknown.
pub fn run_lengths(levels: &[LogicLevel]) -> Vec<usize> {
    let mut runs = Vec::new();
    let Some(&first) = levels.first() else {
        return runs;
    };

    let mut current = first;
    let mut start = 0;
    for (index, &level) in levels.iter().enumerate() {
        if level != current {
            if index > start {
                runs.push(index - start);
            }
            current = level;
            start = index;
        }
    }
    runs
}

/// A run longer than the configured limit; still classified as a 0 bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlongRun {
    /// Position of the run (and its bit) in the sequence
    pub index: usize,
    /// Length in samples
    pub length: usize,
}

/// Classify run lengths into bits
///
/// Returns the bits and every overlong run encountered.
pub fn classify_runs(runs: &[usize], config: &DecodeConfig) -> (Vec<u8>, Vec<OverlongRun>) {
    let mut overlong = Vec::new();
    let bits = runs
        .iter()
        .enumerate()
        .map(|(index, &length)| {
            if length > config.too_long {
                debug!("Overlong signal of length {} at run {}", length, index);
                overlong.push(OverlongRun { index, length });
            }
            if length < config.middle_length {
                1
            } else {
                0
            }
        })
        .collect();
    (bits, overlong)
}

/// Count of runs per length, ordered by length
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLengthHistogram {
    counts: BTreeMap<usize, usize>,
}

impl RunLengthHistogram {
    /// Build the histogram of a run-length sequence
    pub fn from_runs(runs: &[usize]) -> Self {
        let mut counts = BTreeMap::new();
        for &run in runs {
            *counts.entry(run).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Number of runs of exactly `length` samples
    pub fn count(&self, length: usize) -> usize {
        self.counts.get(&length).copied().unwrap_or(0)
    }

    /// (length, count) pairs in ascending length order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts.iter().map(|(&length, &count)| (length, count))
    }

    /// Total number of runs
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl fmt::Display for RunLengthHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (length, count) in self.iter() {
            writeln!(f, "{} : {}", length, count)?;
        }
        Ok(())
    }
}

/// Everything the demodulator learned about a recording
#[derive(Debug, Clone)]
pub struct Demodulated {
    /// Run lengths in samples
    pub runs: Vec<usize>,
    /// One bit per run
    pub bits: Vec<u8>,
    /// Runs above `too_long`
    pub overlong: Vec<OverlongRun>,
    /// Histogram of `runs`
    pub histogram: RunLengthHistogram,
}

/// Demodulate a conditioned signal into a bit sequence
pub fn demodulate(signal: ConditionedSignal, config: &DecodeConfig) -> Demodulated {
    let levels = schmitt_trigger(&signal.samples, signal.high_threshold, signal.low_threshold);
    drop(signal);

    let runs = run_lengths(&levels);
    let histogram = RunLengthHistogram::from_runs(&runs);
    if config.verbose {
        debug!("{} runs, histogram of run lengths:\n{}", runs.len(), histogram);
    }

    let (bits, overlong) = classify_runs(&runs, config);
    if !overlong.is_empty() {
        warn!(
            "{} run(s) longer than {} samples, classified as 0 bits",
            overlong.len(),
            config.too_long
        );
    }
    debug!(
        "Number of bits and bytes: {}, {:.1}",
        bits.len(),
        bits.len() as f64 / 8.0
    );

    Demodulated {
        runs,
        bits,
        overlong,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use LogicLevel::{High, Low};

    #[test]
    fn test_trigger_starts_undecided_as_low() {
        let mut trigger = SchmittTrigger::new(0.5, -0.5);
        assert!(trigger.is_undecided());
        assert_eq!(trigger.feed(0.2), Low);
        assert!(trigger.is_undecided());
        assert_eq!(trigger.feed(0.6), High);
        assert!(!trigger.is_undecided());
    }

    #[test]
    fn test_trigger_hysteresis() {
        let levels = schmitt_trigger(&[0.0, 0.6, 0.1, -0.4, -0.6, 0.4, 0.6], 0.5, -0.5);
        assert_eq!(levels, vec![Low, High, High, High, Low, Low, High]);
    }

    #[test]
    fn test_trigger_from_undecided_can_fall() {
        let mut trigger = SchmittTrigger::new(0.5, -0.5);
        assert_eq!(trigger.feed(-0.7), Low);
        assert!(!trigger.is_undecided());
    }

    #[test]
    fn test_run_lengths_drop_unterminated_run() {
        let levels = vec![Low, Low, High, High, High, Low, High, High];
        assert_eq!(run_lengths(&levels), vec![2, 3, 1]);
    }

    #[test]
    fn test_run_lengths_sum_to_last_transition() {
        let levels: Vec<LogicLevel> = (0..100)
            .map(|i| if (i / 7) % 2 == 0 { High } else { Low })
            .collect();
        let runs = run_lengths(&levels);
        assert_eq!(runs.iter().sum::<usize>(), 98);
        assert!(runs.iter().all(|&r| r == 7));
    }

    #[test]
    fn test_run_lengths_empty() {
        assert!(run_lengths(&[]).is_empty());
        assert!(run_lengths(&[High, High]).is_empty());
    }

    #[test]
    fn test_classify_runs() {
        let config = DecodeConfig::default();
        let (bits, overlong) = classify_runs(&[10, 20, 21, 40, 150], &config);

        assert_eq!(bits, vec![1, 1, 0, 0, 0]);
        assert_eq!(
            overlong,
            vec![OverlongRun {
                index: 4,
                length: 150
            }]
        );
    }

    #[test]
    fn test_overlong_run_is_not_dropped() {
        let config = DecodeConfig::default();
        let (bits, overlong) = classify_runs(&[101, 5], &config);
        assert_eq!(bits.len(), 2);
        assert_eq!(overlong.len(), 1);
    }

    #[test]
    fn test_histogram() {
        let histogram = RunLengthHistogram::from_runs(&[10, 40, 10, 11]);
        assert_eq!(histogram.count(10), 2);
        assert_eq!(histogram.count(12), 0);
        assert_eq!(histogram.total(), 4);
        assert_eq!(histogram.to_string(), "10 : 2\n11 : 1\n40 : 1\n");
    }
}
