//! Histogram input encoding.
//!
//! A batch of raw analog samples becomes one activation per input neuron:
//!
//! 1. `[0, max_input]` is split into `num_inputs` increasing bins. Bin `i` ends at
//!    `floor((max_input + 1) * (i + 1) / num_inputs)`, and the last bin is closed at
//!    `max_input`.
//! 2. Each sample is counted in the first bin whose threshold is `>=` the sample. Samples above
//!    `max_input` fall outside every bin and are only tallied.
//! 3. Every count is divided by the count of the densest bin (lowest index on ties), so the
//!    densest bin always encodes as exactly `1.0`.
//!
//! If every bin is empty there is nothing to normalize against. In that case every input
//! activation is zeroed and [`Error::EmptyHistogram`] is returned.

use tracing::{debug, warn};

use crate::numeric::{NumericProfile, Scalar};
use crate::{Error, Network, Result};

/// Per-bin state from the most recent encoded batch.
///
/// Buffers are allocated once with the network and overwritten by every batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBinning {
    thresholds: Vec<u64>,
    totals: Vec<usize>,
    samples: usize,
    out_of_range: usize,
}

impl InputBinning {
    pub(crate) fn from_buffers(thresholds: Vec<u64>, totals: Vec<usize>) -> Self {
        debug_assert_eq!(thresholds.len(), totals.len());
        Self {
            thresholds,
            totals,
            samples: 0,
            out_of_range: 0,
        }
    }

    /// Inclusive upper bound of each bin.
    #[inline]
    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }

    /// Samples counted in each bin.
    #[inline]
    pub fn totals(&self) -> &[usize] {
        &self.totals
    }

    /// Samples in the batch, counted or not.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.samples
    }

    /// Samples greater than `max_input`.
    #[inline]
    pub fn out_of_range(&self) -> usize {
        self.out_of_range
    }

    /// Index of the densest bin; the lowest index wins ties.
    pub fn largest_group(&self) -> usize {
        let mut largest = 0;
        for (i, &total) in self.totals.iter().enumerate().skip(1) {
            if total > self.totals[largest] {
                largest = i;
            }
        }
        largest
    }

    fn recompute<R: Copy + Into<u64>>(&mut self, samples: &[R], max_input: u64) {
        let bins = self.thresholds.len() as u128;
        let span = u128::from(max_input) + 1;
        for (i, threshold) in self.thresholds.iter_mut().enumerate() {
            // span * (i + 1) / bins <= span, and span - 1 fits u64
            *threshold = (span * (i as u128 + 1) / bins).min(u128::from(max_input)) as u64;
        }
        self.totals.fill(0);
        self.samples = samples.len();
        self.out_of_range = 0;

        for &sample in samples {
            let value: u64 = sample.into();
            // Thresholds increase, so the first bin with `threshold >= value` is found by
            // bisection.
            let bin = self.thresholds.partition_point(|&t| t < value);
            match self.totals.get_mut(bin) {
                Some(total) => *total += 1,
                None => self.out_of_range += 1,
            }
        }
    }
}

impl<P: NumericProfile> Network<P> {
    /// Encode a raw sample batch into the input layer.
    ///
    /// `max_input` is the largest value the sensor can report. Bins only come out strictly
    /// increasing when `max_input >= num_inputs`; narrower ranges are rejected.
    pub fn encode_input<R: Copy + Into<u64>>(&mut self, raw: &[R], max_input: R) -> Result<()> {
        let max_input: u64 = max_input.into();
        let num_inputs = self.num_inputs();
        if max_input < num_inputs as u64 {
            return Err(Error::InvalidConfig(format!(
                "max_input {max_input} cannot be split into {num_inputs} input bins"
            )));
        }

        let (binning, activations) = self.encoder_parts();
        binning.recompute(raw, max_input);

        let largest = binning.largest_group();
        let densest = binning.totals[largest];
        if densest == 0 {
            activations.fill(P::Activation::ZERO);
            warn!(
                samples = binning.samples,
                out_of_range = binning.out_of_range,
                "no raw samples landed in any input bin"
            );
            return Err(Error::EmptyHistogram {
                samples: binning.samples,
                out_of_range: binning.out_of_range,
            });
        }

        for (activation, &total) in activations.iter_mut().zip(&binning.totals) {
            *activation = P::Activation::from_real(total as f64 / densest as f64);
        }

        debug!(
            samples = binning.samples,
            out_of_range = binning.out_of_range,
            largest_group = largest,
            "encoded raw input batch"
        );
        Ok(())
    }
}
