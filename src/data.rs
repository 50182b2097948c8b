//! Labeled raw-sample storage for the training drivers.
//!
//! A training example is one batch of raw analog readings (the same shape that
//! [`Network::encode_input`](crate::Network::encode_input) consumes), filed under the output
//! class it should produce.

use crate::{Error, Result};

/// Read access to labeled raw-sample batches.
///
/// Class `c` holds `num_entries(c)` examples, each a slice of raw readings.
pub trait SampleSource {
    type Sample: Copy + Into<u64>;

    fn num_classes(&self) -> usize;

    fn num_entries(&self, class: usize) -> usize;

    /// The `index`-th example of `class`.
    ///
    /// Panics if `class >= num_classes()` or `index >= num_entries(class)`.
    fn sample(&self, class: usize, index: usize) -> &[Self::Sample];

    /// Full-scale reading of the sensor that produced the samples.
    fn max_input(&self) -> Self::Sample;
}

/// In-memory [`SampleSource`].
///
/// Each class is stored as a contiguous buffer with row-major layout:
/// - `samples[class].len() == num_entries(class) * sample_len`
#[derive(Debug, Clone)]
pub struct SampleStore<R> {
    samples: Vec<Vec<R>>,
    sample_len: usize,
    max_input: R,
}

impl<R: Copy + Into<u64>> SampleStore<R> {
    /// Empty store for `num_classes` classes of `sample_len` readings each.
    pub fn new(num_classes: usize, sample_len: usize, max_input: R) -> Result<Self> {
        if num_classes == 0 {
            return Err(Error::InvalidData("num_classes must be > 0".to_owned()));
        }
        if sample_len == 0 {
            return Err(Error::InvalidData("sample_len must be > 0".to_owned()));
        }

        Ok(Self {
            samples: vec![Vec::new(); num_classes],
            sample_len,
            max_input,
        })
    }

    /// Append one example for `class`.
    pub fn push(&mut self, class: usize, sample: &[R]) -> Result<()> {
        let num_classes = self.samples.len();
        let buf = self.samples.get_mut(class).ok_or(Error::ClassOutOfRange {
            class,
            num_classes,
        })?;
        if sample.len() != self.sample_len {
            return Err(Error::InvalidShape(format!(
                "sample has len {}, expected {}",
                sample.len(),
                self.sample_len
            )));
        }
        buf.extend_from_slice(sample);
        Ok(())
    }

    /// Raw readings per example.
    #[inline]
    pub fn sample_len(&self) -> usize {
        self.sample_len
    }

    /// Total number of stored examples across every class.
    pub fn len(&self) -> usize {
        self.samples
            .iter()
            .map(|buf| buf.len() / self.sample_len)
            .sum()
    }

    /// Returns true if no class holds an example.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.iter().all(Vec::is_empty)
    }
}

impl<R: Copy + Into<u64>> SampleSource for SampleStore<R> {
    type Sample = R;

    #[inline]
    fn num_classes(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    fn num_entries(&self, class: usize) -> usize {
        self.samples[class].len() / self.sample_len
    }

    #[inline]
    fn sample(&self, class: usize, index: usize) -> &[R] {
        let start = index * self.sample_len;
        &self.samples[class][start..start + self.sample_len]
    }

    #[inline]
    fn max_input(&self) -> R {
        self.max_input
    }
}
