//! Adaptive quality search.
//!
//! Iterative local search bounding encoded size relative to the source:
//! step the quality down until the output is small enough or the floor is
//! hit. The acceptance target itself decays geometrically each attempt, so
//! the criterion loosens as attempts accumulate and the loop always
//! terminates.

use tracing::debug;

/// Parameters of one quality search.
#[derive(Debug, Clone)]
pub struct QualitySearch {
    /// Quality of the first attempt.
    pub initial_quality: u8,
    /// Hard floor; the search stops once quality falls below it.
    pub floor: u8,
    /// Decrement per attempt.
    pub step: u8,
    /// Starting size-reduction target in percent (e.g. 80 accepts outputs
    /// at or below 20% of the source size).
    pub start_ratio: u32,
    /// Per-attempt decay divisor for the target; must be greater than 1.
    pub ratio_divisor: f64,
}

/// Result of a quality search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Bytes of the last attempt.
    pub data: Vec<u8>,
    /// Quality of the last attempt.
    pub quality: u8,
    /// Whether the last attempt met its size target (false means the floor
    /// stopped the search first).
    pub accepted: bool,
}

impl QualitySearch {
    /// Build a search from the common knobs.
    pub fn new(initial_quality: u8, floor: u8, step: u8, start_ratio: u32, divisor: f64) -> Self {
        Self {
            initial_quality,
            floor,
            step,
            start_ratio,
            ratio_divisor: divisor,
        }
    }

    /// Run the search against an encode callback.
    ///
    /// The callback is invoked with each attempted quality, strictly
    /// decreasing; the first attempt always happens.
    pub fn run<E, F>(&self, source_size: u64, mut encode: F) -> Result<SearchOutcome, E>
    where
        F: FnMut(u8) -> Result<Vec<u8>, E>,
    {
        debug_assert!(self.ratio_divisor > 1.0);
        debug_assert!(self.step > 0);

        let mut quality = self.initial_quality;
        let mut ratio = self.start_ratio;
        let mut data = encode(quality)?;

        while !size_within_ratio(data.len() as u64, source_size, ratio)
            && quality >= self.floor
        {
            quality = quality.saturating_sub(self.step);
            data = encode(quality)?;
            ratio = decay_ratio(ratio, self.ratio_divisor);
            debug!(
                "quality search: quality={} size={} target_ratio={}",
                quality,
                data.len(),
                ratio
            );
        }

        let accepted = size_within_ratio(data.len() as u64, source_size, ratio);
        Ok(SearchOutcome {
            data,
            quality,
            accepted,
        })
    }
}

/// Does `size` reach the reduction target against `source_size`?
///
/// The target accepts outputs at or below `(100 - ratio)%` of the source.
pub fn size_within_ratio(size: u64, source_size: u64, ratio: u32) -> bool {
    let ratio = ratio.min(100) as u64;
    size * 100 <= source_size * (100 - ratio)
}

fn decay_ratio(ratio: u32, divisor: f64) -> u32 {
    (f64::from(ratio) / divisor).ceil() as u32
}
