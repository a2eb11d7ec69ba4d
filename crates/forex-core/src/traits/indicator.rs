//! Streaming indicator trait.

use crate::types::Reading;

/// Streaming indicator that maintains internal state.
///
/// Indicators are updated incrementally, one accepted bar at a time,
/// and report a provisional reading until their warm-up completes.
pub trait StreamingIndicator: Send + Sync {
    /// The per-bar input (a close price, or a whole bar).
    type Input: ?Sized;

    /// Update the indicator with a new input and return the new reading.
    fn update(&mut self, input: &Self::Input) -> Reading;

    /// Get the current reading without adding new data.
    ///
    /// Returns `None` before the first update.
    fn current(&self) -> Option<Reading>;

    /// Reset the indicator state.
    fn reset(&mut self);

    /// Check if the indicator has enough data to produce stable values.
    fn is_ready(&self) -> bool;

    /// Get the smoothing period.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;
}
