//! Staleness rule.
//!
//! A cached row is stale when it will expire before the next dump pass that
//! is guaranteed to run. Such a row is evicted by the pass that notices it,
//! so it never disappears from the cache between two passes while the
//! durable store still trusts the watermark.

use std::time::Duration;

/// The latest time (Unix seconds) by which another dump pass must have run.
///
/// A fractional window is rounded up to whole seconds, which leaves the
/// strict comparison in [`is_stale`] unchanged for whole-second expiry
/// times. A negative or NaN scale counts as zero, and the sum saturates.
///
/// Returns `None` when dumping is disabled.
pub fn next_guaranteed_sync(watermark: u64, scale: f64, interval: Duration) -> Option<u64> {
    if interval.is_zero() {
        return None;
    }
    // Float to integer casts saturate, so an infinite window becomes u64::MAX
    let window = (scale.max(0.0) * interval.as_secs_f64()).ceil() as u64;
    Some(watermark.saturating_add(window))
}

/// Checks whether a row expiring at `expires_at` (Unix seconds) is stale.
///
/// The comparison is strict: a row expiring exactly at the guaranteed sync
/// time survives.
///
/// ```rust
/// use std::time::Duration;
/// use tblcache_core::sync::is_stale;
///
/// let interval = Duration::from_secs(10);
/// assert!(is_stale(15, 0, 2.0, interval));
/// assert!(!is_stale(25, 0, 2.0, interval));
/// assert!(!is_stale(15, 0, 2.0, Duration::ZERO));
/// ```
pub fn is_stale(expires_at: u64, watermark: u64, scale: f64, interval: Duration) -> bool {
    next_guaranteed_sync(watermark, scale, interval).is_some_and(|next| expires_at < next)
}
