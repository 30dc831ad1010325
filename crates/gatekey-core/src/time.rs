//! Wall-clock access shared by the token engines.

/// Current UNIX time in whole seconds.
///
/// Clamped to zero for pre-epoch clocks, which cannot occur on a sanely
/// configured host.
pub(crate) fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
