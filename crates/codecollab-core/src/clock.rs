//! Wall-clock capture for the float-seconds wire format.

use chrono::Utc;

/// Current wall-clock time as float seconds since the Unix epoch.
///
/// The wire format carries timestamps as `f64` seconds, so every
/// creation-time default funnels through this helper.
pub fn now_ts() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
