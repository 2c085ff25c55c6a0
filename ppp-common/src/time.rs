//! Seconds/frames conversion and timestamp formatting
//!
//! All engine positions are integer frame counts at the working sample rate.
//! Seconds only appear at the edges: template values going in, log text coming out.

/// Convert seconds to a frame count, rounding to the nearest frame
///
/// Negative input yields a negative frame count; callers that need a length
/// clamp themselves.
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> i64 {
    (seconds * sample_rate as f64).round() as i64
}

/// Convert a frame count to seconds
pub fn frames_to_seconds(frames: i64, sample_rate: u32) -> f64 {
    frames as f64 / sample_rate as f64
}

/// Format a timestamp for log output
///
/// - Under 100 seconds: `SS.SSs` (e.g. "12.50s")
/// - Otherwise: `M:SS.SS` (e.g. "2:05.25")
/// - Negative values keep their sign
pub fn format_timestamp(seconds: f64) -> String {
    let sign = if seconds < 0.0 { "-" } else { "" };
    let abs = seconds.abs();

    if abs < 100.0 {
        format!("{}{:.2}s", sign, abs)
    } else {
        let minutes = (abs / 60.0).floor() as u64;
        let secs = abs - minutes as f64 * 60.0;
        format!("{}{}:{:05.2}", sign, minutes, secs)
    }
}
