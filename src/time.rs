//! Clock formatting for the now-playing timeline.

/// Formats a number of seconds as zero-padded `mm:ss`.
///
/// `NaN`, infinite and negative inputs render as `00:00`. Minutes are not wrapped into
/// hours, so anything past 99 minutes simply grows the minutes field.
pub fn seconds_to_minutes_seconds(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return String::from("00:00");
    }

    let minutes = (seconds / 60.0).floor() as u64;
    let remaining = (seconds % 60.0).floor() as u64;
    format!("{minutes:02}:{remaining:02}")
}

/// `elapsed / total` as shown next to the seekbar.
pub fn format_timeline(current: f64, total: f64) -> String {
    format!(
        "{} / {}",
        seconds_to_minutes_seconds(current),
        seconds_to_minutes_seconds(total)
    )
}
