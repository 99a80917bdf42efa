use std::time::Duration;

/// Formats a duration in a compact way, e.g. `45s`, `1.5m` or `2.0h`.
pub fn human_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 60.0 {
        format!("{seconds:.0}s")
    } else if seconds < 3600.0 {
        format!("{:.1}m", seconds / 60.0)
    } else {
        format!("{:.1}h", seconds / 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::common::format::human_duration;
    use std::time::Duration;

    #[test]
    fn test_durations() {
        assert_eq!(human_duration(Duration::ZERO).as_str(), "0s");
        assert_eq!(human_duration(Duration::from_secs(30)).as_str(), "30s");
        assert_eq!(human_duration(Duration::from_millis(59_400)).as_str(), "59s");
        assert_eq!(human_duration(Duration::from_secs(90)).as_str(), "1.5m");
        assert_eq!(human_duration(Duration::from_secs(1800)).as_str(), "30.0m");
        assert_eq!(human_duration(Duration::from_secs(4320)).as_str(), "1.2h");
    }
}
