//! Time parsing and formatting utilities

/// Parse `HH:MM:SS.frac` or `MM:SS.frac` into seconds
///
/// Returns `None` for negative, malformed or `N/A` values.
pub fn parse_hms(time_str: &str) -> Option<f64> {
    let time_str = time_str.trim();
    if time_str.is_empty() || time_str.starts_with('-') {
        return None;
    }

    let parts: Vec<&str> = time_str.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        _ => return None,
    };
    let seconds: f64 = seconds.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Format seconds as `HH:MM:SS` for logs and summaries
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Format seconds as `HH:MM:SS.mmm` where sub-second precision matters
pub fn format_hms_millis(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let millis = ((seconds - seconds.trunc()) * 1000.0).round() as u64;
    let (whole, millis) = if millis >= 1000 {
        (seconds.trunc() + 1.0, 0)
    } else {
        (seconds.trunc(), millis)
    };
    format!("{}.{:03}", format_hms(whole), millis)
}

/// Format file size for display
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut unit_index = 0;

    while value >= 1024.0 && unit_index < UNITS.len() - 1 {
        value /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size, UNITS[unit_index])
    } else {
        format!("{:.2} {}", value, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hms_formats() {
        assert_eq!(parse_hms("00:02:20.50"), Some(140.5));
        assert_eq!(parse_hms("01:00:00"), Some(3600.0));
        assert_eq!(parse_hms("02:30"), Some(150.0));
        assert_eq!(parse_hms(" 00:00:03.336667 "), Some(3.336667));
    }

    #[test]
    fn test_parse_hms_rejects_garbage() {
        assert_eq!(parse_hms("N/A"), None);
        assert_eq!(parse_hms(""), None);
        assert_eq!(parse_hms("-00:00:00.02"), None);
        assert_eq!(parse_hms("1:2:3:4"), None);
        assert_eq!(parse_hms("aa:bb:cc"), None);
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0.0), "00:00:00");
        assert_eq!(format_hms(3725.9), "01:02:05");
        assert_eq!(format_hms(-5.0), "00:00:00");
    }

    #[test]
    fn test_format_hms_millis() {
        assert_eq!(format_hms_millis(140.25), "00:02:20.250");
        assert_eq!(format_hms_millis(59.9996), "00:01:00.000");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.50 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
    }
}
