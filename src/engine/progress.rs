//! Progress stream parsing for the external transcoder
//!
//! ffmpeg's `-progress` output is an unversioned block of `key=value` lines:
//!
//! ```text
//! frame=100
//! out_time_us=3336667
//! out_time_ms=3336667
//! out_time=00:00:03.336667
//! speed=2.01x
//! progress=continue
//! ```
//!
//! Only the encoded-time keys and the `progress=end` marker are interpreted.
//! Classic stats lines (`... time=00:00:03.33 bitrate=...`) are understood
//! too, so the parser still works if stats end up on the same stream.

use crate::utils::time::parse_hms;

/// Meaning of one line of progress output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressLine {
    /// Seconds of output encoded so far
    EncodedTime(f64),
    /// Tool reported the end of its progress stream
    End,
    /// Anything else, including `N/A` values
    Other,
}

/// Interpret a single line of progress output
pub fn parse_progress_line(line: &str) -> ProgressLine {
    let line = line.trim();

    if let Some(value) = line
        .strip_prefix("out_time_us=")
        .or_else(|| line.strip_prefix("out_time_ms="))
    {
        // out_time_ms is in microseconds as well
        return match value.trim().parse::<i64>() {
            Ok(us) if us >= 0 => ProgressLine::EncodedTime(us as f64 / 1_000_000.0),
            _ => ProgressLine::Other,
        };
    }

    if let Some(value) = line.strip_prefix("out_time=") {
        return parse_hms(value)
            .map(ProgressLine::EncodedTime)
            .unwrap_or(ProgressLine::Other);
    }

    if let Some(value) = line.strip_prefix("progress=") {
        return if value.trim() == "end" {
            ProgressLine::End
        } else {
            ProgressLine::Other
        };
    }

    if let Some(pos) = line.find("time=") {
        let preceded_by_space = pos == 0 || line[..pos].ends_with(char::is_whitespace);
        if preceded_by_space {
            let rest = &line[pos + "time=".len()..];
            let value = rest.split_whitespace().next().unwrap_or("");
            if let Some(seconds) = parse_hms(value) {
                return ProgressLine::EncodedTime(seconds);
            }
        }
    }

    ProgressLine::Other
}

/// Folds progress lines into a non-decreasing fraction of one range
#[derive(Debug, Clone)]
pub struct RangeProgress {
    range_length_seconds: f64,
    encoded_seconds: f64,
    fraction: f64,
    ended: bool,
}

impl RangeProgress {
    pub fn new(range_length_seconds: f64) -> Self {
        Self {
            range_length_seconds,
            encoded_seconds: 0.0,
            fraction: 0.0,
            ended: false,
        }
    }

    /// Feed one line; returns the new fraction only when it increased
    pub fn observe(&mut self, line: &str) -> Option<f64> {
        match parse_progress_line(line) {
            ProgressLine::EncodedTime(seconds) => self.record(seconds),
            ProgressLine::End => {
                self.ended = true;
                None
            }
            ProgressLine::Other => None,
        }
    }

    fn record(&mut self, seconds: f64) -> Option<f64> {
        if !seconds.is_finite() || seconds <= self.encoded_seconds {
            return None;
        }
        self.encoded_seconds = seconds;

        let fraction = if self.range_length_seconds > 0.0 {
            (seconds / self.range_length_seconds).clamp(0.0, 1.0)
        } else {
            1.0
        };
        if fraction > self.fraction {
            self.fraction = fraction;
            Some(fraction)
        } else {
            None
        }
    }

    /// Clamp to completion; returns the final fraction if it changed
    pub fn complete(&mut self) -> Option<f64> {
        if self.fraction < 1.0 {
            self.fraction = 1.0;
            Some(1.0)
        } else {
            None
        }
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn encoded_seconds(&self) -> f64 {
        self.encoded_seconds
    }

    pub fn ended(&self) -> bool {
        self.ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_out_time_keys() {
        assert_eq!(
            parse_progress_line("out_time_us=2500000"),
            ProgressLine::EncodedTime(2.5)
        );
        assert_eq!(
            parse_progress_line("out_time_ms=1000000"),
            ProgressLine::EncodedTime(1.0)
        );
        assert_eq!(
            parse_progress_line("out_time=00:01:02.500000"),
            ProgressLine::EncodedTime(62.5)
        );
    }

    #[test]
    fn test_parse_not_available_values() {
        assert_eq!(parse_progress_line("out_time_us=N/A"), ProgressLine::Other);
        assert_eq!(parse_progress_line("out_time=N/A"), ProgressLine::Other);
        assert_eq!(parse_progress_line("out_time_ms=-9223372036854775807"), ProgressLine::Other);
    }

    #[test]
    fn test_parse_progress_markers() {
        assert_eq!(parse_progress_line("progress=end"), ProgressLine::End);
        assert_eq!(parse_progress_line("progress=continue"), ProgressLine::Other);
        assert_eq!(parse_progress_line("fps=29.97"), ProgressLine::Other);
        assert_eq!(parse_progress_line(""), ProgressLine::Other);
    }

    #[test]
    fn test_parse_classic_stats_line() {
        let line = "frame=  240 fps= 60 q=28.0 size=512kB time=00:00:08.00 bitrate= 524.3kbits/s speed=2x";
        assert_eq!(parse_progress_line(line), ProgressLine::EncodedTime(8.0));
    }

    #[test]
    fn test_range_progress_is_monotonic() {
        let mut progress = RangeProgress::new(10.0);
        let lines = [
            "out_time_us=1000000",
            "out_time_us=4000000",
            "out_time_us=3000000",
            "out_time_us=N/A",
            "out_time_us=9000000",
            "out_time_us=15000000",
        ];
        let observed: Vec<f64> = lines.iter().filter_map(|l| progress.observe(l)).collect();
        assert_eq!(observed, vec![0.1, 0.4, 0.9, 1.0]);
        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.encoded_seconds(), 15.0);
    }

    #[test]
    fn test_range_progress_completion() {
        let mut progress = RangeProgress::new(4.0);
        progress.observe("out_time_us=2000000");
        assert!(!progress.ended());
        progress.observe("progress=end");
        assert!(progress.ended());
        assert_eq!(progress.complete(), Some(1.0));
        assert_eq!(progress.complete(), None);
        assert_eq!(progress.fraction(), 1.0);
    }
}
