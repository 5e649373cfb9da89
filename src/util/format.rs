//! Number formatting utilities.

/// Format a percentage without decimals.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.0}%")
}

/// Format a duration in milliseconds as a short human string.
#[must_use]
pub fn format_duration_ms(ms: u64) -> String {
    if ms >= 60_000 {
        format!("{}m {:02}s", ms / 60_000, (ms % 60_000) / 1000)
    } else if ms >= 1000 {
        format!("{}.{}s", ms / 1000, (ms % 1000) / 100)
    } else {
        format!("{ms}ms")
    }
}

/// Render a mastery percentage as a fixed-width bar.
#[must_use]
pub fn mastery_bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width + 50) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_buckets() {
        assert_eq!(format_duration_ms(250), "250ms");
        assert_eq!(format_duration_ms(1_500), "1.5s");
        assert_eq!(format_duration_ms(125_000), "2m 05s");
    }

    #[test]
    fn mastery_bar_widths() {
        assert_eq!(mastery_bar(0, 4), "░░░░");
        assert_eq!(mastery_bar(50, 4), "██░░");
        assert_eq!(mastery_bar(100, 4), "████");
        assert_eq!(mastery_bar(200, 4), "████");
    }
}
