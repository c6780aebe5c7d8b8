use chrono::{DateTime, Utc};

/// Truncate a string to a maximum number of characters, adding an ellipsis
/// if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an hour count without a trailing ".0" for whole hours
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{}h", hours as i64)
    } else {
        format!("{:.1}h", hours)
    }
}

/// Format an optional timestamp as a short date
pub fn format_date(date: Option<&DateTime<Utc>>) -> String {
    date.map(|d| d.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Hello", 10), "Hello");
        assert_eq!(truncate("Hello World", 8), "Hello...");
        assert_eq!(truncate("Hi", 2), "Hi");
        assert_eq!(truncate("Ünïcödé text", 6), "Ünï...");
    }

    #[test]
    fn test_format_hours() {
        assert_eq!(format_hours(12.0), "12h");
        assert_eq!(format_hours(1.5), "1.5h");
    }

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).single().expect("valid date");
        assert_eq!(format_date(Some(&date)), "Jan 15, 2024");
        assert_eq!(format_date(None), "-");
    }
}
