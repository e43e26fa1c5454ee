//! Round timestamps

/// Reserved variable name carrying the round timestamp
///
/// Injected only into records delivered to outputs that require a log time.
pub const LOG_TIME_KEY: &str = "Time";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Current time as a lexically sortable string (UTC, millisecond resolution)
pub fn timestamp_now() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_shape_and_order() {
        let first = timestamp_now();
        let second = timestamp_now();

        // 2026-01-09 12:00:00.000
        assert_eq!(first.len(), 23);
        assert!(chrono::NaiveDateTime::parse_from_str(&first, TIMESTAMP_FORMAT).is_ok());
        assert!(first <= second);
    }
}
