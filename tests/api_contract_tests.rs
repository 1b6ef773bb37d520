/// Contract tests for API-level conventions
///
/// Note: These are unit tests that verify the logic is correct.
/// Integration tests would require a running server.

#[cfg(test)]
mod tests {
    #[test]
    fn test_authorization_header_parsing() {
        let auth_header = "Bearer abc123token";
        let token = auth_header.strip_prefix("Bearer ");
        assert_eq!(token, Some("abc123token"));

        let invalid_header = "abc123token";
        let token = invalid_header.strip_prefix("Bearer ");
        assert_eq!(token, None);
    }

    #[test]
    fn test_dni_normalization_bounds() {
        // Import strips non-digits before the 7-8 digit check
        let raw = "12.345.678";
        let dni: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        assert_eq!(dni, "12345678");
        assert!(dni.len() >= 7 && dni.len() <= 8);

        let short: String = "12345".chars().filter(|c| c.is_ascii_digit()).collect();
        assert!(short.len() < 7);
    }

    #[test]
    fn test_inclusive_end_date_covers_whole_day() {
        use chrono::{NaiveDate, Timelike};

        let end = NaiveDate::from_ymd_opt(2026, 8, 6)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap();
        assert_eq!(end.hour(), 23);
        assert_eq!(end.minute(), 59);
        assert_eq!(end.second(), 59);
    }

    #[test]
    fn test_document_page_chunking() {
        // 60 rows at 25 per page: 25 + 25 + 10
        let rows: Vec<u32> = (0..60).collect();
        let pages: Vec<&[u32]> = rows.chunks(25).collect();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].len(), 25);
        assert_eq!(pages[2].len(), 10);
    }

    #[test]
    fn test_session_gap_arithmetic() {
        use chrono::Duration;

        let gap = Duration::minutes(30);
        assert!(Duration::minutes(40) > gap); // second login opens a session
        assert!(Duration::minutes(10) <= gap); // second login does not
    }
}
