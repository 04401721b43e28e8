/// Utility functions for time handling and log formatting
use time::macros::format_description;
use time::{OffsetDateTime, Time};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Midnight at the start of the day containing `dt`
pub fn start_of_day(dt: OffsetDateTime) -> OffsetDateTime {
    dt.replace_time(Time::MIDNIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_day_first() {
        assert_eq!(
            format_datetime(&datetime!(2024-03-07 08:05:09 UTC)),
            "07.03.2024 - 08:05:09"
        );
    }

    #[test]
    fn start_of_day_keeps_the_date() {
        assert_eq!(
            start_of_day(datetime!(2024-03-07 23:59:59 UTC)),
            datetime!(2024-03-07 00:00 UTC)
        );
    }
}
