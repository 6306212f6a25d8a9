use chrono::{DateTime, Datelike, FixedOffset, Utc};

/// All rendered timestamps use a fixed US Eastern offset and are labeled
/// "EST" year-round. Date directories are derived from the same offset so a
/// late-evening run lands in the day a reader in that zone would expect.
pub fn to_est(time: DateTime<Utc>) -> DateTime<FixedOffset> {
    let offset = FixedOffset::west_opt(5 * 3600).expect("EST offset in range");
    time.with_timezone(&offset)
}

/// Zero-padded (year, month, day) parts for the date directory.
pub fn date_parts(time: DateTime<Utc>) -> (String, String, String) {
    let local = to_est(time);
    (
        format!("{:04}", local.year()),
        format!("{:02}", local.month()),
        format!("{:02}", local.day()),
    )
}

/// Date label, e.g. "2026-01-03".
pub fn date_string(time: DateTime<Utc>) -> String {
    to_est(time).format("%Y-%m-%d").to_string()
}

/// Batch timestamp, e.g. "09:30 EST".
pub fn batch_timestamp(time: DateTime<Utc>) -> String {
    format!("{} EST", to_est(time).format("%H:%M"))
}

/// Daily record timestamp, e.g. "Jan 03, 2026 09:30 EST".
pub fn meta_timestamp(time: DateTime<Utc>) -> String {
    format!("{} EST", to_est(time).format("%b %d, %Y %H:%M"))
}

/// Per-page report timestamp, e.g. "2026-01-03 09:30:00 EST".
pub fn page_timestamp(time: DateTime<Utc>) -> String {
    format!("{} EST", to_est(time).format("%Y-%m-%d %H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn converts_to_fixed_eastern_offset() {
        let time = at(2026, 1, 3, 14, 30);
        assert_eq!(batch_timestamp(time), "09:30 EST");
        assert_eq!(page_timestamp(time), "2026-01-03 09:30:00 EST");
        assert_eq!(meta_timestamp(time), "Jan 03, 2026 09:30 EST");
    }

    #[test]
    fn date_parts_are_zero_padded() {
        let (year, month, day) = date_parts(at(2026, 1, 3, 14, 30));
        assert_eq!(year, "2026");
        assert_eq!(month, "01");
        assert_eq!(day, "03");
    }

    #[test]
    fn late_utc_run_lands_on_previous_eastern_day() {
        let time = at(2026, 1, 4, 2, 0);
        assert_eq!(date_string(time), "2026-01-03");
        let (_, _, day) = date_parts(time);
        assert_eq!(day, "03");
    }
}
