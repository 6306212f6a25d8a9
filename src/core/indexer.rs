use std::path::{Path, PathBuf};

use serde::Serialize;

use super::accumulator::DailyRecord;
use crate::error::Result;

/// One row in the master listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterIndexEntry {
    /// Calendar date, e.g. "2026-01-03"
    pub date: String,
    /// Display timestamp of the day's last run
    pub timestamp: String,
    /// Path relative to the report root, e.g. "2026/01/03/"
    pub path: String,
    /// Total changed pages recorded for the date
    pub count: usize,
}

/// Builds the master listing by scanning the persisted daily records.
///
/// Stateless: the listing is derived in full from storage on every rebuild
/// and never mutates the daily records themselves.
pub struct IndexBuilder {
    reports_dir: PathBuf,
}

impl IndexBuilder {
    pub fn new<P: Into<PathBuf>>(reports_dir: P) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    /// Scan `YYYY/MM/DD` directories and produce entries newest-first.
    pub fn rebuild(&self) -> Result<Vec<MasterIndexEntry>> {
        let mut entries = Vec::new();

        for (year, year_dir) in digit_dirs_desc(&self.reports_dir)? {
            for (month, month_dir) in digit_dirs_desc(&year_dir)? {
                for (day, day_dir) in digit_dirs_desc(&month_dir)? {
                    if !day_dir.join("index.html").exists() {
                        continue;
                    }

                    let date = format!("{}-{}-{}", year, month, day);
                    let path = format!("{}/{}/{}/", year, month, day);
                    let (timestamp, count) = read_day_metadata(&day_dir, &date)?;

                    entries.push(MasterIndexEntry {
                        date,
                        timestamp,
                        path,
                        count,
                    });
                }
            }
        }

        Ok(entries)
    }
}

/// Display timestamp and change count for a day, with fallbacks for records
/// written before `meta.json` existed: the timestamp falls back to the date
/// string and the count to the number of rendered page artifacts.
fn read_day_metadata(day_dir: &Path, date: &str) -> Result<(String, usize)> {
    let meta_path = day_dir.join("meta.json");
    if meta_path.exists() {
        let content = std::fs::read_to_string(&meta_path)?;
        let record: DailyRecord = serde_json::from_str(&content)?;
        let timestamp = if record.timestamp.is_empty() {
            date.to_string()
        } else {
            record.timestamp
        };
        return Ok((timestamp, record.count));
    }

    // Pre-metadata reports kept page artifacts directly in the day directory.
    let mut count = 0;
    for entry in std::fs::read_dir(day_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if entry.path().is_file() && name.ends_with(".html") && name != "index.html" {
            count += 1;
        }
    }
    Ok((date.to_string(), count))
}

/// Immediate subdirectories whose names are all digits, sorted descending.
/// Zero-padded names make lexicographic order chronological.
fn digit_dirs_desc(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    if !dir.exists() {
        return Ok(dirs);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() && !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
            dirs.push((name, entry.path()));
        }
    }

    dirs.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_day(root: &Path, year: &str, month: &str, day: &str, meta: Option<&str>) -> PathBuf {
        let dir = root.join(year).join(month).join(day);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html></html>").unwrap();
        if let Some(meta) = meta {
            std::fs::write(dir.join("meta.json"), meta).unwrap();
        }
        dir
    }

    #[test]
    fn entries_are_sorted_newest_first() {
        let root = tempfile::tempdir().unwrap();
        let meta = r#"{"timestamp":"Jan 01, 2026 09:00 EST","count":1,"batches":[]}"#;
        make_day(root.path(), "2026", "01", "01", Some(meta));
        make_day(root.path(), "2026", "01", "05", Some(meta));
        make_day(root.path(), "2025", "12", "31", Some(meta));

        let entries = IndexBuilder::new(root.path()).rebuild().unwrap();
        let dates: Vec<&str> = entries.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["2026-01-05", "2026-01-01", "2025-12-31"]);
    }

    #[test]
    fn metadata_supplies_timestamp_and_count() {
        let root = tempfile::tempdir().unwrap();
        let meta = r#"{"timestamp":"Jan 03, 2026 09:30 EST","count":4,"batches":[]}"#;
        make_day(root.path(), "2026", "01", "03", Some(meta));

        let entries = IndexBuilder::new(root.path()).rebuild().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].timestamp, "Jan 03, 2026 09:30 EST");
        assert_eq!(entries[0].count, 4);
        assert_eq!(entries[0].path, "2026/01/03/");
    }

    #[test]
    fn missing_metadata_falls_back_to_structural_count() {
        let root = tempfile::tempdir().unwrap();
        let dir = make_day(root.path(), "2025", "11", "20", None);
        std::fs::write(dir.join("overview.html"), "<html></html>").unwrap();
        std::fs::write(dir.join("settings.html"), "<html></html>").unwrap();

        let entries = IndexBuilder::new(root.path()).rebuild().unwrap();
        assert_eq!(entries[0].timestamp, "2025-11-20");
        assert_eq!(entries[0].count, 2);
    }

    #[test]
    fn skips_days_without_index_and_non_digit_dirs() {
        let root = tempfile::tempdir().unwrap();
        // No index.html in this day directory.
        std::fs::create_dir_all(root.path().join("2026/01/02")).unwrap();
        // Unrelated directory at the root.
        std::fs::create_dir_all(root.path().join("assets")).unwrap();
        let meta = r#"{"timestamp":"Jan 03, 2026 09:30 EST","count":1,"batches":[]}"#;
        make_day(root.path(), "2026", "01", "03", Some(meta));

        let entries = IndexBuilder::new(root.path()).rebuild().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, "2026-01-03");
    }

    #[test]
    fn empty_reports_dir_produces_empty_listing() {
        let root = tempfile::tempdir().unwrap();
        let entries = IndexBuilder::new(root.path()).rebuild().unwrap();
        assert!(entries.is_empty());
    }
}
