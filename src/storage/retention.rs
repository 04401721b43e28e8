/// Housekeeping of old daily log files
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use time::Date;

use crate::storage::csv_log::file_date;

/// Daily log files below `target` (directly or in a year directory), oldest first
pub fn daily_log_files(target: &Path) -> io::Result<Vec<(Date, PathBuf)>> {
    let mut files = Vec::new();
    if !target.exists() {
        return Ok(files);
    }

    for entry in fs::read_dir(target)? {
        let path = entry?.path();
        if path.is_dir() {
            for inner in fs::read_dir(&path)? {
                collect(inner?.path(), &mut files);
            }
        } else {
            collect(path, &mut files);
        }
    }

    files.sort();
    Ok(files)
}

fn collect(path: PathBuf, files: &mut Vec<(Date, PathBuf)>) {
    let date = path.file_name().and_then(|n| n.to_str()).and_then(file_date);
    if let Some(date) = date {
        if path.is_file() {
            files.push((date, path));
        }
    }
}

/// Delete the oldest daily logs so that at most `keep` remain
///
/// Returns the removed paths, oldest first.
pub fn delete_oldest_files(target: &Path, keep: usize) -> io::Result<Vec<PathBuf>> {
    let files = daily_log_files(target)?;
    if files.len() <= keep {
        return Ok(Vec::new());
    }

    info!("Too many log files. Deleting oldest.");
    let excess = files.len() - keep;
    let mut removed = Vec::with_capacity(excess);
    for (_, path) in files.into_iter().take(excess) {
        fs::remove_file(&path)?;
        removed.push(path);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::csv_log::file_path;
    use tempfile::tempdir;
    use time::macros::date;

    fn touch(target: &Path, date: Date) -> PathBuf {
        let path = file_path(target, date);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "time\n").unwrap();
        path
    }

    #[test]
    fn keeps_the_most_recent_files() {
        let dir = tempdir().unwrap();
        let dates = [
            date!(2024 - 01 - 03),
            date!(2023 - 12 - 30),
            date!(2024 - 01 - 01),
            date!(2023 - 12 - 31),
            date!(2024 - 01 - 02),
            date!(2023 - 12 - 29),
            date!(2024 - 01 - 04),
        ];
        for d in dates {
            touch(dir.path(), d);
        }
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let removed = delete_oldest_files(dir.path(), 5).unwrap();

        assert_eq!(
            removed,
            vec![
                file_path(dir.path(), date!(2023 - 12 - 29)),
                file_path(dir.path(), date!(2023 - 12 - 30)),
            ]
        );
        let remaining: Vec<Date> = daily_log_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|(d, _)| d)
            .collect();
        assert_eq!(
            remaining,
            vec![
                date!(2023 - 12 - 31),
                date!(2024 - 01 - 01),
                date!(2024 - 01 - 02),
                date!(2024 - 01 - 03),
                date!(2024 - 01 - 04),
            ]
        );
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn nothing_removed_within_limit() {
        let dir = tempdir().unwrap();
        touch(dir.path(), date!(2024 - 01 - 01));
        assert!(delete_oldest_files(dir.path(), 5).unwrap().is_empty());
        assert!(delete_oldest_files(&dir.path().join("missing"), 5).unwrap().is_empty());
    }
}
