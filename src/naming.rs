use chrono::Local;
use std::path::{Path, PathBuf};

/// Next available output path for today's date: `<MM-DD-YYYY>_<N>.<ext>`
/// with the smallest unused positive index.
pub fn next_save_path(dir: &Path, extension: &str) -> PathBuf {
    let date = Local::now().format("%m-%d-%Y").to_string();
    next_save_path_for_date(dir, &date, extension)
}

/// Probe `<date>_<N>.<ext>` for N = 1, 2, ... and return the first name that
/// does not exist yet. The search is unbounded; it terminates because the
/// directory holds finitely many files with the date prefix.
pub fn next_save_path_for_date(dir: &Path, date: &str, extension: &str) -> PathBuf {
    let mut index: u32 = 1;
    loop {
        let candidate = dir.join(format!("{}_{}.{}", date, index, extension));
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_empty_directory_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = next_save_path_for_date(dir.path(), "05-01-2024", "avi");
        assert_eq!(path, dir.path().join("05-01-2024_1.avi"));
    }

    #[test]
    fn test_skips_existing_indices() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("05-01-2024_1.avi")).unwrap();
        File::create(dir.path().join("05-01-2024_2.avi")).unwrap();

        let path = next_save_path_for_date(dir.path(), "05-01-2024", "avi");
        assert_eq!(path, dir.path().join("05-01-2024_3.avi"));
    }

    #[test]
    fn test_returns_smallest_unused_index() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("05-01-2024_1.avi")).unwrap();
        // Index 2 free, index 3 taken
        File::create(dir.path().join("05-01-2024_3.avi")).unwrap();

        let path = next_save_path_for_date(dir.path(), "05-01-2024", "avi");
        assert_eq!(path, dir.path().join("05-01-2024_2.avi"));
    }

    #[test]
    fn test_extensions_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("05-01-2024_1.avi")).unwrap();

        let path = next_save_path_for_date(dir.path(), "05-01-2024", "txt");
        assert_eq!(path, dir.path().join("05-01-2024_1.txt"));
    }

    #[test]
    fn test_other_dates_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("04-30-2024_1.avi")).unwrap();

        let path = next_save_path_for_date(dir.path(), "05-01-2024", "avi");
        assert_eq!(path, dir.path().join("05-01-2024_1.avi"));
    }

    #[test]
    fn test_today_helper_uses_current_date() {
        let dir = tempfile::tempdir().unwrap();
        let date = Local::now().format("%m-%d-%Y").to_string();
        let path = next_save_path(dir.path(), "avi");
        assert_eq!(path, dir.path().join(format!("{}_1.avi", date)));
    }
}
