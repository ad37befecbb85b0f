//! Output file naming.
//!
//! Every session stamps its files with the local start time, so the video
//! and signal files of one combined session sort together:
//!
//! ```text
//! data/video/CAM1_2024-05-01_14-03-27.avi
//! data/signal/CH1_2024-05-01_14-03-27.csv
//! ```

use crate::error::{AppResult, DaqError};
use crate::serial::channel::Channel;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

/// `strftime` pattern of the session stamp.
pub const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Stamp for a session starting now.
pub fn session_stamp() -> String {
    format_stamp(&chrono::Local::now())
}

/// Stamp for a session starting at `time`.
pub fn format_stamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    time.format(STAMP_FORMAT).to_string()
}

/// `<dir>/CAM<n>_<stamp>.<container>`; `camera` is the 1-based slot.
pub fn video_path(dir: &Path, camera: usize, stamp: &str, container: &str) -> PathBuf {
    dir.join(format!("CAM{camera}_{stamp}.{container}"))
}

/// `<dir>/CH<n>_<stamp>.csv`.
pub fn signal_path(dir: &Path, channel: Channel, stamp: &str) -> PathBuf {
    dir.join(format!("{channel}_{stamp}.csv"))
}

/// Create `dir` and its parents.
pub fn ensure_dir(dir: &Path) -> AppResult<()> {
    fs::create_dir_all(dir).map_err(|e| {
        DaqError::Storage(format!(
            "Failed to create output directory '{}': {}",
            dir.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn names_follow_convention() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 14, 3, 27).unwrap();
        let stamp = format_stamp(&time);
        assert_eq!(stamp, "2024-05-01_14-03-27");

        assert_eq!(
            video_path(Path::new("data/video"), 2, &stamp, "avi"),
            PathBuf::from("data/video/CAM2_2024-05-01_14-03-27.avi")
        );
        assert_eq!(
            signal_path(Path::new("data/signal"), Channel::One, &stamp),
            PathBuf::from("data/signal/CH1_2024-05-01_14-03-27.csv")
        );
    }

    #[test]
    fn ensure_dir_creates_parents() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn ensure_dir_fails_on_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            ensure_dir(&file.path().join("sub")),
            Err(DaqError::Storage(_))
        ));
    }
}
