use crate::error::{SpeakError, SpeakResult};
use chrono::{DateTime, Local};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Distinguishes `.part` files of concurrent writers in this process.
static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes synthesized audio into the output directory.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory if missing and check that it can be written.
    pub fn ensure_dir(&self) -> SpeakResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            SpeakError::Storage(format!("cannot create {}: {}", self.dir.display(), e))
        })?;

        let meta = fs::metadata(&self.dir).map_err(|e| {
            SpeakError::Storage(format!("cannot stat {}: {}", self.dir.display(), e))
        })?;
        if !meta.is_dir() {
            return Err(SpeakError::Storage(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(SpeakError::Storage(format!(
                "{} is not writable",
                self.dir.display()
            )));
        }
        Ok(())
    }

    /// Save `bytes` as `output_speak_text_<timestamp>.wav` and return its path.
    pub fn save(&self, bytes: &[u8]) -> SpeakResult<PathBuf> {
        self.save_at(bytes, Local::now())
    }

    pub fn save_at(&self, bytes: &[u8], now: DateTime<Local>) -> SpeakResult<PathBuf> {
        self.ensure_dir()?;

        let filename = file_name_for(now);
        let final_path = self.dir.join(&filename);
        let part_path = self.dir.join(format!(
            ".{}.{}-{}.part",
            filename,
            std::process::id(),
            PART_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = write_then_rename(bytes, &part_path, &final_path) {
            let _ = fs::remove_file(&part_path);
            warn!("Failed to save audio to {}: {}", final_path.display(), e);
            return Err(SpeakError::Storage(format!(
                "cannot write {}: {}",
                final_path.display(),
                e
            )));
        }

        info!("Saved audio to {}", final_path.display());
        Ok(final_path)
    }
}

fn write_then_rename(bytes: &[u8], part: &Path, dest: &Path) -> std::io::Result<()> {
    let mut file = fs::File::create(part)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    debug!("Renaming {} -> {}", part.display(), dest.display());
    fs::rename(part, dest)
}

pub fn file_name_for(now: DateTime<Local>) -> String {
    format!("output_speak_text_{}.wav", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_file_name_format() {
        let now = Local.with_ymd_and_hms(2025, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(file_name_for(now), "output_speak_text_20250309_070501.wav");
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("assets");
        let store = AudioStore::new(&out);

        let path = store.save(b"RIFF-bytes").unwrap();

        assert!(path.starts_with(&out));
        assert_eq!(fs::read(&path).unwrap(), b"RIFF-bytes");
        // Only the final file remains
        assert_eq!(fs::read_dir(&out).unwrap().count(), 1);
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = AudioStore::new(dir.path().join("a"));
        store.ensure_dir().unwrap();
        store.ensure_dir().unwrap();
    }

    #[test]
    fn test_same_second_overwrites() {
        let dir = tempdir().unwrap();
        let store = AudioStore::new(dir.path());
        let now = Local::now();

        let first = store.save_at(b"one", now).unwrap();
        let second = store.save_at(b"two", now).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(&second).unwrap(), b"two");
    }

    #[test]
    fn test_output_path_is_a_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let store = AudioStore::new(&blocker);
        assert!(matches!(store.save(b"data"), Err(SpeakError::Storage(_))));
    }
}
