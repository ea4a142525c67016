//! Delivery of finished exports.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};

use vidframe_capture_engine::MediaBlob;
use vidframe_common::error::{VidframeError, VidframeResult};
use vidframe_frame_model::ExportFormat;

/// Receives the finished file. Called once per successful export and never
/// for a cancelled one.
#[async_trait]
pub trait FileSink: Send + Sync {
    async fn save(&self, blob: &MediaBlob, format: ExportFormat) -> VidframeResult<PathBuf>;
}

/// `vidframe-<timestamp>.<ext>`
pub fn export_file_name(format: ExportFormat, at: DateTime<Local>) -> String {
    format!(
        "vidframe-{}.{}",
        at.format("%Y-%m-%d_%H-%M-%S"),
        format.extension()
    )
}

/// Writes exports into a directory, creating it on demand.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First name in the directory not already taken.
    fn free_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        let (stem, ext) = file_name.rsplit_once('.').unwrap_or((file_name, ""));
        (1..)
            .map(|n| self.dir.join(format!("{stem}-{n}.{ext}")))
            .find(|path| !path.exists())
            .unwrap_or(candidate)
    }
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn save(&self, blob: &MediaBlob, format: ExportFormat) -> VidframeResult<PathBuf> {
        if blob.is_empty() {
            return Err(VidframeError::invalid_input("Refusing to save an empty file"));
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.free_path(&export_file_name(format, Local::now()));
        tokio::fs::write(&path, &blob.bytes).await?;

        tracing::info!(path = %path.display(), bytes = blob.len(), "Export saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_has_timestamp_and_extension() {
        let at = Local.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            export_file_name(ExportFormat::Mp4, at),
            "vidframe-2026-03-09_14-05-07.mp4"
        );
    }

    #[tokio::test]
    async fn test_save_writes_into_new_directory() {
        let root = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(root.path().join("exports"));
        let blob = MediaBlob::new(vec![1, 2, 3], "video/webm");

        let first = sink.save(&blob, ExportFormat::Webm).await.unwrap();
        let second = sink.save(&blob, ExportFormat::Webm).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), vec![1, 2, 3]);
        assert_eq!(first.extension().unwrap(), "webm");
    }

    #[tokio::test]
    async fn test_empty_blob_is_not_saved() {
        let root = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(root.path());
        let blob = MediaBlob::new(Vec::new(), "video/mp4");
        assert!(sink.save(&blob, ExportFormat::Mp4).await.is_err());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
