//! Validated handle for a user-supplied video file.

use std::path::{Path, PathBuf};

use vidframe_common::error::{VidframeError, VidframeResult};

const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("ogv", "video/ogg"),
];

/// A video file accepted for framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: PathBuf,
    /// Declared media type, always `video/*`.
    pub mime: String,
    pub size_bytes: u64,
}

impl UploadedFile {
    /// Accept a file whose extension declares a video media type.
    pub fn from_path(path: impl AsRef<Path>) -> VidframeResult<Self> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|_| VidframeError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        if !meta.is_file() {
            return Err(VidframeError::invalid_input(format!(
                "{} is not a file",
                path.display()
            )));
        }
        if meta.len() == 0 {
            return Err(VidframeError::invalid_input(format!(
                "{} is empty",
                path.display()
            )));
        }

        let mime = mime_for_path(path).ok_or_else(|| {
            VidframeError::invalid_input(format!(
                "{} is not a video file (expected one of: {})",
                path.display(),
                supported_extensions().join(", ")
            ))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            mime: mime.to_string(),
            size_bytes: meta.len(),
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Video media type declared by a file extension.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    VIDEO_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

pub fn supported_extensions() -> Vec<&'static str> {
    VIDEO_TYPES.iter().map(|(e, _)| *e).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vidframe-upload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_accepts_video_extension() {
        let path = temp_file("clip.MP4", b"not really a video");
        let file = UploadedFile::from_path(&path).unwrap();
        assert_eq!(file.mime, "video/mp4");
        assert_eq!(file.file_name(), "clip.MP4");
        assert_eq!(file.size_bytes, 18);
    }

    #[test]
    fn test_rejects_non_video() {
        let path = temp_file("notes.txt", b"hello");
        let err = UploadedFile::from_path(&path).unwrap_err();
        assert!(matches!(err, VidframeError::InvalidInput { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = UploadedFile::from_path("/definitely/not/here.webm").unwrap_err();
        assert!(matches!(err, VidframeError::FileNotFound { .. }));
    }

    #[test]
    fn test_mime_lookup() {
        assert_eq!(mime_for_path(Path::new("a.webm")), Some("video/webm"));
        assert_eq!(mime_for_path(Path::new("a.mov")), Some("video/quicktime"));
        assert_eq!(mime_for_path(Path::new("a")), None);
    }
}
