use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod extractor;
pub mod runner;

pub use extractor::{ExtractionError, MediaExtractor};
pub use runner::{ProcessError, ProcessResult, ProcessRunner};

use crate::utils::format_file_size;
use crate::Result;

/// Whether an upload needs audio extraction before transcription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Classify a file extension. Unknown extensions are not guessed at.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" | "m4a" | "aac" | "wav" | "flac" | "ogg" | "oga" | "opus" => {
                Some(MediaKind::Audio)
            }
            "mp4" | "mov" | "mkv" | "avi" | "webm" | "wmv" | "m4v" | "mpg" | "mpeg" | "flv" => {
                Some(MediaKind::Video)
            }
            _ => None,
        }
    }

    /// Classify a filename by its extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// Audio container formats the transcription service accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
    Webm,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Webm => "webm",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "m4a" | "aac" => Some(AudioFormat::M4a),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "ogg" | "oga" | "opus" => Some(AudioFormat::Ogg),
            "webm" => Some(AudioFormat::Webm),
            _ => None,
        }
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::M4a => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Webm => "audio/webm",
        }
    }
}

/// An uploaded media file and its declared metadata.
///
/// Immutable for the lifetime of the pipeline run that received it; nothing
/// here survives the run.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    /// Name the file was uploaded under
    pub filename: String,
    /// Size the upload reported, in bytes (may disagree with the payload)
    pub declared_size: u64,
    /// Video or audio, as classified at upload time
    pub kind: MediaKind,
    /// Raw payload
    pub bytes: Vec<u8>,
}

impl MediaAsset {
    pub fn new(filename: impl Into<String>, kind: MediaKind, bytes: Vec<u8>) -> Self {
        let declared_size = bytes.len() as u64;
        Self {
            filename: filename.into(),
            declared_size,
            kind,
            bytes,
        }
    }

    /// Override the declared size when upload metadata disagrees with the
    /// payload actually received.
    pub fn with_declared_size(mut self, declared_size: u64) -> Self {
        self.declared_size = declared_size;
        self
    }

    /// Load an asset from disk, classifying it by extension. The size on
    /// disk is compared against `max_bytes` before any of the payload is
    /// read, so an over-limit file is never buffered.
    pub async fn from_path(path: &Path, max_bytes: u64) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", path.display()))?;

        let kind = MediaKind::from_filename(&filename).ok_or_else(|| {
            anyhow::anyhow!(
                "Unsupported media extension: {} (expected a common audio or video file)",
                filename
            )
        })?;

        let size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to read media file: {}", path.display()))?
            .len();
        if size > max_bytes {
            anyhow::bail!(
                "{} is {}, over the {} upload limit",
                filename,
                format_file_size(size),
                format_file_size(max_bytes)
            );
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read media file: {}", path.display()))?;

        Ok(Self::new(filename, kind, bytes))
    }

    /// Extension of the declared filename, for staging the payload on disk.
    pub fn extension(&self) -> &str {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin")
    }

    /// Reinterpret an audio upload as a transcription-ready asset, skipping
    /// extraction entirely.
    pub fn into_audio(self) -> AudioAsset {
        AudioAsset {
            filename: self.filename,
            bytes: self.bytes,
        }
    }
}

/// A standalone audio track ready for transcription, produced either by the
/// extractor or directly from an audio upload.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl AudioAsset {
    /// Container format guessed from the filename, defaulting to MP3.
    pub fn format(&self) -> AudioFormat {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(AudioFormat::from_extension)
            .unwrap_or(AudioFormat::Mp3)
    }

    pub fn mime_type(&self) -> &'static str {
        self.format().mime_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_classification() {
        assert_eq!(MediaKind::from_extension("mp4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("MOV"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("mp3"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_extension("OGG"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_extension("pdf"), None);
    }

    #[test]
    fn test_media_kind_from_filename() {
        assert_eq!(
            MediaKind::from_filename("talk.recording.mkv"),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::from_filename("voice.m4a"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_filename("no_extension"), None);
    }

    #[test]
    fn test_audio_format_mime_types() {
        assert_eq!(AudioFormat::Mp3.mime_type(), "audio/mpeg");
        assert_eq!(AudioFormat::Wav.mime_type(), "audio/wav");
        assert_eq!(AudioFormat::from_extension("opus"), Some(AudioFormat::Ogg));
    }

    #[test]
    fn test_declared_size_defaults_to_payload_length() {
        let asset = MediaAsset::new("clip.mp4", MediaKind::Video, vec![0u8; 42]);
        assert_eq!(asset.declared_size, 42);

        let oversized = asset.with_declared_size(1024);
        assert_eq!(oversized.declared_size, 1024);
        assert_eq!(oversized.bytes.len(), 42);
    }

    #[tokio::test]
    async fn test_from_path_enforces_the_upload_limit() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("clip.mp4");
        fs_err::write(&path, vec![0u8; 64]).unwrap();

        let err = MediaAsset::from_path(&path, 16).await.unwrap_err();
        assert!(err.to_string().contains("upload limit"));

        let asset = MediaAsset::from_path(&path, 1024).await.unwrap();
        assert_eq!(asset.kind, MediaKind::Video);
        assert_eq!(asset.declared_size, 64);
    }

    #[test]
    fn test_audio_asset_format_fallback() {
        let audio = AudioAsset {
            filename: "mystery".to_string(),
            bytes: Vec::new(),
        };
        assert_eq!(audio.format(), AudioFormat::Mp3);
        assert_eq!(audio.mime_type(), "audio/mpeg");
    }
}
