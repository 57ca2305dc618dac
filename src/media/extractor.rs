use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use uuid::Uuid;

use super::runner::{ProcessError, ProcessRunner};
use super::{AudioAsset, MediaAsset};
use crate::config::Config;
use crate::utils::resolve_binary;

/// How much of the encoder's stderr tail is kept on failure.
const STDERR_EXCERPT_CHARS: usize = 600;

#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    #[error("encoder binary '{binary}' was not found on PATH")]
    BinaryMissing { binary: String },

    #[error("upload declares {declared_size} bytes, over the {limit} byte ceiling")]
    SizeExceeded { declared_size: u64, limit: u64 },

    #[error("extraction did not finish within the {}s limit", .timeout.as_secs())]
    Timeout { timeout: Duration },

    #[error("encoder failed{}: {detail}", exit_suffix(.exit_code))]
    ProcessFailed {
        exit_code: Option<i32>,
        detail: String,
    },
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {code}"),
        None => String::new(),
    }
}

/// Governs the external audio encoder: upload-size policy, temporary staging,
/// deterministic command construction, and outcome classification.
///
/// Staged input/output files live in a directory scoped to the single
/// `extract` call and are removed whatever the outcome; a failed removal is
/// logged and never replaces the real result.
pub struct MediaExtractor {
    binary: String,
    codec: String,
    bitrate: String,
    sample_rate: u32,
    max_input_bytes: u64,
    timeout: Duration,
    temp_root: Option<PathBuf>,
}

impl MediaExtractor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config.extraction.binary.clone(),
            codec: config.extraction.codec.clone(),
            bitrate: config.extraction.bitrate.clone(),
            sample_rate: config.extraction.sample_rate,
            max_input_bytes: config.max_input_bytes(),
            timeout: config.extraction_timeout(),
            temp_root: config.app.temp_dir.clone(),
        }
    }

    /// Extract the audio track of a video upload as compressed audio.
    ///
    /// Two gates run before anything touches the disk: the encoder binary
    /// must resolve on PATH and the declared upload size must be under the
    /// configured ceiling. Neither gate spawns a subprocess.
    pub async fn extract(&self, asset: &MediaAsset) -> Result<AudioAsset, ExtractionError> {
        if resolve_binary(&self.binary).is_none() {
            return Err(ExtractionError::BinaryMissing {
                binary: self.binary.clone(),
            });
        }

        if asset.declared_size > self.max_input_bytes {
            return Err(ExtractionError::SizeExceeded {
                declared_size: asset.declared_size,
                limit: self.max_input_bytes,
            });
        }

        let staging = self.create_staging_dir()?;
        let tag = Uuid::new_v4().to_string()[..8].to_string();
        let input_path = staging.path().join(format!("input_{}.{}", tag, asset.extension()));
        let output_path = staging
            .path()
            .join(format!("audio_{}.{}", tag, self.output_extension()));

        let outcome = match fs_err::write(&input_path, &asset.bytes) {
            Ok(()) => self.run_encoder(asset, &input_path, &output_path).await,
            Err(err) => Err(ExtractionError::ProcessFailed {
                exit_code: None,
                detail: format!("failed to stage input: {err}"),
            }),
        };

        // Cleanup is unconditional and must never mask the real outcome.
        if let Err(err) = staging.close() {
            tracing::warn!("Failed to remove staging directory: {}", err);
        }

        outcome
    }

    async fn run_encoder(
        &self,
        asset: &MediaAsset,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<AudioAsset, ExtractionError> {
        let args = vec![
            "-i".to_string(),
            input_path.to_string_lossy().into_owned(),
            "-vn".to_string(),
            "-acodec".to_string(),
            self.codec.clone(),
            "-ab".to_string(),
            self.bitrate.clone(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-y".to_string(),
            output_path.to_string_lossy().into_owned(),
        ];

        tracing::debug!("Running {} {}", self.binary, args.join(" "));

        let run = match ProcessRunner::run(&self.binary, &args, self.timeout).await {
            Ok(run) => run,
            Err(ProcessError::TimeoutExceeded { timeout }) => {
                return Err(ExtractionError::Timeout { timeout });
            }
            Err(err) => {
                return Err(ExtractionError::ProcessFailed {
                    exit_code: None,
                    detail: err.to_string(),
                });
            }
        };

        // Exit 0 with the output file present is the only success signal.
        if !run.success() || !output_path.is_file() {
            return Err(ExtractionError::ProcessFailed {
                exit_code: run.exit_code,
                detail: stderr_excerpt(&run.stderr),
            });
        }

        let bytes = fs_err::read(output_path).map_err(|err| ExtractionError::ProcessFailed {
            exit_code: run.exit_code,
            detail: format!("encoder produced an unreadable output file: {err}"),
        })?;

        tracing::info!(
            "Extracted {} bytes of {} audio from '{}'",
            bytes.len(),
            self.codec,
            asset.filename
        );

        Ok(AudioAsset {
            filename: self.audio_filename(asset),
            bytes,
        })
    }

    fn create_staging_dir(&self) -> Result<TempDir, ExtractionError> {
        let builder_result = match &self.temp_root {
            Some(root) => tempfile::Builder::new().prefix("postscribe_").tempdir_in(root),
            None => tempfile::Builder::new().prefix("postscribe_").tempdir(),
        };

        builder_result.map_err(|err| ExtractionError::ProcessFailed {
            exit_code: None,
            detail: format!("failed to create staging directory: {err}"),
        })
    }

    /// Name the extracted track after the upload it came from.
    fn audio_filename(&self, asset: &MediaAsset) -> String {
        let stem = Path::new(&asset.filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("audio");
        format!("{}.{}", stem, self.output_extension())
    }

    /// File extension matching the configured output codec.
    fn output_extension(&self) -> &'static str {
        match self.codec.as_str() {
            "mp3" | "libmp3lame" => "mp3",
            "aac" => "m4a",
            "flac" => "flac",
            "libopus" | "opus" | "libvorbis" | "vorbis" => "ogg",
            "pcm_s16le" => "wav",
            _ => "mp3",
        }
    }
}

/// Bounded tail of the encoder's stderr; the useful diagnostic is at the end.
fn stderr_excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    let total = trimmed.chars().count();
    if total <= STDERR_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().skip(total - STDERR_EXCERPT_CHARS).collect()
}
