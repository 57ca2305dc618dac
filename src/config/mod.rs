use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Application configuration, loaded from YAML.
///
/// Lookup order: `config.yaml` in the working directory, then the per-user
/// config directory. A missing file is replaced with defaults (and written
/// back so there is something to edit). The API key is deliberately not part
/// of the file; it comes from the environment only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub transcription: TranscriptionConfig,
    pub extraction: ExtractionConfig,
    pub limits: LimitsConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Base URL of the OpenAI-compatible API
    pub api_base: String,
    /// Speech-to-text model
    pub whisper_model: String,
    /// Chat model used for content generation
    pub chat_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// ISO 639-1 language hint passed to the transcription model
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Encoder binary, resolved on PATH unless given as a path
    pub binary: String,
    pub codec: String,
    pub bitrate: String,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted upload, in MiB
    pub max_input_mb: u64,
    /// Maximum wall-clock time allowed for a single extraction run
    pub extraction_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root for extraction staging directories; system temp when unset
    pub temp_dir: Option<PathBuf>,
    /// Keep the extracted audio next to the output instead of discarding it
    pub keep_audio: bool,
    /// Output format used when none is given on the command line
    pub default_output_format: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            whisper_model: "whisper-1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language: "pt".to_string(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            codec: "mp3".to_string(),
            bitrate: "128k".to_string(),
            sample_rate: 44100,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_mb: 1024,
            extraction_timeout_secs: 1800,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            keep_audio: false,
            default_output_format: "text".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            transcription: TranscriptionConfig::default(),
            extraction: ExtractionConfig::default(),
            limits: LimitsConfig::default(),
            app: AppConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid config file at {}", config_path.display()))?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("postscribe").join("config.yaml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.openai.api_base.trim().is_empty() {
            anyhow::bail!("openai.api_base must not be empty");
        }
        if self.openai.whisper_model.trim().is_empty() {
            anyhow::bail!("openai.whisper_model must not be empty");
        }
        if self.openai.chat_model.trim().is_empty() {
            anyhow::bail!("openai.chat_model must not be empty");
        }
        if self.transcription.language.trim().is_empty() {
            anyhow::bail!("transcription.language must not be empty");
        }
        if self.extraction.binary.trim().is_empty() {
            anyhow::bail!("extraction.binary must not be empty");
        }
        if self.extraction.codec.trim().is_empty() {
            anyhow::bail!("extraction.codec must not be empty");
        }
        if self.extraction.bitrate.trim().is_empty() {
            anyhow::bail!("extraction.bitrate must not be empty");
        }
        if self.extraction.sample_rate == 0 {
            anyhow::bail!("extraction.sample_rate must be greater than zero");
        }
        if self.limits.max_input_mb == 0 {
            anyhow::bail!("limits.max_input_mb must be greater than zero");
        }
        if self.limits.extraction_timeout_secs == 0 {
            anyhow::bail!("limits.extraction_timeout_secs must be greater than zero");
        }
        match self.app.default_output_format.as_str() {
            "text" | "json" | "markdown" => {}
            other => anyhow::bail!("app.default_output_format '{other}' is not one of: text, json, markdown"),
        }
        Ok(())
    }

    /// API key from the environment; never read from or written to the
    /// config file.
    pub fn api_key(&self) -> Result<String> {
        std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY is not set. Export it or put it in a .env file")
    }

    pub fn max_input_bytes(&self) -> u64 {
        self.limits.max_input_mb * 1024 * 1024
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.extraction_timeout_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Whisper Model: {}", self.openai.whisper_model);
        println!("  Chat Model: {}", self.openai.chat_model);
        println!("  API Base: {}", self.openai.api_base);
        println!("  API Key: taken from the OPENAI_API_KEY environment variable");
        println!("  Language: {}", self.transcription.language);
        println!(
            "  Encoder: {} ({} @ {} / {} Hz)",
            self.extraction.binary,
            self.extraction.codec,
            self.extraction.bitrate,
            self.extraction.sample_rate
        );
        println!("  Max Upload: {} MiB", self.limits.max_input_mb);
        println!(
            "  Extraction Timeout: {}s",
            self.limits.extraction_timeout_secs
        );
        if let Some(temp_dir) = &self.app.temp_dir {
            println!("  Temp Dir: {}", temp_dir.display());
        }
        println!("  Keep Audio: {}", self.app.keep_audio);
        println!("  Default Format: {}", self.app.default_output_format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.openai.whisper_model, "whisper-1");
        assert_eq!(config.transcription.language, "pt");
        assert_eq!(config.extraction.binary, "ffmpeg");
        assert_eq!(config.limits.max_input_mb, 1024);
        assert_eq!(config.limits.extraction_timeout_secs, 1800);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.extraction.binary = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.limits.extraction_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.app.default_output_format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.openai.api_base = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_limit_conversions() {
        let mut config = Config::default();
        config.limits.max_input_mb = 2;
        config.limits.extraction_timeout_secs = 90;

        assert_eq!(config.max_input_bytes(), 2 * 1024 * 1024);
        assert_eq!(config.extraction_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config: Config = serde_yaml::from_str("limits:\n  max_input_mb: 64\n").unwrap();
        assert_eq!(config.limits.max_input_mb, 64);
        assert_eq!(config.limits.extraction_timeout_secs, 1800);
        assert_eq!(config.extraction.binary, "ffmpeg");
    }

    #[test]
    fn test_config_round_trips_through_yaml() {
        let mut config = Config::default();
        config.app.keep_audio = true;
        config.extraction.codec = "libopus".to_string();

        let yaml = serde_yaml::to_string(&config).unwrap();
        let reloaded: Config = serde_yaml::from_str(&yaml).unwrap();

        assert!(reloaded.app.keep_audio);
        assert_eq!(reloaded.extraction.codec, "libopus");
        assert_eq!(reloaded.openai.whisper_model, "whisper-1");
    }
}
