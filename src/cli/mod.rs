use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "postscribe",
    version,
    about = "Turn video and audio files into transcripts and ready-to-post social media copy"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe a media file and draft a social media post from it
    Process {
        /// Video or audio file to process
        file: PathBuf,

        /// Target platform (instagram, tiktok, youtube, linkedin, facebook, twitter)
        #[arg(short, long, default_value = "instagram")]
        platform: String,

        /// Tone of voice for the generated copy
        #[arg(short, long, default_value = "casual")]
        tone: String,

        /// Caption length: short, medium or long
        #[arg(short = 'l', long, default_value = "medium")]
        caption_length: String,

        /// How many hashtags to suggest (3-30)
        #[arg(short = 'n', long = "hashtags")]
        hashtag_count: Option<i64>,

        /// Guidance text forwarded to the transcription model (names,
        /// jargon, spellings)
        #[arg(long, default_value = "")]
        prompt: String,

        /// Write the result to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (defaults to the configured format)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Keep the extracted audio next to the input file
        #[arg(long)]
        save_audio: bool,
    },

    /// Show the active configuration
    Config {
        /// Print the full configuration
        #[arg(long)]
        show: bool,
    },

    /// List supported platforms and content options
    Platforms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

impl OutputFormat {
    /// Lenient parse for the value stored in the config file.
    pub fn from_config_str(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "markdown" | "md" => OutputFormat::Markdown,
            _ => OutputFormat::Text,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
        };
        write!(f, "{name}")
    }
}
