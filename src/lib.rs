//! Postscribe - a Rust CLI tool for turning spoken-word video and audio into
//! transcripts and ready-to-post social media copy
//!
//! This library extracts the audio track of an uploaded video with an external
//! encoder (governed by size and timeout limits), transcribes it through a
//! speech-to-text service, and normalizes the generated title, caption, and
//! hashtags into a well-formed content bundle for a target platform.

pub mod cli;
pub mod config;
pub mod content;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod services;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use content::{ContentBundle, ContentNormalizer, ContentRequest, GenerationRequest, Platform};
pub use media::{AudioAsset, MediaAsset, MediaExtractor, MediaKind, ProcessRunner};
pub use pipeline::{Pipeline, PipelineFailure, PipelineReport, PipelineStage};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
