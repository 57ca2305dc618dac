use serde::{Deserialize, Serialize};

pub mod normalizer;

pub use normalizer::{ContentNormalizer, NormalizeError, MAX_TRANSCRIPT_CHARS};

/// Hashtag count used when the caller supplies none.
pub const DEFAULT_HASHTAG_COUNT: usize = 10;
/// Hard bounds on the requested hashtag count.
pub const MIN_HASHTAG_COUNT: i64 = 3;
pub const MAX_HASHTAG_COUNT: i64 = 30;

const DEFAULT_TONE: &str = "casual";

/// Social platforms the generator can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Instagram,
    TikTok,
    YouTube,
    LinkedIn,
    Facebook,
    Twitter,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Instagram,
        Platform::TikTok,
        Platform::YouTube,
        Platform::LinkedIn,
        Platform::Facebook,
        Platform::Twitter,
    ];

    /// Accepts common spellings and shorthands; anything unrecognized maps
    /// to Instagram rather than failing the run.
    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "instagram" | "insta" | "ig" => Platform::Instagram,
            "tiktok" | "tik tok" => Platform::TikTok,
            "youtube" | "youtube shorts" | "shorts" | "yt" => Platform::YouTube,
            "linkedin" => Platform::LinkedIn,
            "facebook" | "fb" => Platform::Facebook,
            "twitter" | "x" | "x/twitter" => Platform::Twitter,
            _ => Platform::Instagram,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::TikTok => "TikTok",
            Platform::YouTube => "YouTube",
            Platform::LinkedIn => "LinkedIn",
            Platform::Facebook => "Facebook",
            Platform::Twitter => "Twitter",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Instagram
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested caption length, with Portuguese spellings accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptionLength {
    Short,
    Medium,
    Long,
}

impl CaptionLength {
    pub fn parse_lenient(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "short" | "curta" | "curto" => CaptionLength::Short,
            "long" | "longa" | "longo" => CaptionLength::Long,
            "medium" | "media" | "média" | "medio" | "médio" => CaptionLength::Medium,
            _ => CaptionLength::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionLength::Short => "short",
            CaptionLength::Medium => "medium",
            CaptionLength::Long => "long",
        }
    }

    /// Phrase handed to the generator describing the desired caption size.
    pub fn instruction_hint(&self) -> &'static str {
        match self {
            CaptionLength::Short => "1 to 2 short sentences",
            CaptionLength::Medium => "2 to 3 sentences",
            CaptionLength::Long => "a detailed paragraph of 4 to 6 sentences",
        }
    }
}

impl Default for CaptionLength {
    fn default() -> Self {
        CaptionLength::Medium
    }
}

/// Content options exactly as the caller supplied them, before sanitation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentRequest {
    pub platform: String,
    pub tone: String,
    pub caption_length: String,
    pub hashtag_count: Option<i64>,
}

/// A [`ContentRequest`] after sanitation; every field here is usable as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub platform: Platform,
    pub tone: String,
    pub caption_length: CaptionLength,
    pub hashtag_count: usize,
}

impl GenerationRequest {
    /// Sanitize each field independently: a bad platform never disturbs a
    /// good tone, and vice versa.
    pub fn sanitized(request: &ContentRequest) -> Self {
        let tone = request.tone.trim();
        Self {
            platform: Platform::parse_lenient(&request.platform),
            tone: if tone.is_empty() {
                DEFAULT_TONE.to_string()
            } else {
                tone.to_string()
            },
            caption_length: CaptionLength::parse_lenient(&request.caption_length),
            hashtag_count: sanitize_hashtag_count(request.hashtag_count),
        }
    }
}

/// Clamp the requested hashtag count into the supported range; an absent
/// count falls back to the default.
pub fn sanitize_hashtag_count(requested: Option<i64>) -> usize {
    match requested {
        Some(count) => count.clamp(MIN_HASHTAG_COUNT, MAX_HASHTAG_COUNT) as usize,
        None => DEFAULT_HASHTAG_COUNT,
    }
}

/// The finished, display-ready content package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBundle {
    pub title: String,
    pub caption: String,
    pub hashtags: Vec<String>,
}
