use std::collections::HashSet;

use serde_json::{Map, Value};

use super::{ContentBundle, ContentRequest, GenerationRequest};
use crate::services::{GenerationError, GenerationService};

/// At most this many characters of the transcript are sent to the generator.
pub const MAX_TRANSCRIPT_CHARS: usize = 8000;

const FALLBACK_TITLE: &str = "Untitled post";
const FALLBACK_CAPTION: &str = "Caption unavailable. Please review the transcript and write one manually.";

#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    #[error("transcript is empty, nothing to generate content from")]
    EmptyTranscript,

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Turns a raw transcript plus caller options into a display-ready
/// [`ContentBundle`].
///
/// The generator's reply is treated as untrusted text: replies wrapped in
/// prose, missing fields, or entirely unparseable all degrade to placeholder
/// content instead of failing the run. Only transport-level generator errors
/// surface as errors.
pub struct ContentNormalizer {
    generator: Box<dyn GenerationService>,
}

impl ContentNormalizer {
    pub fn new(generator: Box<dyn GenerationService>) -> Self {
        Self { generator }
    }

    pub async fn normalize(
        &self,
        transcript: &str,
        request: &ContentRequest,
    ) -> Result<ContentBundle, NormalizeError> {
        let trimmed = transcript.trim();
        if trimmed.is_empty() {
            return Err(NormalizeError::EmptyTranscript);
        }

        let sanitized = GenerationRequest::sanitized(request);
        let instruction = build_instruction(&sanitized);
        let excerpt = transcript_excerpt(trimmed);

        tracing::debug!(
            "Requesting {} content ({} chars of transcript)",
            sanitized.platform,
            excerpt.chars().count()
        );

        let raw = self.generator.generate(&instruction, excerpt).await?;
        Ok(assemble_bundle(&raw, sanitized.hashtag_count))
    }
}

/// Leading slice of the transcript, cut on a character boundary.
fn transcript_excerpt(transcript: &str) -> &str {
    match transcript.char_indices().nth(MAX_TRANSCRIPT_CHARS) {
        Some((byte_offset, _)) => &transcript[..byte_offset],
        None => transcript,
    }
}

fn build_instruction(request: &GenerationRequest) -> String {
    format!(
        "You are a social media copywriter. Based on the transcript provided by the user, \
         write a post for {platform} with a {tone} tone.\n\
         The caption should be {length}.\n\
         Suggest exactly {count} relevant hashtags.\n\
         Write the title, caption and hashtags in the same language as the transcript.\n\
         Reply with ONLY a JSON object in this exact shape, no other text:\n\
         {{\"titulo\": string, \"legenda\": string, \"hashtags\": array of strings}}",
        platform = request.platform,
        tone = request.tone,
        length = request.caption_length.instruction_hint(),
        count = request.hashtag_count,
    )
}

/// Best-effort extraction of a JSON object from the generator's reply.
///
/// Tries the reply as-is, then the substring between the first `{` and the
/// last `}`, and finally gives up with an empty object. Never an error.
fn parse_reply(raw: &str) -> Map<String, Value> {
    if let Some(object) = to_object(serde_json::from_str(raw).ok()) {
        return object;
    }

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Some(object) = to_object(serde_json::from_str(&raw[start..=end]).ok()) {
                return object;
            }
        }
    }

    tracing::warn!("Generator reply had no usable JSON object, using placeholders");
    Map::new()
}

fn to_object(value: Option<Value>) -> Option<Map<String, Value>> {
    match value {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Coerce a JSON field to display text: strings are trimmed, numbers and
/// booleans are rendered, everything else is discarded.
fn text_field(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    }
}

/// Normalize the hashtags field into at most `limit` well-formed tags.
///
/// Accepts an array of values or a single delimited string. Each candidate
/// loses internal whitespace and any pile of leading `#`s, gains exactly one
/// `#`, and is deduplicated case-insensitively keeping the first occurrence.
fn normalize_hashtags(value: Option<&Value>, limit: usize) -> Vec<String> {
    let candidates: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| text_field(Some(item)))
            .collect(),
        Some(Value::String(text)) => text
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for candidate in candidates {
        let compact: String = candidate.chars().filter(|c| !c.is_whitespace()).collect();
        let body = compact.trim_start_matches('#');
        if body.is_empty() {
            continue;
        }
        let tag = format!("#{body}");
        if seen.insert(tag.to_lowercase()) {
            tags.push(tag);
        }
        if tags.len() == limit {
            break;
        }
    }
    tags
}

fn assemble_bundle(raw: &str, hashtag_limit: usize) -> ContentBundle {
    let fields = parse_reply(raw);
    ContentBundle {
        title: text_field(fields.get("titulo"))
            .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        caption: text_field(fields.get("legenda"))
            .unwrap_or_else(|| FALLBACK_CAPTION.to_string()),
        hashtags: normalize_hashtags(fields.get("hashtags"), hashtag_limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockGenerationService;
    use serde_json::json;

    fn normalizer_returning(reply: &str) -> ContentNormalizer {
        let reply = reply.to_string();
        let mut generator = MockGenerationService::new();
        generator
            .expect_generate()
            .times(1)
            .returning(move |_, _| Ok(reply.clone()));
        ContentNormalizer::new(Box::new(generator))
    }

    #[tokio::test]
    async fn test_json_wrapped_in_prose_still_parses() {
        let normalizer = normalizer_returning(
            r##"Here is the result: {"titulo": "A", "legenda": "B", "hashtags": ["#x"]}"##,
        );
        let bundle = normalizer
            .normalize("some talk", &ContentRequest::default())
            .await
            .unwrap();

        assert_eq!(bundle.title, "A");
        assert_eq!(bundle.caption, "B");
        assert_eq!(bundle.hashtags, vec!["#x"]);
    }

    #[tokio::test]
    async fn test_unparseable_reply_degrades_to_placeholders() {
        let normalizer = normalizer_returning("I'm sorry, I can't help with that.");
        let bundle = normalizer
            .normalize("some talk", &ContentRequest::default())
            .await
            .unwrap();

        assert_eq!(bundle.title, FALLBACK_TITLE);
        assert_eq!(bundle.caption, FALLBACK_CAPTION);
        assert!(bundle.hashtags.is_empty());
    }

    #[tokio::test]
    async fn test_long_transcript_is_clipped_on_a_char_boundary() {
        let mut generator = MockGenerationService::new();
        generator
            .expect_generate()
            .withf(|_, excerpt| {
                excerpt.chars().count() == MAX_TRANSCRIPT_CHARS
                    && excerpt.chars().all(|c| c == 'é')
            })
            .times(1)
            .returning(|_, _| Ok("{}".to_string()));
        let normalizer = ContentNormalizer::new(Box::new(generator));

        let transcript = "é".repeat(9000);
        normalizer
            .normalize(&transcript, &ContentRequest::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_transcript_never_reaches_the_generator() {
        // a mock with no expectations panics if called
        let normalizer = ContentNormalizer::new(Box::new(MockGenerationService::new()));
        let err = normalizer
            .normalize("  \n\t ", &ContentRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizeError::EmptyTranscript));
    }

    #[tokio::test]
    async fn test_generator_transport_errors_propagate() {
        let mut generator = MockGenerationService::new();
        generator
            .expect_generate()
            .returning(|_, _| Err(GenerationError::Api("quota exceeded".to_string())));
        let normalizer = ContentNormalizer::new(Box::new(generator));

        let err = normalizer
            .normalize("some talk", &ContentRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Generation(_)));
    }

    #[test]
    fn test_parse_reply_handles_strict_and_embedded_json() {
        assert_eq!(
            parse_reply(r#"{"titulo": "T"}"#).get("titulo"),
            Some(&json!("T"))
        );
        assert_eq!(
            parse_reply(r#"noise {"titulo": "T"} trailing"#).get("titulo"),
            Some(&json!("T"))
        );
        assert!(parse_reply("[]").is_empty());
        assert!(parse_reply("42").is_empty());
        assert!(parse_reply("no braces at all").is_empty());
        assert!(parse_reply("} backwards {").is_empty());
    }

    #[test]
    fn test_text_field_coerces_scalars() {
        assert_eq!(text_field(Some(&json!("  hi  "))), Some("hi".to_string()));
        assert_eq!(text_field(Some(&json!(42))), Some("42".to_string()));
        assert_eq!(text_field(Some(&json!(true))), Some("true".to_string()));
        assert_eq!(text_field(Some(&json!(""))), None);
        assert_eq!(text_field(Some(&json!(["nested"]))), None);
        assert_eq!(text_field(Some(&json!(null))), None);
        assert_eq!(text_field(None), None);
    }

    #[test]
    fn test_hashtags_dedupe_case_insensitively_keeping_first() {
        let value = json!(["Rust", "RUST", "#rust", "other"]);
        assert_eq!(
            normalize_hashtags(Some(&value), 10),
            vec!["#Rust", "#other"]
        );
    }

    #[test]
    fn test_hashtags_accept_a_delimited_string() {
        let value = json!("#a, b  c,#d");
        assert_eq!(
            normalize_hashtags(Some(&value), 10),
            vec!["#a", "#b", "#c", "#d"]
        );
    }

    #[test]
    fn test_hashtag_internal_whitespace_is_removed() {
        let value = json!(["social media"]);
        assert_eq!(normalize_hashtags(Some(&value), 10), vec!["#socialmedia"]);
    }

    #[test]
    fn test_degenerate_hashtags_are_dropped() {
        let value = json!(["", "#", "###", "  ", "ok"]);
        assert_eq!(normalize_hashtags(Some(&value), 10), vec!["#ok"]);
    }

    #[test]
    fn test_hashtags_truncate_to_the_limit() {
        let value = json!(["a", "b", "c", "d", "e"]);
        assert_eq!(normalize_hashtags(Some(&value), 3), vec!["#a", "#b", "#c"]);
    }

    #[test]
    fn test_missing_hashtags_field_yields_empty_list() {
        assert!(normalize_hashtags(None, 10).is_empty());
        assert!(normalize_hashtags(Some(&json!(42)), 10).is_empty());
    }

    #[test]
    fn test_instruction_names_the_sanitized_options() {
        let request = GenerationRequest::sanitized(&ContentRequest {
            platform: "definitely not a platform".to_string(),
            tone: "formal".to_string(),
            caption_length: "long".to_string(),
            hashtag_count: Some(5),
        });
        let instruction = build_instruction(&request);

        assert!(instruction.contains("Instagram"));
        assert!(instruction.contains("formal"));
        assert!(instruction.contains("4 to 6 sentences"));
        assert!(instruction.contains("exactly 5"));
        assert!(instruction.contains("titulo"));
    }
}
