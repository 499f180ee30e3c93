//! Post-processing of raw model output.

use tracing::debug;

use crate::error::LlmError;
use crate::types::{ExtractedItem, ExtractionEnvelope, StoryResponse};

/// Split narration from its trailing image prompt.
///
/// Everything before the first `separator` is the narrative; the text after
/// it, up to any further separator, is the image prompt. A missing or blank
/// image prompt becomes `default_image_prompt`. Both parts are trimmed.
#[must_use]
pub fn split_narrative(raw: &str, separator: &str, default_image_prompt: &str) -> StoryResponse {
    let (narrative, image) = if separator.is_empty() {
        (raw, None)
    } else {
        let mut parts = raw.split(separator);
        let narrative = parts.next().unwrap_or_default();
        (narrative, parts.next())
    };

    let image_prompt = image
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(default_image_prompt)
        .to_string();

    StoryResponse {
        narrative: narrative.trim().to_string(),
        image_prompt,
    }
}

/// Default illustration for an ending scene of the given type.
#[must_use]
pub fn ending_image_prompt(ending_type: &str) -> String {
    format!("{ending_type} ending zombie apocalypse pixel art")
}

/// Strip a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the extractor's answer.
///
/// Accepts `{"items": [...]}` or a bare array, optionally wrapped in a code
/// fence. Items with a blank name are dropped.
///
/// # Errors
///
/// [`LlmError::Malformed`] when the text is not one of those shapes. The
/// game treats that as "no items found".
pub fn parse_extracted_items(text: &str) -> Result<Vec<ExtractedItem>, LlmError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let items = if body.starts_with('[') {
        serde_json::from_str::<Vec<ExtractedItem>>(body)
    } else {
        serde_json::from_str::<ExtractionEnvelope>(body).map(|e| e.items)
    }
    .map_err(|e| LlmError::Malformed(format!("item extraction: {e}")))?;

    let total = items.len();
    let items: Vec<ExtractedItem> = items
        .into_iter()
        .filter(|i| !i.name.trim().is_empty())
        .collect();
    if items.len() != total {
        debug!(dropped = total - items.len(), "Dropped unnamed extracted items");
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEP: &str = "IMAGEN: ";
    const DEFAULT: &str = "zombie apocalypse scene";

    #[test]
    fn splits_on_separator() {
        let raw = "Corres por el pasillo.\n¿Qué haces?\nIMAGEN: dark hospital corridor, pixel art\n";
        let story = split_narrative(raw, SEP, DEFAULT);
        assert_eq!(story.narrative, "Corres por el pasillo.\n¿Qué haces?");
        assert_eq!(story.image_prompt, "dark hospital corridor, pixel art");
    }

    #[test]
    fn missing_image_uses_default() {
        let story = split_narrative("  Silencio.  ", SEP, DEFAULT);
        assert_eq!(story.narrative, "Silencio.");
        assert_eq!(story.image_prompt, DEFAULT);

        let blank = split_narrative("Silencio.\nIMAGEN:    ", SEP, DEFAULT);
        assert_eq!(blank.image_prompt, DEFAULT);
    }

    #[test]
    fn only_first_image_segment_is_kept() {
        let story = split_narrative("A IMAGEN: first IMAGEN: second", SEP, DEFAULT);
        assert_eq!(story.narrative, "A");
        assert_eq!(story.image_prompt, "first");
    }

    #[test]
    fn ending_default_prompt() {
        assert_eq!(ending_image_prompt("escape"), "escape ending zombie apocalypse pixel art");
    }

    #[test]
    fn parses_envelope_and_fenced_array() {
        let items = parse_extracted_items(
            r#"{"items":[{"name":"Linterna","description":"Con pilas","type":"tool","icon":"🔦","usable":true}]}"#,
        )
        .expect("envelope");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_type, "tool");

        let fenced = "```json\n[{\"name\":\"Lata\",\"type\":\"food\"}]\n```";
        let items = parse_extracted_items(fenced).expect("fenced");
        assert_eq!(items[0].name, "Lata");
        assert!(!items[0].usable);
    }

    #[test]
    fn empty_and_garbage() {
        assert!(parse_extracted_items("  ").expect("empty").is_empty());
        assert!(parse_extracted_items(r#"{"items": []}"#).expect("none").is_empty());
        assert!(matches!(
            parse_extracted_items("no hay objetos"),
            Err(LlmError::Malformed(_))
        ));
    }

    #[test]
    fn unnamed_items_are_dropped() {
        let items = parse_extracted_items(r#"[{"name":"  ","type":"misc"},{"name":"Llave","type":"key"}]"#)
            .expect("parse");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Llave");
    }
}
