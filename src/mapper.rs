use crate::models::{CostMode, UsageEntry, UNKNOWN_MODEL, UNKNOWN_REQUEST_ID};
use crate::pricing::PricingCalculator;
use crate::record::LogRecord;

/// Longest derived keyword, in characters.
pub const KEYWORD_MAX_CHARS: usize = 40;
const KEYWORD_ELLIPSIS: &str = "...";
/// Texts with at most this many words become the keyword verbatim.
const KEYWORD_FULL_TEXT_WORDS: usize = 5;
/// Longer texts are cut to their first few words.
const KEYWORD_PREFIX_WORDS: usize = 3;

/// Maps decoded records to canonical usage entries.
pub struct EntryMapper<'a> {
    pricing: &'a PricingCalculator,
    mode: CostMode,
}

impl<'a> EntryMapper<'a> {
    pub fn new(pricing: &'a PricingCalculator, mode: CostMode) -> Self {
        Self { pricing, mode }
    }

    /// Build an entry, or `None` when the record has no usable timestamp or no tokens.
    pub fn map(&self, record: &LogRecord) -> Option<UsageEntry> {
        let timestamp = record.timestamp?;
        let tokens = record.tokens;
        if tokens.is_empty() {
            return None;
        }

        let model = record
            .model
            .clone()
            .unwrap_or_else(|| UNKNOWN_MODEL.to_string());
        let cost_usd = self
            .pricing
            .cost_for_entry(&tokens, &model, record.supplied_cost, self.mode);

        let text = record.prompt_text().map(str::to_string);
        let keyword = record
            .keyword
            .clone()
            .or_else(|| text.as_deref().and_then(derive_keyword));

        Some(UsageEntry {
            timestamp,
            input_tokens: tokens.input_tokens,
            output_tokens: tokens.output_tokens,
            cache_creation_tokens: tokens.cache_creation_tokens,
            cache_read_tokens: tokens.cache_read_tokens,
            cost_usd,
            model,
            message_id: record.message_id.clone().unwrap_or_default(),
            request_id: record
                .request_id
                .clone()
                .unwrap_or_else(|| UNKNOWN_REQUEST_ID.to_string()),
            keyword,
            text,
        })
    }
}

/// Short label for a prompt: the whole text up to five words, otherwise the
/// first three, capped at 40 characters with a trailing ellipsis.
pub fn derive_keyword(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return None;
    }

    let take = if words.len() <= KEYWORD_FULL_TEXT_WORDS {
        words.len()
    } else {
        KEYWORD_PREFIX_WORDS
    };
    let keyword = words[..take].join(" ");

    if keyword.chars().count() <= KEYWORD_MAX_CHARS {
        return Some(keyword);
    }

    let keep = KEYWORD_MAX_CHARS - KEYWORD_ELLIPSIS.len();
    let mut truncated: String = keyword.chars().take(keep).collect();
    truncated.push_str(KEYWORD_ELLIPSIS);
    Some(truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value, mode: CostMode) -> Option<UsageEntry> {
        let pricing = PricingCalculator::new();
        let record = LogRecord::from_value(&value).unwrap();
        EntryMapper::new(&pricing, mode).map(&record)
    }

    #[test]
    fn test_keyword_short_text_is_kept() {
        assert_eq!(
            derive_keyword("fix the login bug please").as_deref(),
            Some("fix the login bug please")
        );
    }

    #[test]
    fn test_keyword_long_text_uses_three_words() {
        assert_eq!(derive_keyword("a b c d e f g h").as_deref(), Some("a b c"));
    }

    #[test]
    fn test_keyword_truncated_to_forty_chars() {
        let word = "x".repeat(20);
        let text = format!("{} {} {}", word, word, word.chars().take(18).collect::<String>());
        assert_eq!(text.chars().count(), 60);

        let keyword = derive_keyword(&text).unwrap();
        assert_eq!(keyword.chars().count(), 40);
        assert!(keyword.ends_with("..."));
        assert_eq!(&keyword[..37], &text[..37]);
    }

    #[test]
    fn test_keyword_truncation_counts_chars() {
        let text = "é".repeat(50);
        let keyword = derive_keyword(&text).unwrap();
        assert_eq!(keyword.chars().count(), 40);
    }

    #[test]
    fn test_keyword_empty_text() {
        assert!(derive_keyword("   ").is_none());
    }

    #[test]
    fn test_zero_tokens_rejected() {
        let entry = map(
            json!({"timestamp": "2024-01-15T10:00:00Z", "input_tokens": 0, "output_tokens": 0}),
            CostMode::Auto,
        );
        assert!(entry.is_none());
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let entry = map(json!({"timestamp": "yesterday", "input_tokens": 5}), CostMode::Auto);
        assert!(entry.is_none());
        assert!(map(json!({"input_tokens": 5}), CostMode::Auto).is_none());
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let entry = map(
            json!({"timestamp": "2024-01-15T10:00:00Z", "cache_read_tokens": 5}),
            CostMode::Auto,
        )
        .unwrap();
        assert_eq!(entry.model, "unknown");
        assert_eq!(entry.request_id, "unknown");
        assert_eq!(entry.message_id, "");
        assert!(entry.keyword.is_none());
        assert!(entry.text.is_none());
    }

    #[test]
    fn test_explicit_keyword_wins_over_text() {
        let entry = map(
            json!({
                "timestamp": "2024-01-15T10:00:00Z",
                "input_tokens": 5,
                "keyword": "urgent",
                "message": {"content": "please look at the failing deploy now"}
            }),
            CostMode::Auto,
        )
        .unwrap();
        assert_eq!(entry.keyword.as_deref(), Some("urgent"));
        assert_eq!(entry.text.as_deref(), Some("please look at the failing deploy now"));
    }

    #[test]
    fn test_linked_text_drives_keyword() {
        let pricing = PricingCalculator::new();
        let mut record = LogRecord::from_value(&json!({
            "type": "assistant",
            "timestamp": "2024-01-15T10:00:00Z",
            "message": {"id": "msg_1", "model": "claude-sonnet-4", "usage": {"output_tokens": 9},
                        "content": [{"type": "text", "text": "assistant reply"}]}
        }))
        .unwrap();
        record.linked_text = Some("add retries to the upload client please".to_string());

        let entry = EntryMapper::new(&pricing, CostMode::Calculate).map(&record).unwrap();
        assert_eq!(entry.keyword.as_deref(), Some("add retries to"));
        assert_eq!(entry.message_id, "msg_1");
        assert!(entry.cost_usd > 0.0);
    }

    #[test]
    fn test_use_provided_cost() {
        let entry = map(
            json!({"timestamp": "2024-01-15T10:00:00Z", "input_tokens": 1_000_000,
                   "model": "claude-opus-4", "cost_usd": 0.05}),
            CostMode::UseProvided,
        )
        .unwrap();
        assert_eq!(entry.cost_usd, 0.05);
    }
}
