//! Raw record decoding
//!
//! Log lines come from several writer versions: conversation records with a
//! `type` tag, nested `message` objects and a `usage` sub-object, and flat
//! records written by [`crate::writer`]. This module decodes every recognized
//! shape into one [`LogRecord`] up front, so linking, filtering and mapping
//! never probe raw JSON again.

use crate::models::TokenCounts;
use crate::timestamp_parser::TimestampParser;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Who authored a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    User,
    Assistant,
    #[default]
    #[serde(other)]
    Other,
}

/// A log line normalized into a single typed shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRecord {
    pub kind: RecordKind,
    pub uuid: Option<String>,
    pub parent_uuid: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub model: Option<String>,
    pub message_id: Option<String>,
    pub request_id: Option<String>,
    pub supplied_cost: Option<f64>,
    pub keyword: Option<String>,
    /// Text authored in this record's own message content.
    pub content_text: Option<String>,
    /// Prompt text attached by the message linker.
    pub linked_text: Option<String>,
    pub tokens: TokenCounts,
}

impl LogRecord {
    /// Decode a raw JSON record. Returns `None` when the value is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }

        let wire = WireRecord::deserialize(value).ok()?;
        let flat = WireUsage::deserialize(value).unwrap_or_default();
        let message = wire.message.unwrap_or_default();

        let tokens = extract_tokens([
            message.usage.as_ref(),
            wire.usage.as_ref(),
            Some(&flat),
        ]);

        Some(LogRecord {
            kind: wire.kind.unwrap_or_default(),
            uuid: non_empty(wire.uuid),
            parent_uuid: non_empty(wire.parent_uuid).or_else(|| non_empty(wire.parent_uuid_snake)),
            timestamp: wire.timestamp.as_ref().and_then(TimestampParser::parse_value),
            model: non_empty(wire.model).or_else(|| non_empty(message.model)),
            message_id: non_empty(wire.message_id)
                .or_else(|| non_empty(wire.message_id_camel))
                .or_else(|| non_empty(message.id)),
            request_id: non_empty(wire.request_id).or_else(|| non_empty(wire.request_id_camel)),
            supplied_cost: supplied_cost([wire.cost, wire.cost_usd, wire.cost_usd_camel]),
            keyword: non_empty(wire.keyword),
            content_text: message.content.and_then(MessageContent::first_text),
            linked_text: None,
            tokens,
        })
    }

    /// Composite identity used for deduplication, present only when both ids are.
    pub fn dedup_key(&self) -> Option<String> {
        match (&self.message_id, &self.request_id) {
            (Some(message_id), Some(request_id)) => Some(format!("{}:{}", message_id, request_id)),
            _ => None,
        }
    }

    /// Linked prompt text, falling back to the record's own content.
    pub fn prompt_text(&self) -> Option<&str> {
        self.linked_text
            .as_deref()
            .or(self.content_text.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

/// Pick the first usage source carrying any non-zero count.
fn extract_tokens<'a>(sources: [Option<&'a WireUsage>; 3]) -> TokenCounts {
    sources
        .into_iter()
        .flatten()
        .map(WireUsage::counts)
        .find(|counts| !counts.is_empty())
        .unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[derive(Debug, Default, Deserialize)]
struct WireRecord {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    kind: Option<RecordKind>,
    #[serde(default, deserialize_with = "lenient")]
    uuid: Option<String>,
    #[serde(rename = "parentUuid", default, deserialize_with = "lenient")]
    parent_uuid: Option<String>,
    #[serde(rename = "parent_uuid", default, deserialize_with = "lenient")]
    parent_uuid_snake: Option<String>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    model: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    message_id: Option<String>,
    #[serde(rename = "messageId", default, deserialize_with = "lenient")]
    message_id_camel: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    request_id: Option<String>,
    #[serde(rename = "requestId", default, deserialize_with = "lenient")]
    request_id_camel: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    cost_usd: Option<f64>,
    #[serde(rename = "costUSD", default, deserialize_with = "lenient")]
    cost_usd_camel: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    keyword: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    message: Option<WireMessage>,
    #[serde(default, deserialize_with = "lenient")]
    usage: Option<WireUsage>,
}

#[derive(Debug, Default, Deserialize)]
struct WireMessage {
    #[serde(default, deserialize_with = "lenient")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    model: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    usage: Option<WireUsage>,
    #[serde(default, deserialize_with = "lenient")]
    content: Option<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<Value>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

impl MessageContent {
    fn first_text(self) -> Option<String> {
        let text = match self {
            MessageContent::Text(text) => text,
            MessageContent::Blocks(blocks) => blocks.iter().find_map(|block| {
                match ContentBlock::deserialize(block) {
                    Ok(ContentBlock::Text { text }) => Some(text),
                    _ => None,
                }
            })?,
        };
        Some(text).filter(|t| !t.is_empty())
    }
}

/// Token counters under every known spelling. Each spelling is its own
/// field so a record carrying two of them still decodes.
#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default, deserialize_with = "lenient_count")]
    input_tokens: Option<u64>,
    #[serde(rename = "inputTokens", default, deserialize_with = "lenient_count")]
    input_tokens_camel: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    prompt_tokens: Option<u64>,

    #[serde(default, deserialize_with = "lenient_count")]
    output_tokens: Option<u64>,
    #[serde(rename = "outputTokens", default, deserialize_with = "lenient_count")]
    output_tokens_camel: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    completion_tokens: Option<u64>,

    #[serde(default, deserialize_with = "lenient_count")]
    cache_creation_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    cache_creation_input_tokens: Option<u64>,
    #[serde(rename = "cacheCreationInputTokens", default, deserialize_with = "lenient_count")]
    cache_creation_input_tokens_camel: Option<u64>,

    #[serde(default, deserialize_with = "lenient_count")]
    cache_read_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    cache_read_input_tokens: Option<u64>,
    #[serde(rename = "cacheReadInputTokens", default, deserialize_with = "lenient_count")]
    cache_read_input_tokens_camel: Option<u64>,
}

impl WireUsage {
    fn counts(&self) -> TokenCounts {
        TokenCounts {
            input_tokens: first_count([self.input_tokens, self.input_tokens_camel, self.prompt_tokens]),
            output_tokens: first_count([
                self.output_tokens,
                self.output_tokens_camel,
                self.completion_tokens,
            ]),
            cache_creation_tokens: first_count([
                self.cache_creation_tokens,
                self.cache_creation_input_tokens,
                self.cache_creation_input_tokens_camel,
            ]),
            cache_read_tokens: first_count([
                self.cache_read_tokens,
                self.cache_read_input_tokens,
                self.cache_read_input_tokens_camel,
            ]),
        }
    }
}

fn first_count(spellings: [Option<u64>; 3]) -> u64 {
    spellings.into_iter().flatten().next().unwrap_or(0)
}

/// First non-zero supplied cost; a zero is kept only when no field has more.
fn supplied_cost(fields: [Option<f64>; 3]) -> Option<f64> {
    let mut present = fields.into_iter().flatten();
    let first = present.next()?;
    if first != 0.0 {
        return Some(first);
    }
    Some(present.find(|cost| *cost != 0.0).unwrap_or(first))
}

/// Decode a field as `T`, turning a type mismatch into `None` instead of an error.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Decode a token count; anything that is not a non-negative number is `None`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let count = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(count)
}
