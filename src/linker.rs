//! Two-pass prompt linking.
//!
//! An assistant record is billed, but the prompt that triggered it lives on an
//! earlier user record. Pass one indexes user text by record uuid; pass two
//! attaches it to every assistant record whose `parentUuid` points at it. The
//! index lives for one file only.

use crate::record::{LogRecord, RecordKind};
use std::collections::HashMap;

pub struct MessageLinker;

impl MessageLinker {
    /// Attach parent user text to assistant records, in place.
    ///
    /// Returns the number of records that were linked.
    pub fn link(records: &mut [LogRecord]) -> usize {
        let user_text = Self::index_user_text(records);
        if user_text.is_empty() {
            return 0;
        }

        let mut linked = 0;
        for record in records.iter_mut() {
            if record.kind != RecordKind::Assistant {
                continue;
            }
            let text = record
                .parent_uuid
                .as_ref()
                .and_then(|parent| user_text.get(parent));
            if let Some(text) = text {
                record.linked_text = Some(text.clone());
                linked += 1;
            }
        }
        linked
    }

    fn index_user_text(records: &[LogRecord]) -> HashMap<String, String> {
        records
            .iter()
            .filter(|record| record.kind == RecordKind::User)
            .filter_map(|record| Some((record.uuid.clone()?, record.content_text.clone()?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> LogRecord {
        LogRecord::from_value(&value).unwrap()
    }

    #[test]
    fn test_links_assistant_to_parent_user() {
        let mut records = vec![
            decode(json!({"type": "user", "uuid": "u1", "message": {"content": "refactor the parser"}})),
            decode(json!({"type": "user", "uuid": "u2", "message": {"content": "unrelated"}})),
            decode(json!({"type": "assistant", "uuid": "a1", "parentUuid": "u1"})),
        ];

        assert_eq!(MessageLinker::link(&mut records), 1);
        assert_eq!(records[2].linked_text.as_deref(), Some("refactor the parser"));
        assert!(records[0].linked_text.is_none());
    }

    #[test]
    fn test_distant_parent_is_linked() {
        let mut records = vec![decode(json!({
            "type": "user", "uuid": "u1",
            "message": {"content": [{"type": "text", "text": "first prompt"}]}
        }))];
        for i in 0..50 {
            records.push(decode(json!({"type": "system", "uuid": format!("s{}", i)})));
        }
        records.push(decode(json!({"type": "assistant", "parentUuid": "u1"})));

        MessageLinker::link(&mut records);
        assert_eq!(records.last().unwrap().linked_text.as_deref(), Some("first prompt"));
    }

    #[test]
    fn test_unknown_parent_and_non_assistant_are_untouched() {
        let mut records = vec![
            decode(json!({"type": "user", "uuid": "u1", "message": {"content": "hello"}})),
            decode(json!({"type": "assistant", "parentUuid": "missing"})),
            decode(json!({"type": "user", "parentUuid": "u1", "message": {"content": "again"}})),
        ];

        assert_eq!(MessageLinker::link(&mut records), 0);
        assert!(records[1].linked_text.is_none());
        assert!(records[2].linked_text.is_none());
    }

    #[test]
    fn test_user_without_text_is_not_indexed() {
        let mut records = vec![
            decode(json!({"type": "user", "uuid": "u1", "message": {"content": [{"type": "tool_result"}]}})),
            decode(json!({"type": "assistant", "parentUuid": "u1"})),
        ];

        assert_eq!(MessageLinker::link(&mut records), 0);
    }
}
