//! Structural classification of internal-engine events.
//!
//! The internal engine's stream carries loosely typed payloads: match
//! batches, informational messages, and exactly one terminal completion.
//! Classification looks only at the shape of each payload, never at arrival
//! order, because the engine may interleave messages with matches freely
//! before its terminal event.

use serde_json::Value;

/// One file match as the internal engine serializes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFileMatch {
    pub path: String,
}

/// Classification of a single event from the engine's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum EventClass {
    /// One or more file matches to forward as a batch.
    Matches(Vec<RawFileMatch>),
    /// Free-text diagnostic; logged, no effect on request state.
    Message(String),
    /// Terminal success.
    Success { limit_hit: bool },
    /// Terminal failure with the engine's error detail.
    Failure { message: String },
    /// Shape not understood; logged and skipped, never terminal.
    Unrecognized,
}

pub fn classify(event: &Value) -> EventClass {
    if let Some(items) = event.as_array() {
        let matches: Vec<_> = items.iter().filter_map(file_match).collect();
        if matches.is_empty() {
            return EventClass::Unrecognized;
        }
        return EventClass::Matches(matches);
    }

    let Some(object) = event.as_object() else {
        return EventClass::Unrecognized;
    };

    // Terminal events carry an explicit type tag; check those before the
    // looser shapes so a failure payload with a message field stays terminal.
    match object.get("type").and_then(Value::as_str) {
        Some("success") => {
            return EventClass::Success {
                limit_hit: object
                    .get("limit_hit")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            };
        }
        Some("error") => {
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("internal search engine failed")
                .to_string();
            return EventClass::Failure { message };
        }
        _ => {}
    }

    if let Some(single) = file_match(event) {
        return EventClass::Matches(vec![single]);
    }

    if let Some(message) = object.get("message").and_then(Value::as_str) {
        return EventClass::Message(message.to_string());
    }

    EventClass::Unrecognized
}

fn file_match(value: &Value) -> Option<RawFileMatch> {
    let path = value.get("path")?.as_str()?;
    Some(RawFileMatch {
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn array_of_paths_is_a_match_batch() {
        let event = json!([{ "path": "/a/one.rs" }, { "path": "/a/two.rs" }]);
        let EventClass::Matches(matches) = classify(&event) else {
            panic!("expected match batch");
        };
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].path, "/a/one.rs");
    }

    #[test]
    fn single_serialized_match_is_a_batch_of_one() {
        let event = json!({ "path": "/a/one.rs" });
        assert_eq!(
            classify(&event),
            EventClass::Matches(vec![RawFileMatch {
                path: "/a/one.rs".to_string()
            }])
        );
    }

    #[test]
    fn message_shape_is_informational() {
        let event = json!({ "message": "walker fell back to directory scan" });
        assert_eq!(
            classify(&event),
            EventClass::Message("walker fell back to directory scan".to_string())
        );
    }

    #[test]
    fn success_shape_carries_limit_flag() {
        let event = json!({ "type": "success", "limit_hit": true });
        assert_eq!(classify(&event), EventClass::Success { limit_hit: true });
    }

    #[test]
    fn error_shape_wins_over_its_message_field() {
        let event = json!({ "type": "error", "message": "walker died" });
        assert_eq!(
            classify(&event),
            EventClass::Failure {
                message: "walker died".to_string()
            }
        );
    }

    #[test]
    fn unknown_shapes_are_never_terminal() {
        assert_eq!(classify(&json!(42)), EventClass::Unrecognized);
        assert_eq!(classify(&json!({ "progress": 0.5 })), EventClass::Unrecognized);
        assert_eq!(classify(&json!([])), EventClass::Unrecognized);
    }
}
