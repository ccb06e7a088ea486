use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use super::domain::Question;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("payload looks like JSON but does not parse: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON array, found {0}")]
    NotAnArray(&'static str),
}

/// Conversation pulled out of a mock-interview answer payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    pub transcription: Vec<Value>,
    pub messages: Vec<Value>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.transcription.is_empty()
    }
}

/// True for `null`, `false`, `0` and the empty string.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Brings a stored payload into object/array form.
///
/// Plain strings that do not look like JSON are opaque text and yield
/// `Ok(None)`; strings that look like JSON but fail to parse are errors.
pub fn normalize_payload(value: &Value) -> Result<Option<Value>, NormalizeError> {
    if is_blank(value) {
        return Ok(None);
    }

    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
                return Ok(None);
            }
            Ok(Some(serde_json::from_str(trimmed)?))
        }
        Value::Object(_) | Value::Array(_) => Ok(Some(value.clone())),
        _ => Ok(None),
    }
}

/// Reporting-side variant of [`normalize_payload`]: corrupt payloads are
/// logged and read as absent.
pub fn normalize_or_default(value: Option<&Value>, field: &str) -> Option<Value> {
    let value = value?;
    match normalize_payload(value) {
        Ok(normalized) => normalized,
        Err(err) => {
            warn!(field, error = %err, "discarding unreadable stored payload");
            None
        }
    }
}

/// Recognizes the transcript layouts written by the interview recorder.
pub fn extract_transcript(answers: Option<&Value>) -> Transcript {
    match answers {
        Some(Value::Object(map)) => {
            if let Some(Value::Array(transcription)) = map.get("transcription") {
                let messages = match map.get("messages") {
                    Some(Value::Array(messages)) => messages.clone(),
                    _ => transcription.clone(),
                };
                return Transcript {
                    transcription: transcription.clone(),
                    messages,
                };
            }
            if let Some(Value::Array(messages)) = map.get("messages") {
                return Transcript {
                    transcription: messages.clone(),
                    messages: messages.clone(),
                };
            }
            Transcript::default()
        }
        Some(Value::Array(entries)) => Transcript {
            transcription: entries.clone(),
            messages: entries.clone(),
        },
        _ => Transcript::default(),
    }
}

/// Parses question definitions given either as an array or a JSON string.
pub fn parse_questions(value: &Value) -> Result<Vec<Question>, NormalizeError> {
    match normalize_payload(value)? {
        None => Ok(Vec::new()),
        Some(Value::Array(entries)) => {
            let questions = serde_json::from_value(Value::Array(entries))?;
            Ok(questions)
        }
        Some(_) => Err(NormalizeError::NotAnArray("object")),
    }
}

/// Reading-side variant of [`parse_questions`] for quizzes already stored.
/// Entries that no longer decode are skipped; the rest are kept.
pub fn parse_questions_or_default(value: &Value) -> Vec<Question> {
    let entries = match normalize_payload(value) {
        Ok(Some(Value::Array(entries))) => entries,
        Ok(None) => return Vec::new(),
        Ok(Some(_)) => {
            warn!("stored quiz questions are not a list, discarding");
            return Vec::new();
        }
        Err(err) => {
            warn!(error = %err, "discarding unreadable quiz questions");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(question) => Some(question),
            Err(err) => {
                warn!(index, error = %err, "skipping unreadable quiz question");
                None
            }
        })
        .collect()
}

/// Numbers stored loosely: numeric strings parse, anything else is absent.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Entries of a list-valued payload; anything unreadable is an empty list.
pub fn normalize_list(value: &Value, field: &str) -> Vec<Value> {
    match normalize_or_default(Some(value), field) {
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            warn!(field, "expected a list payload, ignoring");
            Vec::new()
        }
        None => Vec::new(),
    }
}
