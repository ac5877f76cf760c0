use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One entry of the session log, produced by the iteration loop and consumed read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    #[serde(deserialize_with = "deserialize_id_to_string")]
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    pub session: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Task,
    Note,
    Iteration,
    Control,
    #[serde(untagged)]
    Other(String),
}

impl EventKind {
    pub fn label(&self) -> &str {
        match self {
            Self::Task => "task",
            Self::Note => "note",
            Self::Iteration => "iteration",
            Self::Control => "control",
            Self::Other(other) => other.as_str(),
        }
    }
}

impl SessionEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn data_u64(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(Value::as_u64)
    }

    pub fn is(&self, kind: EventKind, action: &str) -> bool {
        self.kind == kind && self.action == action
    }

    /// Single-line description used by the event panes.
    pub fn summary(&self) -> String {
        let subject = self
            .data_str("title")
            .or_else(|| self.data_str("text"))
            .or_else(|| self.data_str("id"));
        match subject {
            Some(subject) => format!("{} {}: {subject}", self.kind.label(), self.action),
            None => format!("{} {}", self.kind.label(), self.action),
        }
    }
}

fn deserialize_id_to_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "event id must be a string or number, got {other}"
        ))),
    }
}
