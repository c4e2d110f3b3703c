use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the remote store and recommendation service.
///
/// `detail` is usually a sentence, but request validation failures carry a
/// list of `{loc, msg}` entries instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ApiErrorBody {
    /// Operator-facing text for `detail`, or `None` when the server sent none.
    pub fn detail_message(&self) -> Option<String> {
        let message = match self.detail.as_ref()? {
            Value::Null => return None,
            Value::String(text) => text.clone(),
            Value::Array(entries) => entries
                .iter()
                .map(describe_entry)
                .filter(|entry| !entry.is_empty())
                .collect::<Vec<_>>()
                .join("; "),
            other => describe_entry(other),
        };
        if message.trim().is_empty() {
            None
        } else {
            Some(message)
        }
    }
}

fn describe_entry(entry: &Value) -> String {
    match entry {
        Value::String(text) => text.clone(),
        Value::Object(fields) => {
            let msg = fields
                .get("msg")
                .or_else(|| fields.get("message"))
                .and_then(Value::as_str);
            let loc = fields.get("loc").and_then(Value::as_array).map(|parts| {
                parts
                    .iter()
                    .map(|part| match part {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".")
            });
            match (loc, msg) {
                (Some(loc), Some(msg)) if !loc.is_empty() => format!("{loc}: {msg}"),
                (_, Some(msg)) => msg.to_string(),
                _ => entry.to_string(),
            }
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
