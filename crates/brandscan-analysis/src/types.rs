//! Wire types for the assistants-style threads/runs API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct CreateThreadAndRun<'a> {
    pub assistant_id: &'a str,
    pub thread: NewThread,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewThread {
    pub messages: Vec<NewMessage>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewMessage {
    pub role: &'static str,
    pub content: String,
}

/// A run as returned by create and retrieve.
#[derive(Debug, Clone, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub thread_id: String,
    pub status: String,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageList {
    #[serde(default)]
    pub data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThreadMessage {
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextContent {
    pub value: String,
}

/// Error envelope returned alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

/// Where a remote run stands, reduced to what the job lifecycle needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed(String),
}

impl RunStatus {
    /// Maps a remote run status string.
    ///
    /// Unknown statuses are treated as still running so a newly introduced
    /// intermediate state never fails a job.
    #[must_use]
    pub fn from_run(run: &RunObject) -> Self {
        match run.status.as_str() {
            "completed" => RunStatus::Completed,
            "failed" | "cancelled" | "expired" | "incomplete" => {
                let detail = run
                    .last_error
                    .as_ref()
                    .and_then(|e| e.message.clone().or_else(|| e.code.clone()));
                RunStatus::Failed(detail.unwrap_or_else(|| format!("analysis run {}", run.status)))
            }
            _ => RunStatus::Running,
        }
    }
}

impl MessageList {
    /// Text of the first assistant message's first text part.
    pub(crate) fn assistant_text(&self) -> Option<&str> {
        self.data
            .iter()
            .find(|m| m.role == "assistant")?
            .content
            .iter()
            .find(|part| part.kind == "text")?
            .text
            .as_ref()
            .map(|t| t.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(status: &str, message: Option<&str>) -> RunObject {
        RunObject {
            id: "run_1".to_owned(),
            thread_id: "thread_1".to_owned(),
            status: status.to_owned(),
            last_error: message.map(|m| RunError {
                code: Some("server_error".to_owned()),
                message: Some(m.to_owned()),
            }),
        }
    }

    #[test]
    fn intermediate_statuses_are_running() {
        for status in ["queued", "in_progress", "cancelling", "requires_action", "new_thing"] {
            assert_eq!(RunStatus::from_run(&run(status, None)), RunStatus::Running);
        }
    }

    #[test]
    fn terminal_failures_carry_last_error() {
        assert_eq!(
            RunStatus::from_run(&run("failed", Some("model overloaded"))),
            RunStatus::Failed("model overloaded".to_owned())
        );
        assert_eq!(
            RunStatus::from_run(&run("expired", None)),
            RunStatus::Failed("analysis run expired".to_owned())
        );
    }

    #[test]
    fn assistant_text_skips_user_messages_and_non_text_parts() {
        let list: MessageList = serde_json::from_value(serde_json::json!({
            "data": [
                { "role": "user", "content": [{ "type": "text", "text": { "value": "question" } }] },
                { "role": "assistant", "content": [
                    { "type": "image_file" },
                    { "type": "text", "text": { "value": "{\"summary\":\"ok\"}" } }
                ] }
            ]
        }))
        .unwrap();
        assert_eq!(list.assistant_text(), Some("{\"summary\":\"ok\"}"));
    }
}
