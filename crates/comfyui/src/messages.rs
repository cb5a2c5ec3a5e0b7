//! ComfyUI WebSocket message types.
//!
//! ComfyUI sends JSON text frames shaped `{"type": "<kind>", "data": {...}}`
//! plus binary preview frames, which callers ignore.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ComfyUIMessage {
    #[serde(rename = "status")]
    Status(StatusData),

    #[serde(rename = "execution_start")]
    ExecutionStart(PromptRef),

    #[serde(rename = "execution_cached")]
    ExecutionCached(ExecutionCachedData),

    /// `node: None` means the prompt finished.
    #[serde(rename = "executing")]
    Executing(ExecutingData),

    #[serde(rename = "progress")]
    Progress(ProgressData),

    #[serde(rename = "executed")]
    Executed(ExecutedData),

    /// Sent by newer servers after the last node of a prompt.
    #[serde(rename = "execution_success")]
    ExecutionSuccess(PromptRef),

    #[serde(rename = "execution_error")]
    ExecutionError(ErrorData),

    #[serde(rename = "execution_interrupted")]
    ExecutionInterrupted(PromptRef),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusData {
    pub status: QueueStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueStatus {
    pub exec_info: ExecInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecInfo {
    pub queue_remaining: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptRef {
    pub prompt_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionCachedData {
    pub prompt_id: String,
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutingData {
    pub node: Option<String>,
    /// Absent on some server versions for the idle broadcast.
    #[serde(default)]
    pub prompt_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressData {
    pub value: i32,
    pub max: i32,
    #[serde(default)]
    pub prompt_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutedData {
    pub node: String,
    pub output: serde_json::Value,
    pub prompt_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorData {
    pub prompt_id: String,
    pub node_id: String,
    pub exception_message: String,
    pub exception_type: String,
}

/// Returns `Err` for malformed JSON or unknown `type` values; callers skip
/// those and keep reading.
pub fn parse_message(text: &str) -> Result<ComfyUIMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// How a prompt ended, as far as the WebSocket stream tells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Failed {
        node_id: String,
        exception_type: String,
        message: String,
    },
    Interrupted,
}

impl ComfyUIMessage {
    /// Terminal outcome of `prompt_id` carried by this message, if any.
    pub fn completion_for(&self, prompt_id: &str) -> Option<Completion> {
        match self {
            Self::Executing(data)
                if data.node.is_none() && data.prompt_id.as_deref() == Some(prompt_id) =>
            {
                Some(Completion::Finished)
            }
            Self::ExecutionSuccess(data) if data.prompt_id == prompt_id => {
                Some(Completion::Finished)
            }
            Self::ExecutionError(data) if data.prompt_id == prompt_id => Some(Completion::Failed {
                node_id: data.node_id.clone(),
                exception_type: data.exception_type.clone(),
                message: data.exception_message.clone(),
            }),
            Self::ExecutionInterrupted(data) if data.prompt_id == prompt_id => {
                Some(Completion::Interrupted)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_message() {
        let json = r#"{"type":"status","data":{"status":{"exec_info":{"queue_remaining":3}}}}"#;
        match parse_message(json).unwrap() {
            ComfyUIMessage::Status(data) => assert_eq!(data.status.exec_info.queue_remaining, 3),
            other => panic!("Expected Status, got {other:?}"),
        }
    }

    #[test]
    fn executing_null_node_finishes_matching_prompt_only() {
        let msg = parse_message(r#"{"type":"executing","data":{"node":null,"prompt_id":"xyz"}}"#)
            .unwrap();
        assert_eq!(msg.completion_for("xyz"), Some(Completion::Finished));
        assert_eq!(msg.completion_for("other"), None);
    }

    #[test]
    fn executing_a_node_is_not_terminal() {
        let msg = parse_message(r#"{"type":"executing","data":{"node":"42","prompt_id":"xyz"}}"#)
            .unwrap();
        assert_eq!(msg.completion_for("xyz"), None);
    }

    #[test]
    fn execution_error_carries_details() {
        let json = r#"{"type":"execution_error","data":{"prompt_id":"abc","node_id":"5","exception_message":"out of memory","exception_type":"RuntimeError"}}"#;
        let msg = parse_message(json).unwrap();
        assert_eq!(
            msg.completion_for("abc"),
            Some(Completion::Failed {
                node_id: "5".into(),
                exception_type: "RuntimeError".into(),
                message: "out of memory".into(),
            })
        );
    }

    #[test]
    fn interrupted_and_success_are_terminal() {
        let interrupted =
            parse_message(r#"{"type":"execution_interrupted","data":{"prompt_id":"p"}}"#).unwrap();
        assert_eq!(interrupted.completion_for("p"), Some(Completion::Interrupted));
        let success =
            parse_message(r#"{"type":"execution_success","data":{"prompt_id":"p"}}"#).unwrap();
        assert_eq!(success.completion_for("p"), Some(Completion::Finished));
    }

    #[test]
    fn progress_without_prompt_id_parses() {
        let msg = parse_message(r#"{"type":"progress","data":{"value":5,"max":20}}"#).unwrap();
        assert!(matches!(msg, ComfyUIMessage::Progress(ProgressData { value: 5, max: 20, .. })));
    }

    #[test]
    fn unknown_type_and_garbage_are_errors() {
        assert!(parse_message(r#"{"type":"unknown_thing","data":{}}"#).is_err());
        assert!(parse_message("not json at all").is_err());
    }
}
