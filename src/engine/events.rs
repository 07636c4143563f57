use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

/// Field aliases tried in order for the tool identifier
const TOOL_NAME_KEYS: &[&str] = &["tool_name", "tool", "toolName"];

/// Containers that may hold the tool's input parameters
const TOOL_INPUT_KEYS: &[&str] = &["tool_input", "toolInput"];

const COMMAND_KEYS: &[&str] = &["command", "cmd", "shell_command"];

const FILE_PATH_KEYS: &[&str] = &["file_path", "filePath", "path"];

/// Containers that may hold the tool's output
const OUTPUT_KEYS: &[&str] = &[
    "tool_response",
    "toolResponse",
    "tool_output",
    "toolOutput",
    "output",
];

/// Primary output fields inside an output object
const STDOUT_KEYS: &[&str] = &["stdout", "Stdout", "out", "output", "text"];

/// Secondary output fields, appended after a newline
const STDERR_KEYS: &[&str] = &["stderr", "Stderr", "err"];

const SESSION_KEYS: &[&str] = &["session_id", "sessionId", "conversation_id"];

const EVENT_NAME_KEYS: &[&str] = &["hook_event_name", "hookEventName"];

/// What kind of tool the agent invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToolKind {
    ShellCommand,
    FileWrite,
    FileEdit,
    MultiFileEdit,
    Unknown,
}

impl ToolKind {
    pub fn from_tool_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "bash" | "shell" => ToolKind::ShellCommand,
            "write" => ToolKind::FileWrite,
            "edit" => ToolKind::FileEdit,
            "multiedit" => ToolKind::MultiFileEdit,
            _ => ToolKind::Unknown,
        }
    }

    /// Write, Edit and MultiEdit
    pub fn is_file_mutation(&self) -> bool {
        matches!(
            self,
            ToolKind::FileWrite | ToolKind::FileEdit | ToolKind::MultiFileEdit
        )
    }
}

/// When in the tool call lifecycle the hook fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HookPhase {
    /// Before the tool runs; the only phase that can block
    PreAction,
    /// After the tool ran; output may be available
    PostAction,
    /// The agent finished responding or the session ended
    Stop,
}

impl HookPhase {
    /// Map a host event name onto a phase
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pretooluse" | "beforeshellexecution" | "beforemcpexecution" | "beforereadfile" => {
                Some(HookPhase::PreAction)
            }
            "posttooluse" | "aftershellexecution" | "afterfileedit" | "aftermcpexecution" => {
                Some(HookPhase::PostAction)
            }
            "stop" | "subagentstop" | "sessionend" => Some(HookPhase::Stop),
            _ => None,
        }
    }
}

/// Alias-resolved view of one inbound hook event.
///
/// Only the fields relevant to `tool_kind` are populated: `command_text`
/// for shell commands, `file_path` for file mutations. `output_text` is
/// only set for post-action events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalEvent {
    pub phase: HookPhase,
    pub tool_kind: ToolKind,
    /// Tool name as sent by the host, for logs
    pub tool_name: Option<String>,
    pub session_id: Option<String>,
    pub command_text: Option<String>,
    pub file_path: Option<String>,
    pub output_text: Option<String>,
}

impl CanonicalEvent {
    /// Normalize a raw event. Never fails: anything unrecognized degrades to
    /// `Unknown` and absent fields.
    pub fn normalize(raw: &Value) -> Self {
        Self::build(raw, None)
    }

    /// Normalize with a phase chosen by the caller
    pub fn normalize_with_phase(raw: &Value, phase: HookPhase) -> Self {
        Self::build(raw, Some(phase))
    }

    fn build(raw: &Value, forced_phase: Option<HookPhase>) -> Self {
        let empty = Map::new();
        let root = raw.as_object().unwrap_or(&empty);
        let input = first_object(root, TOOL_INPUT_KEYS);

        let event_name = first_string(root, EVENT_NAME_KEYS);
        let tool_name = first_string(root, TOOL_NAME_KEYS);

        let mut tool_kind = tool_name
            .as_deref()
            .map(ToolKind::from_tool_name)
            .unwrap_or(ToolKind::Unknown);
        if tool_name.is_none() {
            // Some hosts name the event after the tool family instead
            tool_kind = event_name
                .as_deref()
                .map(kind_from_event_name)
                .unwrap_or(ToolKind::Unknown);
        }

        let output_text = extract_output(root);
        let phase = forced_phase
            .or_else(|| event_name.as_deref().and_then(HookPhase::from_event_name))
            .unwrap_or(if output_text.is_some() {
                HookPhase::PostAction
            } else {
                HookPhase::PreAction
            });

        let command_text = match tool_kind {
            ToolKind::ShellCommand => lookup_nested(input, root, COMMAND_KEYS),
            _ => None,
        };
        let file_path = if tool_kind.is_file_mutation() {
            lookup_nested(input, root, FILE_PATH_KEYS)
        } else {
            None
        };
        let output_text = match phase {
            HookPhase::PostAction => output_text,
            _ => None,
        };

        let event = Self {
            phase,
            tool_kind,
            tool_name,
            session_id: first_string(root, SESSION_KEYS),
            command_text,
            file_path,
            output_text,
        };
        trace!("Normalized event: {:?}", event);
        event
    }

    /// Command text with whitespace runs collapsed, for pattern matching
    pub fn normalized_command(&self) -> Option<String> {
        self.command_text
            .as_deref()
            .map(collapse_whitespace)
            .filter(|c| !c.is_empty())
    }
}

/// Collapse consecutive whitespace into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn kind_from_event_name(name: &str) -> ToolKind {
    match name.trim().to_ascii_lowercase().as_str() {
        "beforeshellexecution" | "aftershellexecution" => ToolKind::ShellCommand,
        "afterfileedit" => ToolKind::FileEdit,
        _ => ToolKind::Unknown,
    }
}

fn first_object<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    keys.iter().find_map(|key| map.get(*key).and_then(Value::as_object))
}

/// First alias holding a non-blank string
fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Look inside the tool input object first, then at the top level
fn lookup_nested(
    input: Option<&Map<String, Value>>,
    root: &Map<String, Value>,
    keys: &[&str],
) -> Option<String> {
    input
        .and_then(|input| first_string(input, keys))
        .or_else(|| first_string(root, keys))
}

fn extract_output(root: &Map<String, Value>) -> Option<String> {
    OUTPUT_KEYS
        .iter()
        .filter_map(|key| root.get(*key))
        .find_map(output_text_of)
}

fn output_text_of(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Object(map) => {
            let primary = first_string(map, STDOUT_KEYS);
            let secondary = first_string(map, STDERR_KEYS);
            match (primary, secondary) {
                (None, None) => value.to_string(),
                (primary, secondary) => [primary, secondary]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join("\n")
                    .trim()
                    .to_string(),
            }
        }
        other => other.to_string(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
