//! JSON hook responses for hosts that read structured output on stdout

use crate::engine::decision::{Action, Decision};
use crate::engine::events::HookPhase;
use serde::{Deserialize, Serialize};

/// Hook-specific output for different event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hookEventName")]
pub enum HookSpecificOutput {
    #[serde(rename = "PreToolUse")]
    PreToolUse {
        #[serde(rename = "permissionDecision")]
        permission_decision: String, // "allow" | "deny"
        #[serde(rename = "permissionDecisionReason", skip_serializing_if = "Option::is_none")]
        permission_decision_reason: Option<String>,
    },
    #[serde(rename = "PostToolUse")]
    PostToolUse {
        #[serde(rename = "additionalContext", skip_serializing_if = "Option::is_none")]
        additional_context: Option<String>,
    },
}

/// Structured response mirroring a [`Decision`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookResponse {
    /// Whether the agent should continue after the hook
    #[serde(rename = "continue", skip_serializing_if = "Option::is_none")]
    pub continue_execution: Option<bool>,

    /// Message shown when continue is false
    #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,

    /// Warning surfaced to the user without affecting the tool call
    #[serde(rename = "systemMessage", skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,

    #[serde(rename = "hookSpecificOutput", skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookResponse {
    /// An empty response (allows by default)
    pub fn empty() -> Self {
        Self {
            continue_execution: None,
            stop_reason: None,
            system_message: None,
            hook_specific_output: None,
        }
    }

    pub fn from_decision(decision: &Decision, phase: HookPhase) -> Self {
        let text = (!decision.messages.is_empty()).then(|| decision.message_text());
        let mut response = Self::empty();

        match phase {
            HookPhase::PreAction => {
                let permission = match decision.action {
                    Action::Block => "deny",
                    Action::Warn | Action::Allow => "allow",
                };
                response.hook_specific_output = Some(HookSpecificOutput::PreToolUse {
                    permission_decision: permission.to_string(),
                    permission_decision_reason: text.clone(),
                });
                if decision.action == Action::Warn {
                    response.system_message = text;
                }
            }
            HookPhase::PostAction => {
                if text.is_some() {
                    response.hook_specific_output = Some(HookSpecificOutput::PostToolUse {
                        additional_context: text.clone(),
                    });
                }
                response.system_message = text;
            }
            HookPhase::Stop => {
                response.system_message = text;
            }
        }

        response
    }
}
