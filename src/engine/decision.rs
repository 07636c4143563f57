//! Outcomes produced by guard rules and their reduction into one decision

use serde::Serialize;

/// Exit status that tells the host to prevent the tool call
pub const BLOCK_EXIT_CODE: i32 = 2;

/// Severity of an outcome, ordered `Allow < Warn < Block`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Allow,
    Warn,
    Block,
}

/// Result of evaluating one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Allow,
    Warn { message: String },
    Block { message: String },
}

impl Outcome {
    pub fn warn(message: impl Into<String>) -> Self {
        Outcome::Warn {
            message: message.into(),
        }
    }

    pub fn block(message: impl Into<String>) -> Self {
        Outcome::Block {
            message: message.into(),
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Outcome::Allow => Action::Allow,
            Outcome::Warn { .. } => Action::Warn,
            Outcome::Block { .. } => Action::Block,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Allow => None,
            Outcome::Warn { message } | Outcome::Block { message } => Some(message),
        }
    }
}

/// An outcome tagged with the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub rule: &'static str,
    pub outcome: Outcome,
}

/// Final decision for one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub action: Action,
    /// Human-readable messages, in rule evaluation order
    pub messages: Vec<String>,
    /// Rules whose outcome contributed a message
    pub rules: Vec<&'static str>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            action: Action::Allow,
            messages: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Reduce rule outcomes by severity.
    ///
    /// A Block keeps only the blocking messages; a Warn keeps every warning
    /// in order; Allow carries no message.
    pub fn reduce(outcomes: &[RuleOutcome]) -> Self {
        let action = outcomes
            .iter()
            .map(|o| o.outcome.action())
            .max()
            .unwrap_or(Action::Allow);

        if action == Action::Allow {
            return Self::allow();
        }

        let (rules, messages) = outcomes
            .iter()
            .filter(|o| o.outcome.action() == action)
            .filter_map(|o| o.outcome.message().map(|m| (o.rule, m.to_string())))
            .unzip();

        Self {
            action,
            messages,
            rules,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.action == Action::Block
    }

    /// Process exit status for the host: 2 on Block, otherwise 0
    pub fn exit_code(&self) -> i32 {
        if self.is_blocking() {
            BLOCK_EXIT_CODE
        } else {
            0
        }
    }

    /// All messages joined for display
    pub fn message_text(&self) -> String {
        self.messages.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn outcome(rule: &'static str, outcome: Outcome) -> RuleOutcome {
        RuleOutcome { rule, outcome }
    }

    #[test]
    fn test_action_order() {
        assert!(Action::Block > Action::Warn);
        assert!(Action::Warn > Action::Allow);
    }

    #[test]
    fn test_reduce_empty_is_allow() {
        let decision = Decision::reduce(&[]);
        assert_eq!(decision, Decision::allow());
        assert_eq!(decision.exit_code(), 0);
    }

    #[test]
    fn test_block_keeps_only_block_messages() {
        let decision = Decision::reduce(&[
            outcome("a", Outcome::warn("careful")),
            outcome("b", Outcome::block("stop")),
            outcome("c", Outcome::Allow),
            outcome("d", Outcome::block("also stop")),
        ]);

        assert_eq!(decision.action, Action::Block);
        assert_eq!(decision.messages, vec!["stop", "also stop"]);
        assert_eq!(decision.rules, vec!["b", "d"]);
        assert_eq!(decision.exit_code(), 2);
    }

    #[test]
    fn test_warn_keeps_all_warnings_in_order() {
        let decision = Decision::reduce(&[
            outcome("a", Outcome::warn("first")),
            outcome("b", Outcome::Allow),
            outcome("c", Outcome::warn("second")),
        ]);

        assert_eq!(decision.action, Action::Warn);
        assert_eq!(decision.messages, vec!["first", "second"]);
        assert_eq!(decision.exit_code(), 0);
        assert_eq!(decision.message_text(), "first\n\nsecond");
    }
}
