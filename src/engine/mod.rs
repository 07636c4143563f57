//! The guard engine
//!
//! A hook payload flows through four stages:
//! - [`events`] normalizes the host's JSON into a [`CanonicalEvent`]
//! - [`rules`] holds the compiled guard rules, each deciding Allow, Warn or Block
//! - [`evaluation`] runs the applicable rules and persists their state changes
//! - [`decision`] reduces the outcomes; [`response`] renders them for the host

pub mod decision;
pub mod evaluation;
pub mod events;
pub mod response;
pub mod rules;

pub use decision::{Action, Decision, Outcome, RuleOutcome, BLOCK_EXIT_CODE};
pub use evaluation::PolicyEvaluator;
pub use events::{CanonicalEvent, HookPhase, ToolKind};
pub use response::{HookResponse, HookSpecificOutput};
pub use rules::{default_rules, GuardRule, RuleContext, Verdict};
