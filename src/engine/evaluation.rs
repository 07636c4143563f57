use crate::config::Config;
use crate::engine::decision::{Decision, RuleOutcome};
use crate::engine::events::{CanonicalEvent, HookPhase};
use crate::engine::rules::{changed_files_key, default_rules, GuardRule, RuleContext, Verdict};
use crate::state::{StateChange, StateStore};
use crate::tooling::SystemProbe;
use crate::Result;
use chrono::Utc;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, instrument, warn};

/// Runs the guard rule set against one event and reduces the outcomes
pub struct PolicyEvaluator {
    rules: Vec<Box<dyn GuardRule>>,
}

impl PolicyEvaluator {
    /// Evaluator over an explicit rule list, kept in the given order
    pub fn new(rules: Vec<Box<dyn GuardRule>>) -> Self {
        Self { rules }
    }

    /// Evaluator over the built-in rule set
    pub fn with_default_rules() -> Result<Self> {
        Ok(Self::new(default_rules()?))
    }

    /// Rule names in evaluation order
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Normalize a raw hook payload and evaluate it against the real
    /// filesystem state, system probes and clock
    #[instrument(skip_all, fields(project = %config.project_dir.display()))]
    pub fn evaluate(&self, raw: &Value, config: &Config) -> Decision {
        self.evaluate_event(&CanonicalEvent::normalize(raw), config)
    }

    /// Like [`evaluate`](Self::evaluate), with the phase decided by the caller
    #[instrument(skip_all, fields(phase = ?phase))]
    pub fn evaluate_with_phase(&self, raw: &Value, phase: HookPhase, config: &Config) -> Decision {
        self.evaluate_event(&CanonicalEvent::normalize_with_phase(raw, phase), config)
    }

    fn evaluate_event(&self, event: &CanonicalEvent, config: &Config) -> Decision {
        let store = StateStore::new(&config.state_dir);
        let ctx = RuleContext {
            config,
            store: &store,
            probe: &SystemProbe,
            now_ms: now_epoch_ms(),
        };
        self.evaluate_in(event, &ctx)
    }

    /// Evaluate with a caller-supplied context.
    ///
    /// Every applicable rule runs against the same pre-evaluation state;
    /// their pending state changes are applied afterwards, in rule order.
    /// A Stop event also consumes the accumulated changed-file set.
    pub fn evaluate_in(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Decision {
        debug!(
            "Evaluating {:?} {:?} (tool: {:?})",
            event.phase, event.tool_kind, event.tool_name
        );

        let mut outcomes = Vec::new();
        let mut changes = Vec::new();
        for rule in &self.rules {
            if let Some(verdict) = run_rule(rule.as_ref(), event, ctx) {
                debug!("{} -> {:?}", rule.name(), verdict.outcome.action());
                outcomes.push(RuleOutcome {
                    rule: rule.name(),
                    outcome: verdict.outcome,
                });
                changes.extend(verdict.changes);
            }
        }

        if event.phase == HookPhase::Stop {
            changes.push(StateChange::remove(changed_files_key(ctx.session_id(event))));
        }

        let failed = ctx.store.apply_all(&changes);
        if failed > 0 {
            warn!("{} of {} state updates were not persisted", failed, changes.len());
        }

        let decision = Decision::reduce(&outcomes);
        debug!("Decision: {:?} from {:?}", decision.action, decision.rules);
        decision
    }
}

/// Evaluate one rule, failing open: an error or a panic inside the rule
/// counts as "did not apply"
fn run_rule(rule: &dyn GuardRule, event: &CanonicalEvent, ctx: &RuleContext) -> Option<Verdict> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        if rule.applies_to(event, ctx) {
            rule.evaluate(event, ctx).map(Some)
        } else {
            Ok(None)
        }
    }));

    match result {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(e)) => {
            warn!("Rule '{}' failed, allowing: {}", rule.name(), e);
            None
        }
        Err(_) => {
            warn!("Rule '{}' panicked, allowing", rule.name());
            None
        }
    }
}

fn now_epoch_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
