use super::{GuardRule, RuleContext, Verdict};
use crate::engine::events::{CanonicalEvent, HookPhase};
use crate::state::{CounterRecord, StateChange, StateKey};
use crate::Result;

/// Session-scoped tool call counter
pub const TOOL_COUNT_CONCERN: &str = "tool-count";

/// Suggestions repeat every this many calls past the threshold
const REPEAT_INTERVAL: u64 = 25;

/// Counts tool calls and suggests `/compact` at logical intervals
pub struct CompactSuggester;

impl CompactSuggester {
    fn should_suggest(count: u64, threshold: u64) -> bool {
        threshold > 0
            && (count == threshold || (count > threshold && count % REPEAT_INTERVAL == 0))
    }
}

impl GuardRule for CompactSuggester {
    fn name(&self) -> &'static str {
        "compact-suggester"
    }

    fn applies_to(&self, event: &CanonicalEvent, ctx: &RuleContext) -> bool {
        event.phase == HookPhase::PreAction
            && event.tool_name.is_some()
            && !ctx.config.disabled.suggest_compact
    }

    fn evaluate(&self, event: &CanonicalEvent, ctx: &RuleContext) -> Result<Verdict> {
        let key = StateKey::session_or_project(ctx.session_id(event), TOOL_COUNT_CONCERN);
        let mut record: CounterRecord = ctx.store.load(&key);
        record.count += 1;

        let threshold = ctx.config.compact_threshold;
        let cooldown = ctx.config.compact_cooldown_ms;
        let last = record.last_suggested_at_epoch_ms;
        let cooling_down =
            last != 0 && cooldown > 0 && ctx.now_ms.saturating_sub(last) < cooldown;

        let verdict = if Self::should_suggest(record.count, threshold) && !cooling_down {
            record.last_suggested_at_epoch_ms = ctx.now_ms;
            Verdict::warn(format!(
                "[StrategicCompact] {} tool calls (threshold={}) - consider /compact if \
                 you're transitioning phases",
                record.count, threshold
            ))
        } else {
            Verdict::allow()
        };

        Ok(verdict.with_change(StateChange::put(key, &record)?))
    }
}
