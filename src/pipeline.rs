//! The modifier pipeline for one statistic.
//!
//! Collects every active modifier targeting a statistic, sums the
//! evaluated values stage by stage, and folds the stages in fixed order.
//! Combination is stage-wide, not per-modifier: a multiplicative stage
//! sums its contributions before applying, so two +50% sources in one
//! stage give ×2.0, never a compounded ×2.25. Most specialization and
//! situational bonuses ride the secondary-percent stage and depend on
//! that summed-not-compounded behavior exactly.
//!
//! Overrides sit out of band: when any active override targets the
//! statistic, the first one in catalog declaration order replaces the
//! entire staged result. Per-turn modifiers bypass the fold into a
//! parallel flat/percent accumulator.

use crate::active::ActiveSet;
use crate::catalog::{Stage, StatDef};
use crate::context::EvalContext;
use crate::expr::ExprCache;
use crate::key::ModifierId;
use crate::resolved::{Contribution, PerTurn, StageBreakdown, StatResult};
use std::collections::BTreeMap;

/// Run the pipeline for one statistic against the current pass context.
///
/// Also records into `modifier_values` the evaluated value of *every*
/// well-formed modifier targeting the statistic - active or not - since
/// the display layer substitutes those values into rule text regardless
/// of activation.
pub(crate) fn compute_stat(
    def: &StatDef,
    active: &ActiveSet<'_>,
    cache: &mut ExprCache,
    ctx: &EvalContext<'_>,
    modifier_values: &mut BTreeMap<ModifierId, f64>,
) -> StatResult {
    let mut breakdown = StageBreakdown {
        base: def.base,
        ..Default::default()
    };
    let mut per_turn = PerTurn::default();
    let mut contributions = Vec::new();

    for entry in active.entries() {
        for modifier in &entry.modifiers {
            if modifier.target != def.key {
                continue;
            }

            let (value, error) = match cache.eval_checked(&modifier.value, ctx) {
                Ok(value) => (value, None),
                Err(err) => (0.0, Some(err.to_string())),
            };
            modifier_values.insert(modifier.id.clone(), value);

            if !active.modifier_active(modifier, cache, ctx) {
                continue;
            }

            contributions.push(Contribution {
                source: entry.entity.id.clone(),
                source_name: entry.entity.name.clone(),
                modifier: modifier.id.clone(),
                stage: modifier.stage,
                formula: modifier.value.clone(),
                value,
                per_turn: modifier.per_turn,
                error,
            });

            if modifier.per_turn {
                match modifier.stage {
                    Stage::Flat | Stage::SecondaryFlat | Stage::Override => {
                        per_turn.flat += value;
                    }
                    _ => per_turn.percent += value,
                }
                continue;
            }

            match modifier.stage {
                Stage::Flat => breakdown.flat += value,
                Stage::Percent => breakdown.percent += value,
                Stage::PrePosturePercent => breakdown.pre_posture_percent += value,
                Stage::PosturePercent => breakdown.posture_percent += value,
                Stage::SecondaryFlat => breakdown.secondary_flat += value,
                Stage::SecondaryPercent => breakdown.secondary_percent += value,
                // first active override in declaration order wins
                Stage::Override => {
                    if breakdown.override_value.is_none() {
                        breakdown.override_value = Some(value);
                    }
                }
            }
        }
    }

    let value = match breakdown.override_value {
        Some(forced) => forced,
        None => breakdown.compose(),
    };

    StatResult {
        key: def.key.clone(),
        label: def.label.clone(),
        group: def.group.clone(),
        base: def.base,
        value,
        breakdown,
        per_turn,
        contributions,
    }
}
