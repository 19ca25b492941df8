//! Summon aggregation.
//!
//! Runs after the multi-pass resolver, projecting ally/pet stat blocks
//! from the resolved statistic values (shared-pool and per-unit modes) or
//! from fully independent formulas (item- and set-level declarations).
//!
//! Shared-pool convention: the declared share is the *total* pool, split
//! evenly across the pack - four units sharing 50% of `vit = 1000` get
//! 125 each. Per-unit mode gives every unit the full declared share,
//! unscaled by count.

use crate::active::ActiveSet;
use crate::catalog::SummonSpec;
use crate::context::EvalContext;
use crate::expr::ExprCache;
use crate::key::{EntityId, StatKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One aggregated summon block, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSummon {
    /// The entity whose declaration produced this block.
    pub source: EntityId,
    pub source_name: String,
    /// Display name, after selection-level naming overrides.
    pub name: String,
    #[serde(default)]
    pub unit_name: String,
    /// Number of units; formula-driven, floored, always at least 1 here
    /// (zero-or-negative counts contribute nothing at all).
    pub count: u32,
    /// The declared share for owner-derived modes; `None` for
    /// independent declarations.
    #[serde(default)]
    pub share_percent: Option<f64>,
    /// Projected per-unit statistics.
    pub stats: BTreeMap<StatKey, f64>,
}

/// Aggregate every active summon declaration.
///
/// `ctx` is the final-pass context: resolved statistic values, config
/// variables, and the query host. `flat_bonus` is the resolved value of
/// the catalog's summon-bonus statistic, added uniformly to every
/// projected stat of every unit.
pub(crate) fn compute_active_summons(
    active: &ActiveSet<'_>,
    cache: &mut ExprCache,
    ctx: &EvalContext<'_>,
    flat_bonus: f64,
) -> Vec<ActiveSummon> {
    let mut summons = Vec::new();
    let overrides = &active.selection().summon_names;

    for entry in active.entries() {
        for spec in &entry.entity.summons {
            let Some(mut summon) = project(spec, cache, ctx, flat_bonus) else {
                continue;
            };
            if let Some(name) = overrides.get(spec.name()) {
                summon.name = name.clone();
            }
            summon.source = entry.entity.id.clone();
            summon.source_name = entry.entity.name.clone();
            summons.push(summon);
        }
    }
    summons
}

fn unit_count(formula: &str, cache: &mut ExprCache, ctx: &EvalContext<'_>) -> Option<u32> {
    let count = cache.eval(formula, ctx).floor();
    if count < 1.0 {
        None
    } else {
        Some(count as u32)
    }
}

fn project(
    spec: &SummonSpec,
    cache: &mut ExprCache,
    ctx: &EvalContext<'_>,
    flat_bonus: f64,
) -> Option<ActiveSummon> {
    match spec {
        SummonSpec::SharedPool {
            name,
            unit_name,
            count,
            share,
            stats,
        } => {
            let units = unit_count(count, cache, ctx)?;
            let share = cache.eval(share, ctx);
            let projected = stats
                .iter()
                .map(|key| {
                    let owner = ctx.var(key.as_str());
                    let per_unit = owner * share / 100.0 / units as f64;
                    (key.clone(), per_unit + flat_bonus)
                })
                .collect();
            Some(ActiveSummon {
                source: EntityId::new(""),
                source_name: String::new(),
                name: name.clone(),
                unit_name: unit_name.clone(),
                count: units,
                share_percent: Some(share),
                stats: projected,
            })
        }
        SummonSpec::PerUnit {
            name,
            unit_name,
            count,
            share,
            stats,
        } => {
            let units = unit_count(count, cache, ctx)?;
            let share = cache.eval(share, ctx);
            let projected = stats
                .iter()
                .map(|key| {
                    let owner = ctx.var(key.as_str());
                    (key.clone(), owner * share / 100.0 + flat_bonus)
                })
                .collect();
            Some(ActiveSummon {
                source: EntityId::new(""),
                source_name: String::new(),
                name: name.clone(),
                unit_name: unit_name.clone(),
                count: units,
                share_percent: Some(share),
                stats: projected,
            })
        }
        SummonSpec::Independent {
            name,
            unit_name,
            condition,
            count,
            stats,
        } => {
            if let Some(condition) = condition {
                if !cache.eval_condition(condition, ctx) {
                    return None;
                }
            }
            let units = unit_count(count, cache, ctx)?;
            let projected = stats
                .iter()
                .map(|(key, formula)| (key.clone(), cache.eval(formula, ctx) + flat_bonus))
                .collect();
            Some(ActiveSummon {
                source: EntityId::new(""),
                source_name: String::new(),
                name: name.clone(),
                unit_name: unit_name.clone(),
                count: units,
                share_percent: None,
                stats: projected,
            })
        }
    }
}
