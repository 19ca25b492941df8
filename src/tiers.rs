//! Set and faction bonus tiers.
//!
//! An item set (or a legacy faction carrying modifiers) declares its
//! bonuses as conditioned modifiers and text blocks, each gated on an
//! equipped-piece count (`countSet(ember_set) >= 3`). This module groups
//! them by the threshold parsed out of each condition and evaluates which
//! tiers the real equipped count activates, producing the
//! threshold-ascending list the display layer renders.
//!
//! Invoked on demand for the set being inspected, not on every recompute.

use crate::active::ActiveSet;
use crate::catalog::TierText;
use crate::context::EvalContext;
use crate::expr::{BinOp, Expr, ExprCache};
use crate::key::{EntityId, ModifierId, StatKey};
use crate::resolver::Engine;
use crate::selection::BuildSelection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A modifier listed under one tier, with its display-ready value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierModifier {
    pub modifier: ModifierId,
    pub target: StatKey,
    pub formula: String,
    pub value: f64,
}

/// One activation threshold within a set or faction bonus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetTier {
    /// Required equipped-piece count.
    pub threshold: u32,
    /// Whether the real equipped count activates this tier.
    pub active: bool,
    /// The tier's modifiers, zero-valued ones skipped.
    pub modifiers: Vec<TierModifier>,
    /// The tier's descriptive text blocks.
    pub texts: Vec<String>,
}

impl Engine {
    /// Group a set's (or faction's) bonuses into display tiers.
    ///
    /// Unknown entity ids produce an empty list. Activation evaluates
    /// each entry's real condition against the selection's equipped
    /// items; the parsed threshold is only the grouping and ordering
    /// key. Entries with no condition (or no recognizable piece-count
    /// comparison) land in the always-on tier at threshold 1.
    pub fn set_tiers(&mut self, set_id: &EntityId, selection: &BuildSelection) -> Vec<SetTier> {
        let (catalog, cache) = self.parts();
        let Some(set) = catalog.entity(set_id) else {
            return Vec::new();
        };
        let active = ActiveSet::collect(catalog, selection);

        // display-time context: seeded defaults plus configs; set-bonus
        // formulas are constants or config-driven in authored content
        let mut vars: std::collections::HashMap<StatKey, f64> = catalog
            .stats
            .iter()
            .map(|def| (def.key.clone(), def.base))
            .collect();
        vars.extend(selection.config_vars());
        let ctx = EvalContext::with_host(&vars, &active);

        let mut tiers: BTreeMap<u32, SetTier> = BTreeMap::new();

        for modifier in set.modifiers.iter().filter(|m| m.is_well_formed()) {
            let (threshold, met) = classify(modifier.condition.as_deref(), cache, &ctx);
            let value = cache.eval(&modifier.value, &ctx);
            let tier = tiers.entry(threshold).or_insert_with(|| SetTier {
                threshold,
                active: false,
                modifiers: Vec::new(),
                texts: Vec::new(),
            });
            tier.active |= met;
            if value != 0.0 {
                tier.modifiers.push(TierModifier {
                    modifier: modifier.id.clone(),
                    target: modifier.target.clone(),
                    formula: modifier.value.clone(),
                    value,
                });
            }
        }

        for TierText { text, condition } in &set.tier_texts {
            let (threshold, met) = classify(condition.as_deref(), cache, &ctx);
            let tier = tiers.entry(threshold).or_insert_with(|| SetTier {
                threshold,
                active: false,
                modifiers: Vec::new(),
                texts: Vec::new(),
            });
            tier.active |= met;
            tier.texts.push(text.clone());
        }

        tiers.into_values().collect()
    }
}

/// Threshold and activation of one conditioned entry.
fn classify(
    condition: Option<&str>,
    cache: &mut ExprCache,
    ctx: &EvalContext<'_>,
) -> (u32, bool) {
    let Some(condition) = condition else {
        return (1, true);
    };
    let threshold = cache
        .parse(condition)
        .ok()
        .and_then(|expr| piece_threshold(&expr))
        .unwrap_or(1);
    (threshold, cache.eval_condition(condition, ctx))
}

/// Extract the piece-count threshold from a condition: the integer
/// literal of the first comparison found, normalized so that strict
/// comparisons report the first satisfying count (`> 2` means 3 pieces).
fn piece_threshold(expr: &Expr) -> Option<u32> {
    match expr {
        Expr::Binary(op, lhs, rhs) => match (op, lhs.as_ref(), rhs.as_ref()) {
            (BinOp::Ge | BinOp::Eq, _, Expr::Number(n)) => as_count(*n),
            (BinOp::Gt, _, Expr::Number(n)) => as_count(*n).map(|c| c + 1),
            (BinOp::Le | BinOp::Eq, Expr::Number(n), _) => as_count(*n),
            (BinOp::Lt, Expr::Number(n), _) => as_count(*n).map(|c| c + 1),
            _ => piece_threshold(lhs).or_else(|| piece_threshold(rhs)),
        },
        Expr::Unary(_, inner) => piece_threshold(inner),
        Expr::Ternary(cond, then, otherwise) => piece_threshold(cond)
            .or_else(|| piece_threshold(then))
            .or_else(|| piece_threshold(otherwise)),
        _ => None,
    }
}

fn as_count(n: f64) -> Option<u32> {
    if n >= 0.0 && n.fract() == 0.0 {
        Some(n as u32)
    } else {
        None
    }
}
