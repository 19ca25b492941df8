//! Evaluation context for formulas.
//!
//! An [`EvalContext`] carries everything a formula may read: the variable
//! map (resolved statistic values from the previous pass, the free-form
//! config values, and the current pass index), plus the [`QueryHost`] that
//! answers the helper functions. The evaluator resolves nothing else -
//! a name that is not in the variable map reads as `0.0`, and a call to
//! anything outside the helper allow-list never parses in the first place.

use crate::key::StatKey;
use std::cell::Cell;
use std::collections::HashMap;

/// Variable name under which the current pass index is exposed.
///
/// Catalog content uses it to gate modifiers off the seeding pass, e.g.
/// a condition of `pass >= 1`.
pub const PASS_VAR: &str = "pass";

/// Helper calls nested deeper than this degrade to `0.0`.
///
/// `sumItemStats` evaluates item formulas which may themselves call
/// helpers; the guard keeps hostile or accidental recursion from
/// overflowing the stack.
pub(crate) const MAX_HELPER_DEPTH: u8 = 8;

/// Answers the evaluator's helper-query functions.
///
/// Implemented by the active-entity snapshot so that every helper reads
/// the same entity set the current pass computes with. All methods are
/// counts or folds over that snapshot; none may fail.
pub trait QueryHost {
    /// `countItems(name)` - active entities matching a category id,
    /// subcategory, or tag.
    fn count_items(&self, name: &str) -> f64;

    /// `countCustomItems()` - active user-forged items.
    fn count_custom_items(&self) -> f64;

    /// `sumItemStats(name, stat)` - sum of the evaluated values of
    /// matching equipped items' modifiers targeting `stat`, excluding
    /// toggle-gated modifiers.
    fn sum_item_stats(&self, name: &str, stat: &str, ctx: &EvalContext<'_>) -> f64;

    /// `bestItemStat(name, stat)` - like `sum_item_stats` but the maximum.
    fn best_item_stat(&self, name: &str, stat: &str, ctx: &EvalContext<'_>) -> f64;

    /// `sumOriginalItemCost(name)` - sum of the pre-fusion cost attribute
    /// across matching equipped items.
    fn sum_original_item_cost(&self, name: &str) -> f64;

    /// `maxOriginalItemCost(name)` - maximum pre-fusion cost across
    /// matching equipped items.
    fn max_original_item_cost(&self, name: &str) -> f64;

    /// `countSet(id)` - equipped items belonging to the given item set.
    fn count_set(&self, id: &str) -> f64;

    /// `countFaction(id)` - equipped items belonging to the given faction.
    fn count_faction(&self, id: &str) -> f64;
}

/// A host that answers every query with zero.
///
/// Useful for evaluating formulas outside a computation, e.g. in the
/// algebra normalizer or in tests.
///
/// # Examples
///
/// ```rust
/// use buildstat::context::{EvalContext, NoQueries};
/// use buildstat::expr;
/// use std::collections::HashMap;
///
/// let vars = HashMap::new();
/// let ctx = EvalContext::with_host(&vars, &NoQueries);
/// assert_eq!(expr::evaluate("countItems(weapon) + 3", &ctx), 3.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQueries;

impl QueryHost for NoQueries {
    fn count_items(&self, _name: &str) -> f64 {
        0.0
    }

    fn count_custom_items(&self) -> f64 {
        0.0
    }

    fn sum_item_stats(&self, _name: &str, _stat: &str, _ctx: &EvalContext<'_>) -> f64 {
        0.0
    }

    fn best_item_stat(&self, _name: &str, _stat: &str, _ctx: &EvalContext<'_>) -> f64 {
        0.0
    }

    fn sum_original_item_cost(&self, _name: &str) -> f64 {
        0.0
    }

    fn max_original_item_cost(&self, _name: &str) -> f64 {
        0.0
    }

    fn count_set(&self, _id: &str) -> f64 {
        0.0
    }

    fn count_faction(&self, _id: &str) -> f64 {
        0.0
    }
}

/// The read-only context a formula evaluates against.
///
/// Borrows the variable map and the query host for the duration of one
/// evaluation; nothing is owned, nothing is mutated apart from the
/// internal helper-depth counter.
///
/// # Examples
///
/// ```rust
/// use buildstat::context::EvalContext;
/// use buildstat::{expr, StatKey};
/// use std::collections::HashMap;
///
/// let mut vars = HashMap::new();
/// vars.insert(StatKey::new("vit"), 120.0);
///
/// let ctx = EvalContext::new(&vars);
/// assert_eq!(ctx.var("vit"), 120.0);
/// assert_eq!(ctx.var("unset"), 0.0);
/// assert_eq!(expr::evaluate("vit / 2", &ctx), 60.0);
/// ```
pub struct EvalContext<'a> {
    vars: &'a HashMap<StatKey, f64>,
    host: Option<&'a dyn QueryHost>,
    depth: Cell<u8>,
}

impl<'a> EvalContext<'a> {
    /// Create a context over a variable map, with no query host.
    ///
    /// Helper calls evaluate to `0.0`.
    pub fn new(vars: &'a HashMap<StatKey, f64>) -> Self {
        Self {
            vars,
            host: None,
            depth: Cell::new(0),
        }
    }

    /// Create a context over a variable map and a query host.
    pub fn with_host(vars: &'a HashMap<StatKey, f64>, host: &'a dyn QueryHost) -> Self {
        Self {
            vars,
            host: Some(host),
            depth: Cell::new(0),
        }
    }

    /// Look up a variable; missing names read as `0.0`.
    pub fn var(&self, name: &str) -> f64 {
        self.vars.get(&StatKey::new(name)).copied().unwrap_or(0.0)
    }

    /// The query host, if any.
    pub fn host(&self) -> Option<&'a dyn QueryHost> {
        self.host
    }

    /// Enter a helper call; returns `false` when the depth guard trips.
    pub(crate) fn enter_helper(&self) -> bool {
        let d = self.depth.get();
        if d >= MAX_HELPER_DEPTH {
            return false;
        }
        self.depth.set(d + 1);
        true
    }

    /// Leave a helper call entered with [`EvalContext::enter_helper`].
    pub(crate) fn leave_helper(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}
