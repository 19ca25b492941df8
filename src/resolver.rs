//! The multi-pass engine.
//!
//! [`Engine::compute`] is the single synchronous entry point: it turns a
//! (catalog, selection) pair into a [`Computation`]. Statistics may read
//! other statistics, so the full pipeline runs [`PASS_COUNT`] times; each
//! pass evaluates formulas against the previous pass's value map, with
//! the pass index exposed as the ordinary variable `pass` so content can
//! gate itself off the seeding pass.
//!
//! There is deliberately no fixpoint detection and no dependency graph.
//! Authored content is written against this exact pass count and timing;
//! a "smarter" topological solver would silently change results for
//! existing catalogs. The fixed pass count is the contract.

use crate::active::ActiveSet;
use crate::catalog::Catalog;
use crate::context::{EvalContext, PASS_VAR};
use crate::expr::ExprCache;
use crate::key::StatKey;
use crate::pipeline;
use crate::resolved::{Computation, StatResult};
use crate::selection::BuildSelection;
use crate::summon;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Fixed number of pipeline passes.
///
/// Pass 0 computes against the seeded defaults; two more passes settle
/// every cross-statistic reference present in authored content. Content
/// that must not read an unsettled value gates itself with `pass >= 1`.
pub const PASS_COUNT: u32 = 3;

/// The rules-evaluation engine.
///
/// Owns the immutable catalog plus the formula parse cache. Holds no
/// result state between computations - `compute` is a pure function of
/// (catalog, selection) apart from the cache, which only affects
/// wall-clock time.
///
/// # Examples
///
/// ```rust
/// use buildstat::catalog::{Catalog, Entity, EntityKind, Modifier, Stage, StatDef};
/// use buildstat::{BuildSelection, Engine};
///
/// let catalog = Catalog::new(
///     vec![Entity::new("human", EntityKind::Race, "Human")
///         .with_modifier(Modifier::new("human_vit", "vit", "20", Stage::Flat))],
///     vec![StatDef::new("vit").with_base(100.0)],
/// );
/// let mut engine = Engine::new(catalog);
///
/// let mut selection = BuildSelection::new();
/// selection.choose("human");
///
/// let computation = engine.compute(&selection);
/// assert_eq!(computation.value(&"vit".into()), 120.0);
/// ```
pub struct Engine {
    catalog: Catalog,
    cache: ExprCache,
}

impl Engine {
    /// Create an engine over a loaded catalog.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            cache: ExprCache::new(),
        }
    }

    /// The catalog this engine computes against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The formula parse cache (diagnostics; see [`ExprCache::len`]).
    pub fn cache(&self) -> &ExprCache {
        &self.cache
    }

    pub(crate) fn parts(&mut self) -> (&Catalog, &mut ExprCache) {
        (&self.catalog, &mut self.cache)
    }

    /// Run one full computation for the given selection.
    ///
    /// Never fails: formula errors degrade to safe fallbacks and
    /// malformed catalog entries are skipped, so the result is always a
    /// best-effort complete set.
    pub fn compute(&mut self, selection: &BuildSelection) -> Computation {
        let started = Instant::now();
        let (catalog, cache) = (&self.catalog, &mut self.cache);
        let active = ActiveSet::collect(catalog, selection);

        // pass 0 seeds every statistic at its declared default
        let mut values: HashMap<StatKey, f64> = catalog
            .stats
            .iter()
            .map(|def| (def.key.clone(), def.base))
            .collect();

        let mut results: BTreeMap<StatKey, StatResult> = BTreeMap::new();
        let mut modifier_values = BTreeMap::new();

        for pass in 0..PASS_COUNT {
            let pass_started = Instant::now();
            let vars = pass_vars(&values, selection, pass as f64);
            let ctx = EvalContext::with_host(&vars, &active);

            results.clear();
            let mut next = HashMap::with_capacity(catalog.stats.len());
            for def in &catalog.stats {
                let result =
                    pipeline::compute_stat(def, &active, cache, &ctx, &mut modifier_values);
                next.insert(def.key.clone(), result.value);
                results.insert(def.key.clone(), result);
            }
            values = next;
            debug!(
                "pass {pass}: {} stats in {:?}",
                catalog.stats.len(),
                pass_started.elapsed()
            );
        }

        // summons read the settled values through the final pass context
        let vars = pass_vars(&values, selection, (PASS_COUNT - 1) as f64);
        let ctx = EvalContext::with_host(&vars, &active);

        // modifiers aimed at undefined statistics never ran through the
        // pipeline; the template-substitution map still wants their values
        for entry in active.entries() {
            for modifier in &entry.modifiers {
                if !modifier_values.contains_key(&modifier.id) {
                    let value = cache.eval(&modifier.value, &ctx);
                    modifier_values.insert(modifier.id.clone(), value);
                }
            }
        }
        let flat_bonus = catalog
            .summon_bonus_stat
            .as_ref()
            .and_then(|key| values.get(key).copied())
            .unwrap_or(0.0);
        let summons = summon::compute_active_summons(&active, cache, &ctx, flat_bonus);

        let elapsed = started.elapsed();
        debug!(
            "computation: {} stats, {} summons, {} formulas cached, {elapsed:?}",
            results.len(),
            summons.len(),
            cache.len()
        );

        Computation {
            stats: results,
            modifier_values,
            summons,
            passes: PASS_COUNT,
            elapsed,
        }
    }
}

/// Assemble the variable map for one pass: the previous pass's statistic
/// values, the selection's config values, and the pass index.
fn pass_vars(
    values: &HashMap<StatKey, f64>,
    selection: &BuildSelection,
    pass: f64,
) -> HashMap<StatKey, f64> {
    let mut vars = values.clone();
    vars.extend(selection.config_vars());
    vars.insert(StatKey::new(PASS_VAR), pass);
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Entity, EntityKind, Modifier, Stage, StatDef};

    #[test]
    fn test_forward_reference_settles() {
        // amp feeds power; power's bonus reads amp and skips pass 0
        let catalog = Catalog::new(
            vec![Entity::new("rules", EntityKind::GlobalRule, "Rules")
                .with_modifier(Modifier::new("amp_up", "amp", "25", Stage::Flat))
                .with_modifier(
                    Modifier::new("power_from_amp", "power", "amp * 2", Stage::Flat)
                        .with_condition("pass >= 1"),
                )],
            vec![StatDef::new("amp"), StatDef::new("power").with_base(10.0)],
        );
        let mut engine = Engine::new(catalog);
        let computation = engine.compute(&BuildSelection::new());

        assert_eq!(computation.value(&"amp".into()), 25.0);
        assert_eq!(computation.value(&"power".into()), 60.0); // 10 + 25*2
    }

    #[test]
    fn test_config_vars_reach_formulas() {
        let catalog = Catalog::new(
            vec![Entity::new("rules", EntityKind::GlobalRule, "Rules")
                .with_modifier(Modifier::new("scale", "vit", "5 * level", Stage::Flat))],
            vec![StatDef::new("vit").with_base(50.0)],
        );
        let mut engine = Engine::new(catalog);
        let mut selection = BuildSelection::new();
        selection.set_config("level", 8.0);

        assert_eq!(engine.compute(&selection).value(&"vit".into()), 90.0);
    }

    #[test]
    fn test_engine_retains_nothing_between_calls() {
        let catalog = Catalog::new(
            vec![Entity::new("human", EntityKind::Race, "Human")
                .with_modifier(Modifier::new("m", "vit", "20", Stage::Flat))],
            vec![StatDef::new("vit").with_base(100.0)],
        );
        let mut engine = Engine::new(catalog);

        let mut selection = BuildSelection::new();
        selection.choose("human");
        assert_eq!(engine.compute(&selection).value(&"vit".into()), 120.0);

        // dropping the choice fully resets the result
        let empty = BuildSelection::new();
        assert_eq!(engine.compute(&empty).value(&"vit".into()), 100.0);
    }

    #[test]
    fn test_parse_cache_fills_once() {
        let catalog = Catalog::new(
            vec![Entity::new("rules", EntityKind::GlobalRule, "Rules")
                .with_modifier(Modifier::new("m1", "vit", "5 * level", Stage::Flat))
                .with_modifier(Modifier::new("m2", "atk", "5 * level", Stage::Flat))],
            vec![StatDef::new("vit"), StatDef::new("atk")],
        );
        let mut engine = Engine::new(catalog);
        let selection = BuildSelection::new();

        engine.compute(&selection);
        let after_first = engine.cache().len();
        assert_eq!(after_first, 1); // one distinct formula text

        engine.compute(&selection);
        assert_eq!(engine.cache().len(), after_first);
    }

    #[test]
    fn test_elapsed_and_pass_count_reported() {
        let catalog = Catalog::new(Vec::new(), vec![StatDef::new("vit")]);
        let mut engine = Engine::new(catalog);
        let computation = engine.compute(&BuildSelection::new());
        assert_eq!(computation.passes, PASS_COUNT);
        assert!(computation.elapsed >= std::time::Duration::ZERO);
    }
}
