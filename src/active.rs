//! Active-entity snapshot.
//!
//! [`ActiveSet::collect`] turns (catalog, selection) into the list of
//! entities contributing to the current computation: every global rule,
//! every chosen entity, every equipped item, and for each joined guild the
//! ranks up to the chosen level. Malformed entries are skipped with a
//! warning and never block the rest of the build.
//!
//! The snapshot also implements [`QueryHost`], so the evaluator's helper
//! functions answer from exactly the entity set the current pass computes
//! with - helpers and pipeline can never disagree.

use crate::catalog::{Catalog, Entity, EntityKind, Modifier};
use crate::context::{EvalContext, QueryHost};
use crate::expr::{self, ExprCache};
use crate::selection::BuildSelection;
use log::warn;

/// An active entity together with its contributing modifiers (own plus
/// rank-expanded), in catalog declaration order.
#[derive(Debug)]
pub struct ActiveEntry<'c> {
    pub entity: &'c Entity,
    pub modifiers: Vec<&'c Modifier>,
}

/// The entity snapshot one computation runs against.
#[derive(Debug)]
pub struct ActiveSet<'c> {
    selection: &'c BuildSelection,
    entries: Vec<ActiveEntry<'c>>,
    /// Equipped items, one slot per occurrence, resolved against the
    /// catalog. Answers the equipment-scoped helper queries.
    equipped: Vec<&'c Entity>,
}

impl<'c> ActiveSet<'c> {
    /// Build the snapshot for one computation.
    ///
    /// Entries keep catalog declaration order; that order is what makes
    /// override collisions deterministic.
    pub fn collect(catalog: &'c Catalog, selection: &'c BuildSelection) -> Self {
        let mut equipped = Vec::new();
        for id in &selection.equipment {
            match catalog.entity(id) {
                Some(entity) => equipped.push(entity),
                None => warn!("equipped item `{id}` not in catalog"),
            }
        }

        let mut entries = Vec::new();
        for entity in &catalog.entities {
            if entity.id.is_empty() {
                warn!("skipping entity with empty id (name: `{}`)", entity.name);
                continue;
            }

            let chosen = selection.chosen.contains(&entity.id);
            let worn = selection.equipment.contains(&entity.id);
            let rank = selection.guild_ranks.get(&entity.id).copied();
            let always_on = entity.kind == EntityKind::GlobalRule;
            // a set or faction wakes up as soon as one of its pieces is worn
            let membership = match entity.kind {
                EntityKind::ItemSet => equipped
                    .iter()
                    .any(|item| item.set_id.as_ref() == Some(&entity.id)),
                EntityKind::Faction => equipped
                    .iter()
                    .any(|item| item.faction_id.as_ref() == Some(&entity.id)),
                _ => false,
            };
            if !(always_on || chosen || worn || rank.is_some() || membership) {
                continue;
            }

            let mut modifiers = Vec::new();
            for modifier in &entity.modifiers {
                if modifier.is_well_formed() {
                    modifiers.push(modifier);
                } else {
                    warn!(
                        "skipping malformed modifier `{}` on entity `{}`",
                        modifier.id, entity.id
                    );
                }
            }
            if let Some(level) = rank {
                for rank in entity.ranks.iter().filter(|rank| rank.level <= level) {
                    for modifier in &rank.modifiers {
                        if modifier.is_well_formed() {
                            modifiers.push(modifier);
                        } else {
                            warn!(
                                "skipping malformed rank modifier `{}` on entity `{}`",
                                modifier.id, entity.id
                            );
                        }
                    }
                }
            }

            entries.push(ActiveEntry { entity, modifiers });
        }

        Self {
            selection,
            entries,
            equipped,
        }
    }

    /// Active entries in catalog declaration order.
    pub fn entries(&self) -> &[ActiveEntry<'c>] {
        &self.entries
    }

    /// The equipped-item snapshot, one entry per occupied slot.
    pub fn equipped(&self) -> &[&'c Entity] {
        &self.equipped
    }

    /// The selection this snapshot was collected from.
    pub fn selection(&self) -> &'c BuildSelection {
        self.selection
    }

    /// Whether a modifier applies in the current pass: its toggle (if
    /// any) is active in the selection and its condition (if any)
    /// evaluates true against the pass context.
    ///
    /// Toggle groups are deliberately ignored here - exclusivity is a UI
    /// convention, and every active toggle applies even when several in
    /// one group are on at once.
    pub fn modifier_active(
        &self,
        modifier: &Modifier,
        cache: &mut ExprCache,
        ctx: &EvalContext<'_>,
    ) -> bool {
        if let Some(toggle) = &modifier.toggle {
            if !self.selection.toggle_active(toggle) {
                return false;
            }
        }
        match &modifier.condition {
            Some(condition) => cache.eval_condition(condition, ctx),
            None => true,
        }
    }

    /// An equipped item's contribution to `stat`: the sum of its
    /// non-toggle-gated modifiers' evaluated values.
    fn item_stat_total(&self, item: &Entity, stat: &str, ctx: &EvalContext<'_>) -> f64 {
        item.modifiers
            .iter()
            .filter(|m| m.is_well_formed() && m.toggle.is_none() && m.target.as_str() == stat)
            .map(|m| expr::evaluate(&m.value, ctx))
            .sum()
    }
}

impl QueryHost for ActiveSet<'_> {
    fn count_items(&self, name: &str) -> f64 {
        self.entries
            .iter()
            .filter(|entry| entry.entity.matches(name))
            .count() as f64
    }

    fn count_custom_items(&self) -> f64 {
        self.entries
            .iter()
            .filter(|entry| entry.entity.custom)
            .count() as f64
    }

    fn sum_item_stats(&self, name: &str, stat: &str, ctx: &EvalContext<'_>) -> f64 {
        self.equipped
            .iter()
            .filter(|item| item.matches(name))
            .map(|item| self.item_stat_total(item, stat, ctx))
            .sum()
    }

    fn best_item_stat(&self, name: &str, stat: &str, ctx: &EvalContext<'_>) -> f64 {
        self.equipped
            .iter()
            .filter(|item| item.matches(name))
            .map(|item| self.item_stat_total(item, stat, ctx))
            .fold(0.0, f64::max)
    }

    fn sum_original_item_cost(&self, name: &str) -> f64 {
        self.equipped
            .iter()
            .filter(|item| item.matches(name))
            .map(|item| item.original_cost())
            .sum()
    }

    fn max_original_item_cost(&self, name: &str) -> f64 {
        self.equipped
            .iter()
            .filter(|item| item.matches(name))
            .map(|item| item.original_cost())
            .fold(0.0, f64::max)
    }

    fn count_set(&self, id: &str) -> f64 {
        self.equipped
            .iter()
            .filter(|item| item.set_id.as_ref().is_some_and(|set| set.as_str() == id))
            .count() as f64
    }

    fn count_faction(&self, id: &str) -> f64 {
        self.equipped
            .iter()
            .filter(|item| {
                item.faction_id
                    .as_ref()
                    .is_some_and(|faction| faction.as_str() == id)
            })
            .count() as f64
    }
}
