//! The build selection: everything the user has chosen.
//!
//! Owned and mutated by the UI layer; the engine only reads it. Every
//! mutation triggers one full, independent recomputation - there is no
//! incremental update model, so nothing here is cached or derived.

use crate::key::{EntityId, StatKey, ToggleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The user's current build: chosen entities, equipped items, toggle
/// states, free-form numeric configs, and summon naming overrides.
///
/// # Examples
///
/// ```rust
/// use buildstat::BuildSelection;
///
/// let mut selection = BuildSelection::new();
/// selection.choose("human");
/// selection.choose("warden");
/// selection.equip("ember_blade");
/// selection.set_toggle("battle_stance", true);
/// selection.set_config("level", 12.0);
///
/// assert!(selection.toggle_active(&"battle_stance".into()));
/// assert!(!selection.toggle_active(&"unknown".into()));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSelection {
    /// Chosen entity ids across all axes (race, class, specialization,
    /// career, faction, professions, competences).
    #[serde(default)]
    pub chosen: Vec<EntityId>,
    /// Equipped item ids, in slot order.
    #[serde(default)]
    pub equipment: Vec<EntityId>,
    /// Chosen rank level per guild.
    #[serde(default)]
    pub guild_ranks: BTreeMap<EntityId, u32>,
    /// Toggle states. Missing toggles read as inactive.
    #[serde(default)]
    pub toggles: BTreeMap<ToggleId, bool>,
    /// Free-form named numeric values, exposed verbatim as formula
    /// variables (e.g. `level`).
    #[serde(default)]
    pub configs: BTreeMap<String, f64>,
    /// Display-name overrides for summons, keyed by declaration name.
    #[serde(default)]
    pub summon_names: BTreeMap<String, String>,
}

impl BuildSelection {
    /// An empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chosen entity (race, class, ...).
    pub fn choose(&mut self, id: impl Into<EntityId>) -> &mut Self {
        self.chosen.push(id.into());
        self
    }

    /// Equip an item.
    pub fn equip(&mut self, id: impl Into<EntityId>) -> &mut Self {
        self.equipment.push(id.into());
        self
    }

    /// Join a guild at a rank level.
    pub fn set_guild_rank(&mut self, guild: impl Into<EntityId>, level: u32) -> &mut Self {
        self.guild_ranks.insert(guild.into(), level);
        self
    }

    /// Flip a toggle.
    pub fn set_toggle(&mut self, toggle: impl Into<ToggleId>, active: bool) -> &mut Self {
        self.toggles.insert(toggle.into(), active);
        self
    }

    /// Set a free-form numeric config value.
    pub fn set_config(&mut self, name: impl Into<String>, value: f64) -> &mut Self {
        self.configs.insert(name.into(), value);
        self
    }

    /// Override a summon's display name.
    pub fn name_summon(
        &mut self,
        declaration: impl Into<String>,
        name: impl Into<String>,
    ) -> &mut Self {
        self.summon_names.insert(declaration.into(), name.into());
        self
    }

    /// Whether a toggle is currently active.
    pub fn toggle_active(&self, toggle: &ToggleId) -> bool {
        self.toggles.get(toggle).copied().unwrap_or(false)
    }

    /// Config values as formula variables.
    pub(crate) fn config_vars(&self) -> impl Iterator<Item = (StatKey, f64)> + '_ {
        self.configs
            .iter()
            .map(|(name, value)| (StatKey::new(name), *value))
    }
}
