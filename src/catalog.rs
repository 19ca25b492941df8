//! Catalog data model.
//!
//! The catalog is the authored, static content a session loads once:
//! entities (races, classes, items, sets, ...), their modifiers and summon
//! declarations, and the statistic definitions. It is read-only for the
//! lifetime of every computation - the engine never mutates it.
//!
//! Everything here is serde-deserializable with permissive defaults, so
//! the host application loads it straight from JSON. Malformed entries are
//! reported by [`Catalog::validate`] but never rejected outright; the
//! activation step skips them defensively instead.

use crate::error::CatalogError;
use crate::expr;
use crate::key::{EntityId, ModifierId, StatKey, ToggleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of a catalog entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Race,
    Class,
    Specialization,
    Item,
    ItemSet,
    GlobalRule,
    Career,
    Guild,
    Faction,
    Profession,
    SubProfession,
    RacialCompetence,
    EliteCompetence,
}

impl EntityKind {
    /// The snake_case name helpers match against (`countItems("item")`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Race => "race",
            Self::Class => "class",
            Self::Specialization => "specialization",
            Self::Item => "item",
            Self::ItemSet => "item_set",
            Self::GlobalRule => "global_rule",
            Self::Career => "career",
            Self::Guild => "guild",
            Self::Faction => "faction",
            Self::Profession => "profession",
            Self::SubProfession => "sub_profession",
            Self::RacialCompetence => "racial_competence",
            Self::EliteCompetence => "elite_competence",
        }
    }
}

/// One of the seven ordered aggregation stages, minus the implicit Base
/// stage (stage 1 is the statistic definition's declared default and is
/// not modifier-taggable), plus the out-of-band Override.
///
/// Stage order is the contract the whole pipeline rests on:
///
/// ```text
/// v = base
/// v += Σ flat
/// v *= 1 + Σ percent / 100
/// v *= 1 + Σ pre_posture_percent / 100
/// v *= 1 + Σ posture_percent / 100
/// v += Σ secondary_flat
/// v *= 1 + Σ secondary_percent / 100
/// ```
///
/// Every multiplicative stage sums its contributions before applying, so
/// two +50% sources in one stage combine to ×2.0, never ×2.25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Flat addition applied directly to the base.
    Flat,
    /// First multiplicative group.
    Percent,
    /// Second, independently compounding multiplicative group.
    PrePosturePercent,
    /// Third multiplicative group (stance/posture-style global effects).
    PosturePercent,
    /// Flat addition applied after all three percent groups.
    SecondaryFlat,
    /// Final multiplicative group; hosts most specialization and
    /// situational bonuses.
    SecondaryPercent,
    /// Out-of-band: replaces the entire staged result.
    Override,
}

/// A single rule contributing to one statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub id: ModifierId,
    /// The statistic this modifier feeds.
    pub target: StatKey,
    /// Value formula, evaluated each pass.
    pub value: String,
    #[serde(default = "default_stage")]
    pub stage: Stage,
    /// Activation condition; absent means always active.
    #[serde(default)]
    pub condition: Option<String>,
    /// Tracked in the per-turn accumulator instead of the staged fold.
    #[serde(default)]
    pub per_turn: bool,
    /// Toggle gating this modifier; absent means not toggle-gated.
    #[serde(default)]
    pub toggle: Option<ToggleId>,
    /// Advisory radio-group name for the UI. The engine never enforces
    /// exclusivity: every active toggle applies, even within one group.
    #[serde(default)]
    pub toggle_group: Option<String>,
    /// Fraction of this modifier shared with the team, for display.
    #[serde(default)]
    pub team_ratio: Option<f64>,
}

fn default_stage() -> Stage {
    Stage::Flat
}

impl Modifier {
    /// A minimal unconditional modifier; tests and fusion code build on it.
    pub fn new(
        id: impl Into<ModifierId>,
        target: impl Into<StatKey>,
        value: impl Into<String>,
        stage: Stage,
    ) -> Self {
        Self {
            id: id.into(),
            target: target.into(),
            value: value.into(),
            stage,
            condition: None,
            per_turn: false,
            toggle: None,
            toggle_group: None,
            team_ratio: None,
        }
    }

    /// Attach an activation condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Attach a gating toggle.
    pub fn with_toggle(mut self, toggle: impl Into<ToggleId>) -> Self {
        self.toggle = Some(toggle.into());
        self
    }

    /// Mark as per-turn.
    pub fn per_turn(mut self) -> Self {
        self.per_turn = true;
        self
    }

    /// Whether required fields are present; malformed modifiers are
    /// skipped during activation.
    pub fn is_well_formed(&self) -> bool {
        !self.target.is_empty() && !self.value.trim().is_empty()
    }
}

/// One rank of a guild. A guild at chosen rank `n` contributes the
/// modifiers of every rank with `level <= n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildRank {
    pub level: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

/// A summon declaration carried by an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SummonSpec {
    /// One pack of N identical units splitting a total share of the
    /// owner's resolved statistics: each unit receives
    /// `owner_stat * share/100 / N`.
    SharedPool {
        name: String,
        #[serde(default)]
        unit_name: String,
        /// Unit-count formula, evaluated post multi-pass.
        count: String,
        /// Total pool share in percent, formula-driven.
        share: String,
        /// Owner statistics projected onto the units.
        stats: Vec<StatKey>,
    },
    /// Each unit independently receives the full declared share,
    /// unscaled by unit count.
    PerUnit {
        name: String,
        #[serde(default)]
        unit_name: String,
        count: String,
        share: String,
        stats: Vec<StatKey>,
    },
    /// Fully formula-driven block, not derived from the owner at all
    /// (e.g. scaling from character level).
    Independent {
        name: String,
        #[serde(default)]
        unit_name: String,
        #[serde(default)]
        condition: Option<String>,
        count: String,
        stats: BTreeMap<StatKey, String>,
    },
}

impl SummonSpec {
    /// The declaration name, used for display and naming overrides.
    pub fn name(&self) -> &str {
        match self {
            Self::SharedPool { name, .. }
            | Self::PerUnit { name, .. }
            | Self::Independent { name, .. } => name,
        }
    }
}

/// A descriptive set-bonus text block, grouped into tiers alongside the
/// set's modifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierText {
    pub text: String,
    #[serde(default)]
    pub condition: Option<String>,
}

/// A catalog entity: race, class, item, set, global rule, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    #[serde(default)]
    pub name: String,
    /// Structural parent (specialization → class, sub-profession →
    /// profession).
    #[serde(default)]
    pub parent: Option<EntityId>,
    /// Free-form refinement of the kind (e.g. `weapon`, `helmet`).
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub summons: Vec<SummonSpec>,
    /// Guild ranks; empty for everything but guilds.
    #[serde(default)]
    pub ranks: Vec<GuildRank>,
    /// Item-set membership.
    #[serde(default)]
    pub set_id: Option<EntityId>,
    /// Faction membership.
    #[serde(default)]
    pub faction_id: Option<EntityId>,
    /// Equipment-cost attribute (slot points).
    #[serde(default)]
    pub cost: Option<f64>,
    /// Pre-fusion cost. Fusing items forces a different nominal cost;
    /// the original is kept so two-handed weapons stay detectable.
    #[serde(default)]
    pub original_cost: Option<f64>,
    /// User-forged item, counted by `countCustomItems()`.
    #[serde(default)]
    pub custom: bool,
    /// Descriptive tier texts (item sets and legacy factions).
    #[serde(default)]
    pub tier_texts: Vec<TierText>,
}

impl Entity {
    /// A bare entity; builder-style fields fill in the rest.
    pub fn new(id: impl Into<EntityId>, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            parent: None,
            subcategory: None,
            tags: Vec::new(),
            modifiers: Vec::new(),
            summons: Vec::new(),
            ranks: Vec::new(),
            set_id: None,
            faction_id: None,
            cost: None,
            original_cost: None,
            custom: false,
            tier_texts: Vec::new(),
        }
    }

    /// Append a modifier.
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Append a summon declaration.
    pub fn with_summon(mut self, summon: SummonSpec) -> Self {
        self.summons.push(summon);
        self
    }

    /// The effective cost attribute before any fusion, falling back to
    /// the nominal cost.
    pub fn original_cost(&self) -> f64 {
        self.original_cost.or(self.cost).unwrap_or(0.0)
    }

    /// Whether the entity matches a helper-query name: its kind name,
    /// its own id, its subcategory, or one of its tags.
    pub fn matches(&self, name: &str) -> bool {
        self.kind.name() == name
            || self.id.as_str() == name
            || self.subcategory.as_deref() == Some(name)
            || self.tags.iter().any(|tag| tag == name)
    }
}

/// Definition of a derived statistic. Purely descriptive: the base default
/// seeds the pipeline and the grouping orders display, but nothing here
/// affects computation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatDef {
    pub key: StatKey,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub base: f64,
    #[serde(default)]
    pub group: String,
}

impl StatDef {
    /// A definition with a zero base and no display metadata.
    pub fn new(key: impl Into<StatKey>) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            base: 0.0,
            group: String::new(),
        }
    }

    /// Set the base default.
    pub fn with_base(mut self, base: f64) -> Self {
        self.base = base;
        self
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// The immutable entity catalog plus statistic definitions.
///
/// # Examples
///
/// ```rust
/// use buildstat::catalog::{Catalog, Entity, EntityKind, Modifier, Stage, StatDef};
///
/// let catalog = Catalog::new(
///     vec![Entity::new("human", EntityKind::Race, "Human")
///         .with_modifier(Modifier::new("human_vit", "vit", "20", Stage::Flat))],
///     vec![StatDef::new("vit").with_base(100.0)],
/// );
/// assert!(catalog.entity(&"human".into()).is_some());
/// assert!(catalog.validate().is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub entities: Vec<Entity>,
    pub stats: Vec<StatDef>,
    /// Statistic added uniformly to every summon's projected stats
    /// (gear that boosts allied units). Resolved like any other stat.
    #[serde(default)]
    pub summon_bonus_stat: Option<StatKey>,
}

impl Catalog {
    /// Assemble a catalog.
    pub fn new(entities: Vec<Entity>, stats: Vec<StatDef>) -> Self {
        Self {
            entities,
            stats,
            summon_bonus_stat: None,
        }
    }

    /// Name the summon flat-bonus statistic.
    pub fn with_summon_bonus_stat(mut self, key: impl Into<StatKey>) -> Self {
        self.summon_bonus_stat = Some(key.into());
        self
    }

    /// Look up an entity by id.
    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| &entity.id == id)
    }

    /// Look up a statistic definition by key.
    pub fn stat(&self, key: &StatKey) -> Option<&StatDef> {
        self.stats.iter().find(|def| &def.key == key)
    }

    /// Report malformed content without rejecting it.
    ///
    /// The engine skips these entries during activation; this is the
    /// authoring-time diagnostic surface.
    pub fn validate(&self) -> Vec<CatalogError> {
        let mut problems = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        for entity in &self.entities {
            if entity.id.is_empty() {
                problems.push(CatalogError::EmptyEntityId(entity.name.clone()));
                continue;
            }
            if !seen.insert(entity.id.clone()) {
                problems.push(CatalogError::DuplicateEntityId(entity.id.clone()));
            }
            let rank_modifiers = entity.ranks.iter().flat_map(|rank| &rank.modifiers);
            for modifier in entity.modifiers.iter().chain(rank_modifiers) {
                if modifier.target.is_empty() {
                    problems.push(CatalogError::EmptyTarget(
                        modifier.id.clone(),
                        entity.id.clone(),
                    ));
                    continue;
                }
                if modifier.value.trim().is_empty() {
                    problems.push(CatalogError::EmptyFormula(
                        modifier.id.clone(),
                        entity.id.clone(),
                    ));
                    continue;
                }
                if let Err(err) = expr::screen(&modifier.value) {
                    problems.push(CatalogError::BadFormula(
                        modifier.id.clone(),
                        entity.id.clone(),
                        err,
                    ));
                }
                if let Some(condition) = &modifier.condition {
                    if let Err(err) = expr::screen(condition) {
                        problems.push(CatalogError::BadFormula(
                            modifier.id.clone(),
                            entity.id.clone(),
                            err,
                        ));
                    }
                }
            }
        }
        problems
    }
}
