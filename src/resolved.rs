//! Computation outputs.
//!
//! Everything the engine hands back to the display layer: per-statistic
//! results with full stage breakdowns and contribution traces, the flat
//! modifier-value map used for inline text-template substitution, the
//! active summon list, and timing diagnostics. All read-only, cloneable
//! and serde-serializable.

use crate::catalog::Stage;
use crate::key::{EntityId, ModifierId, StatKey};
use crate::summon::ActiveSummon;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-stage sums for one statistic.
///
/// Each field is the summed contribution of that stage *before* it is
/// combined into the running total, mirroring the pipeline's
/// sum-then-apply rule. `override_value` is the winning override's
/// evaluated value when one is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageBreakdown {
    pub base: f64,
    pub flat: f64,
    pub percent: f64,
    pub pre_posture_percent: f64,
    pub posture_percent: f64,
    pub secondary_flat: f64,
    pub secondary_percent: f64,
    pub override_value: Option<f64>,
}

impl StageBreakdown {
    /// The closed-form composition of the seven stages (ignoring any
    /// override). The pipeline's folded result equals this exactly.
    pub fn compose(&self) -> f64 {
        let mut value = self.base;
        value += self.flat;
        value *= 1.0 + self.percent / 100.0;
        value *= 1.0 + self.pre_posture_percent / 100.0;
        value *= 1.0 + self.posture_percent / 100.0;
        value += self.secondary_flat;
        value *= 1.0 + self.secondary_percent / 100.0;
        value
    }
}

/// Per-turn deltas, tracked outside the staged fold and reported
/// alongside the static value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerTurn {
    /// Summed flat per-turn contributions.
    pub flat: f64,
    /// Summed percent per-turn contributions.
    pub percent: f64,
}

/// One modifier's entry in a statistic's contribution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// The entity the modifier came from.
    pub source: EntityId,
    /// Its display name at trace time.
    pub source_name: String,
    pub modifier: ModifierId,
    pub stage: Stage,
    /// The raw formula text, verbatim.
    pub formula: String,
    /// The evaluated value (the safe fallback when `error` is set).
    pub value: f64,
    pub per_turn: bool,
    /// Error marker when the formula failed to parse.
    #[serde(default)]
    pub error: Option<String>,
}

/// A fully computed statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatResult {
    pub key: StatKey,
    /// Display label from the statistic definition.
    pub label: String,
    /// Display grouping from the statistic definition.
    pub group: String,
    /// The declared base default (stage 1).
    pub base: f64,
    /// The final value. Full floating-point precision; rounding
    /// (ceiling) belongs to presentation, never to the pipeline.
    pub value: f64,
    pub breakdown: StageBreakdown,
    pub per_turn: PerTurn,
    /// Trace of every included modifier, in catalog declaration order.
    pub contributions: Vec<Contribution>,
}

/// The complete result of one computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Computation {
    /// All statistics, keyed and iterable in stable order.
    pub stats: BTreeMap<StatKey, StatResult>,
    /// Every modifier id mapped to its last-evaluated value (final
    /// pass), whether or not the modifier was active. Used for inline
    /// text-template substitution in the display layer.
    pub modifier_values: BTreeMap<ModifierId, f64>,
    /// Aggregated ally/pet stat blocks.
    pub summons: Vec<ActiveSummon>,
    /// Number of pipeline passes that ran.
    pub passes: u32,
    /// Wall-clock duration of the whole computation, for diagnostics
    /// display.
    pub elapsed: Duration,
}

impl Computation {
    /// A statistic's final value; unknown keys read as `0.0`.
    pub fn value(&self, key: &StatKey) -> f64 {
        self.stats.get(key).map(|result| result.value).unwrap_or(0.0)
    }

    /// A statistic result by key.
    pub fn stat(&self, key: &StatKey) -> Option<&StatResult> {
        self.stats.get(key)
    }
}
