//! # buildstat - Deterministic Rules Engine for Character-Build Calculators
//!
//! A rules-evaluation engine for tabletop-RPG character-build calculators
//! that provides:
//! - **Deterministic** stat computation (same catalog + selection → same output)
//! - **Hardcode-free** design (no built-in stat names; everything is catalog content)
//! - **Sandboxed** formula evaluation (closed grammar, helper allow-list, safe fallbacks)
//! - **Multi-pass** resolution of forward references between statistics
//!
//! ## Core Concepts
//!
//! ### Computation Pipeline
//!
//! Every build edit triggers one full, independent computation:
//!
//! ```text
//! [Catalog + BuildSelection] → [ActiveSet] → [Modifier Pipeline × passes]
//!                            → [Computation: stats, summons, trace]
//! ```
//!
//! 1. **Activation** selects the contributing entities and filters their
//!    modifiers by toggle and condition
//! 2. **The pipeline** folds each statistic's modifiers through seven
//!    ordered stages (plus out-of-band overrides)
//! 3. **Three fixed passes** let statistics read each other's values from
//!    the previous pass, with the pass index exposed to formulas
//! 4. **Summons and set tiers** project auxiliary blocks from the
//!    resolved values
//!
//! ### Key Properties
//!
//! - **Never fails**: formula errors degrade to 0/false and are recorded
//!   as trace markers; malformed catalog entries are skipped
//! - **Stage-wide combination**: multiplicative stages sum their
//!   contributions before applying - two +50% sources give ×2.0, not ×2.25
//! - **Fixed pass count**: deliberately no dependency graph and no
//!   fixpoint detection; authored content relies on the exact timing
//! - **Full breakdowns**: every result carries its per-stage sums and a
//!   per-modifier contribution trace
//!
//! ## Example
//!
//! ```rust
//! use buildstat::catalog::{Catalog, Entity, EntityKind, Modifier, Stage, StatDef};
//! use buildstat::{BuildSelection, Engine};
//!
//! let catalog = Catalog::new(
//!     vec![
//!         Entity::new("human", EntityKind::Race, "Human")
//!             .with_modifier(Modifier::new("human_vit", "vit", "20", Stage::Flat)),
//!         Entity::new("warden", EntityKind::Class, "Warden")
//!             .with_modifier(Modifier::new("warden_vit", "vit", "50", Stage::SecondaryPercent)),
//!     ],
//!     vec![StatDef::new("vit").with_base(100.0)],
//! );
//!
//! let mut engine = Engine::new(catalog);
//! let mut selection = BuildSelection::new();
//! selection.choose("human");
//! selection.choose("warden");
//!
//! let computation = engine.compute(&selection);
//! assert_eq!(computation.value(&"vit".into()), 180.0); // (100 + 20) * 1.5
//! ```
//!
//! ## Modules
//!
//! - [`key`] - Interned identifier types
//! - [`catalog`] - Entity catalog data model
//! - [`selection`] - The user's build selection
//! - [`expr`] - Formula parsing and sandboxed evaluation
//! - [`context`] - Evaluation context and helper-query host
//! - [`active`] - Active-entity snapshot and toggle/condition filtering
//! - `pipeline` - The seven-stage modifier pipeline (internal)
//! - [`resolver`] - The multi-pass engine
//! - [`resolved`] - Computation outputs
//! - [`summon`] - Summon aggregation
//! - [`tiers`] - Set/faction bonus tiers
//! - [`algebra`] - Formula merging for equipment fusion
//! - [`error`] - Error types

pub mod active;
pub mod algebra;
pub mod catalog;
pub mod context;
pub mod error;
pub mod expr;
pub mod key;
pub(crate) mod pipeline;
pub mod resolved;
pub mod resolver;
pub mod selection;
pub mod summon;
pub mod tiers;

// Re-export main types for convenience
pub use catalog::{Catalog, Entity, EntityKind, Modifier, Stage, StatDef, SummonSpec};
pub use context::{EvalContext, QueryHost};
pub use error::{CatalogError, FormulaError};
pub use key::{EntityId, ModifierId, StatKey, ToggleId};
pub use resolved::{Computation, Contribution, PerTurn, StageBreakdown, StatResult};
pub use resolver::{Engine, PASS_COUNT};
pub use selection::BuildSelection;
pub use summon::ActiveSummon;
pub use tiers::{SetTier, TierModifier};
