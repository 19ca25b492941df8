//! Summons and set tiers example
//!
//! This example demonstrates:
//! - Shared-pool and independent summon declarations
//! - The summon flat-bonus statistic
//! - Tiered set bonuses grouped by equipped-piece thresholds

use buildstat::catalog::{Catalog, Entity, EntityKind, Modifier, Stage, StatDef, SummonSpec};
use buildstat::{BuildSelection, Engine};

fn main() {
    let mut ember_helm = Entity::new("ember_helm", EntityKind::Item, "Ember Helm");
    ember_helm.set_id = Some("ember_set".into());
    let mut ember_plate = Entity::new("ember_plate", EntityKind::Item, "Ember Plate");
    ember_plate.set_id = Some("ember_set".into());
    let mut ember_ring = Entity::new("ember_ring", EntityKind::Item, "Ember Ring");
    ember_ring.set_id = Some("ember_set".into());

    let ember_set = Entity::new("ember_set", EntityKind::ItemSet, "Ember Set")
        .with_modifier(
            Modifier::new("ember_2pc", "atk", "10", Stage::Flat)
                .with_condition("countSet(ember_set) >= 2"),
        )
        .with_modifier(
            Modifier::new("ember_3pc", "atk", "25", Stage::Flat)
                .with_condition("countSet(ember_set) >= 3"),
        )
        .with_modifier(
            Modifier::new("ember_4pc", "ally_bonus", "15", Stage::Flat)
                .with_condition("countSet(ember_set) >= 4"),
        );

    let packmaster = Entity::new("packmaster", EntityKind::Class, "Packmaster")
        .with_summon(SummonSpec::SharedPool {
            name: "Pack of Wolves".into(),
            unit_name: "Wolf".into(),
            count: "4".into(),
            share: "50".into(),
            stats: vec!["vit".into(), "atk".into()],
        })
        .with_summon(SummonSpec::Independent {
            name: "Bound Spirit".into(),
            unit_name: "Spirit".into(),
            condition: Some("level >= 5".into()),
            count: "1".into(),
            stats: [("vit".into(), "40 * level".to_string())].into_iter().collect(),
        });

    let catalog = Catalog::new(
        vec![ember_helm, ember_plate, ember_ring, ember_set, packmaster],
        vec![
            StatDef::new("vit").with_base(1000.0).with_label("Vitality"),
            StatDef::new("atk").with_base(50.0).with_label("Attack"),
            StatDef::new("ally_bonus").with_label("Ally Bonus"),
        ],
    )
    .with_summon_bonus_stat("ally_bonus");

    let mut engine = Engine::new(catalog);

    let mut selection = BuildSelection::new();
    selection.choose("packmaster");
    selection.equip("ember_helm");
    selection.equip("ember_plate");
    selection.equip("ember_ring");
    selection.set_config("level", 8.0);
    selection.name_summon("Pack of Wolves", "The Ash Runners");

    let computation = engine.compute(&selection);

    println!("=== Summons ===");
    for summon in &computation.summons {
        println!(
            "{} ({} x{})",
            summon.name, summon.unit_name, summon.count
        );
        for (key, value) in &summon.stats {
            println!("  {key}: {value:.2}");
        }
    }

    println!("\n=== Ember Set tiers ===");
    for tier in engine.set_tiers(&"ember_set".into(), &selection) {
        let marker = if tier.active { "ACTIVE" } else { "inactive" };
        println!("{} pieces [{marker}]", tier.threshold);
        for modifier in &tier.modifiers {
            println!("  {} -> {} ({})", modifier.target, modifier.value, modifier.formula);
        }
    }
}
