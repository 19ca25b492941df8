//! Basic example: a small catalog, a build, and a full computation
//!
//! This example demonstrates:
//! - Assembling a catalog of entities and statistic definitions
//! - Choosing a race/class and equipping an item
//! - Reading final values, stage breakdowns, and contribution traces

use buildstat::catalog::{Catalog, Entity, EntityKind, Modifier, Stage, StatDef};
use buildstat::{BuildSelection, Engine};

fn main() {
    let catalog = Catalog::new(
        vec![
            Entity::new("human", EntityKind::Race, "Human")
                .with_modifier(Modifier::new("human_vit", "vit", "20", Stage::Flat)),
            Entity::new("warden", EntityKind::Class, "Warden")
                .with_modifier(Modifier::new("warden_vit", "vit", "50", Stage::Percent))
                .with_modifier(
                    Modifier::new("warden_guard", "vit", "25", Stage::SecondaryPercent)
                        .with_toggle("guard_stance"),
                ),
            Entity::new("oak_charm", EntityKind::Item, "Oak Charm")
                .with_modifier(Modifier::new("charm_vit", "vit", "5 * level", Stage::Flat)),
        ],
        vec![StatDef::new("vit").with_base(100.0).with_label("Vitality")],
    );

    let mut engine = Engine::new(catalog);

    let mut selection = BuildSelection::new();
    selection.choose("human");
    selection.choose("warden");
    selection.equip("oak_charm");
    selection.set_config("level", 6.0);
    selection.set_toggle("guard_stance", true);

    println!("Computing build...");
    let computation = engine.compute(&selection);

    let vit = computation.stat(&"vit".into()).unwrap();
    println!("\n=== {} ===", vit.label);
    println!("Base: {:.2}", vit.base);
    println!("Final: {:.2}", vit.value);

    println!("\nStage breakdown:");
    println!("  flat:              +{:.2}", vit.breakdown.flat);
    println!("  percent:           +{:.2}%", vit.breakdown.percent);
    println!("  secondary percent: +{:.2}%", vit.breakdown.secondary_percent);

    println!("\nContributions:");
    for contribution in &vit.contributions {
        println!(
            "  {} ({}): {} = {:.2}",
            contribution.modifier, contribution.source_name, contribution.formula,
            contribution.value
        );
    }

    println!("\nPasses: {}, elapsed: {:?}", computation.passes, computation.elapsed);
}
