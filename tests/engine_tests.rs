use buildstat::catalog::{GuildRank, TierText};
use buildstat::*;
use pretty_assertions::assert_eq;

fn stat(key: &str, base: f64) -> StatDef {
    StatDef::new(key).with_base(base)
}

/// Golden value for the full seven-stage composition on one statistic.
#[test]
fn test_seven_stage_composition() {
    let rules = Entity::new("rules", EntityKind::GlobalRule, "Rules")
        .with_modifier(Modifier::new("flat", "vit", "20", Stage::Flat))
        .with_modifier(Modifier::new("pct", "vit", "50", Stage::Percent))
        .with_modifier(Modifier::new("pre", "vit", "10", Stage::PrePosturePercent))
        .with_modifier(Modifier::new("post", "vit", "20", Stage::PosturePercent))
        .with_modifier(Modifier::new("sflat", "vit", "2", Stage::SecondaryFlat))
        .with_modifier(Modifier::new("spct", "vit", "100", Stage::SecondaryPercent));
    let mut engine = Engine::new(Catalog::new(vec![rules], vec![stat("vit", 100.0)]));

    let computation = engine.compute(&BuildSelection::new());
    let expected = (120.0_f64 * 1.5 * 1.1 * 1.2 + 2.0) * 2.0;
    assert!((computation.value(&"vit".into()) - expected).abs() < 1e-9);

    let result = computation.stat(&"vit".into()).unwrap();
    assert_eq!(result.breakdown.base, 100.0);
    assert_eq!(result.breakdown.flat, 20.0);
    assert_eq!(result.breakdown.secondary_percent, 100.0);
    assert_eq!(result.contributions.len(), 6);
}

/// Two +50% secondary-percent sources combine to ×2.0, never ×2.25.
#[test]
fn test_secondary_percent_summation_law() {
    let a = Entity::new("spec_a", EntityKind::Specialization, "A")
        .with_modifier(Modifier::new("a", "vit", "50", Stage::SecondaryPercent));
    let b = Entity::new("spec_b", EntityKind::Specialization, "B")
        .with_modifier(Modifier::new("b", "vit", "50", Stage::SecondaryPercent));
    let mut engine = Engine::new(Catalog::new(vec![a, b], vec![stat("vit", 100.0)]));

    let mut selection = BuildSelection::new();
    selection.choose("spec_a");
    selection.choose("spec_b");

    assert_eq!(engine.compute(&selection).value(&"vit".into()), 200.0);
}

/// An active override makes stages 1-7 irrelevant: varying the staged
/// inputs must not change the output.
#[test]
fn test_override_law() {
    for flat in [0.0, 100.0, 9999.0] {
        let rules = Entity::new("rules", EntityKind::GlobalRule, "Rules")
            .with_modifier(Modifier::new("flat", "vit", format!("{flat}"), Stage::Flat))
            .with_modifier(Modifier::new("pct", "vit", "300", Stage::SecondaryPercent))
            .with_modifier(Modifier::new("force", "vit", "77", Stage::Override));
        let mut engine = Engine::new(Catalog::new(vec![rules], vec![stat("vit", 100.0)]));
        assert_eq!(engine.compute(&BuildSelection::new()).value(&"vit".into()), 77.0);
    }
}

/// A two-level forward-reference chain, gated off the seeding pass,
/// settles within the fixed pass count: the value equals the closed-form
/// fixed point, i.e. the final two passes were identical.
#[test]
fn test_multi_pass_stabilization() {
    let rules = Entity::new("rules", EntityKind::GlobalRule, "Rules")
        .with_modifier(Modifier::new("seed", "amp", "5", Stage::Flat))
        .with_modifier(
            Modifier::new("mid", "power", "amp * 2", Stage::Flat).with_condition("pass >= 1"),
        )
        .with_modifier(
            Modifier::new("top", "burst", "power + 1", Stage::Flat).with_condition("pass >= 1"),
        );
    let mut engine = Engine::new(Catalog::new(
        vec![rules],
        vec![stat("amp", 0.0), stat("power", 0.0), stat("burst", 0.0)],
    ));

    let computation = engine.compute(&BuildSelection::new());
    assert_eq!(computation.value(&"amp".into()), 5.0);
    assert_eq!(computation.value(&"power".into()), 10.0);
    assert_eq!(computation.value(&"burst".into()), 11.0);
    assert_eq!(computation.passes, PASS_COUNT);
}

/// Shared-pool worked example: vit=1000, share=50%, 4 units - the
/// declared share is the total pool, split evenly: 125 per unit.
#[test]
fn test_shared_pool_summon_division() {
    let summoner = Entity::new("packmaster", EntityKind::Class, "Packmaster").with_summon(
        SummonSpec::SharedPool {
            name: "Pack of Wolves".into(),
            unit_name: "Wolf".into(),
            count: "4".into(),
            share: "50".into(),
            stats: vec!["vit".into()],
        },
    );
    let mut engine = Engine::new(Catalog::new(vec![summoner], vec![stat("vit", 1000.0)]));

    let mut selection = BuildSelection::new();
    selection.choose("packmaster");

    let computation = engine.compute(&selection);
    assert_eq!(computation.summons.len(), 1);
    let pack = &computation.summons[0];
    assert_eq!(pack.count, 4);
    assert_eq!(pack.stats.get(&"vit".into()), Some(&125.0));
}

/// Fixed-per-unit worked example: vit=1000, share=20%, 2 units - each
/// unit independently shows 200, unscaled by unit count.
#[test]
fn test_per_unit_summon_division() {
    let summoner = Entity::new("binder", EntityKind::Class, "Binder").with_summon(
        SummonSpec::PerUnit {
            name: "Twin Golems".into(),
            unit_name: "Golem".into(),
            count: "2".into(),
            share: "20".into(),
            stats: vec!["vit".into()],
        },
    );
    let mut engine = Engine::new(Catalog::new(vec![summoner], vec![stat("vit", 1000.0)]));

    let mut selection = BuildSelection::new();
    selection.choose("binder");

    let computation = engine.compute(&selection);
    assert_eq!(computation.summons[0].stats.get(&"vit".into()), Some(&200.0));
}

/// The summon flat-bonus statistic resolves like any other statistic and
/// lands uniformly on every projected summon stat.
#[test]
fn test_summon_flat_bonus_from_gear() {
    let summoner = Entity::new("packmaster", EntityKind::Class, "Packmaster").with_summon(
        SummonSpec::SharedPool {
            name: "Pack".into(),
            unit_name: "Wolf".into(),
            count: "2".into(),
            share: "50".into(),
            stats: vec!["vit".into()],
        },
    );
    let banner = Entity::new("war_banner", EntityKind::Item, "War Banner")
        .with_modifier(Modifier::new("banner", "ally_bonus", "12", Stage::Flat));
    let catalog = Catalog::new(
        vec![summoner, banner],
        vec![stat("vit", 1000.0), stat("ally_bonus", 0.0)],
    )
    .with_summon_bonus_stat("ally_bonus");
    let mut engine = Engine::new(catalog);

    let mut selection = BuildSelection::new();
    selection.choose("packmaster");
    selection.equip("war_banner");

    let computation = engine.compute(&selection);
    // 1000 * 50% / 2 + 12
    assert_eq!(computation.summons[0].stats.get(&"vit".into()), Some(&262.0));
}

/// Tier aggregation: thresholds 2/3/4 with 3 pieces equipped activates
/// tiers 2 and 3 but not 4.
#[test]
fn test_set_tiers_against_equipped_count() {
    let mut entities: Vec<Entity> = (1..=4)
        .map(|i| {
            let mut piece = Entity::new(
                format!("ember_{i}"),
                EntityKind::Item,
                format!("Ember Piece {i}"),
            );
            piece.set_id = Some("ember_set".into());
            piece
        })
        .collect();
    let mut set = Entity::new("ember_set", EntityKind::ItemSet, "Ember Set")
        .with_modifier(
            Modifier::new("t2", "atk", "10", Stage::Flat)
                .with_condition("countSet(ember_set) >= 2"),
        )
        .with_modifier(
            Modifier::new("t3", "atk", "25", Stage::Flat)
                .with_condition("countSet(ember_set) >= 3"),
        )
        .with_modifier(
            Modifier::new("t4", "atk", "50", Stage::Flat)
                .with_condition("countSet(ember_set) >= 4"),
        );
    set.tier_texts = vec![TierText {
        text: "The set hums with heat.".into(),
        condition: Some("countSet(ember_set) >= 2".into()),
    }];
    entities.push(set);
    let mut engine = Engine::new(Catalog::new(entities, vec![stat("atk", 0.0)]));

    let mut selection = BuildSelection::new();
    selection.equip("ember_1").equip("ember_2").equip("ember_3");

    let tiers = engine.set_tiers(&"ember_set".into(), &selection);
    let flags: Vec<(u32, bool)> = tiers.iter().map(|t| (t.threshold, t.active)).collect();
    assert_eq!(flags, vec![(2, true), (3, true), (4, false)]);
    assert_eq!(tiers[0].texts, vec!["The set hums with heat.".to_string()]);
}

/// Set bonuses apply through the normal pipeline: equipping a piece
/// wakes the set entity up, and its conditioned modifiers count pieces
/// through the same snapshot the pipeline computes with.
#[test]
fn test_set_bonus_in_computation() {
    let mut piece_a = Entity::new("ember_1", EntityKind::Item, "Ember Helm");
    piece_a.set_id = Some("ember_set".into());
    let mut piece_b = Entity::new("ember_2", EntityKind::Item, "Ember Plate");
    piece_b.set_id = Some("ember_set".into());
    let set = Entity::new("ember_set", EntityKind::ItemSet, "Ember Set").with_modifier(
        Modifier::new("t2", "atk", "10", Stage::Flat).with_condition("countSet(ember_set) >= 2"),
    );
    let mut engine = Engine::new(Catalog::new(
        vec![piece_a, piece_b, set],
        vec![stat("atk", 0.0)],
    ));

    let mut selection = BuildSelection::new();
    selection.equip("ember_1");
    assert_eq!(engine.compute(&selection).value(&"atk".into()), 0.0);

    selection.equip("ember_2");
    assert_eq!(engine.compute(&selection).value(&"atk".into()), 10.0);
}

/// Guild rank n contributes exactly the modifiers of levels <= n.
#[test]
fn test_guild_rank_accumulation() {
    let mut guild = Entity::new("mages_guild", EntityKind::Guild, "Mages Guild");
    guild.ranks = vec![
        GuildRank {
            level: 1,
            name: "Novice".into(),
            modifiers: vec![Modifier::new("r1", "int", "5", Stage::Flat)],
        },
        GuildRank {
            level: 2,
            name: "Adept".into(),
            modifiers: vec![Modifier::new("r2", "int", "10", Stage::Flat)],
        },
        GuildRank {
            level: 3,
            name: "Master".into(),
            modifiers: vec![Modifier::new("r3", "int", "20", Stage::Flat)],
        },
    ];
    let mut engine = Engine::new(Catalog::new(vec![guild], vec![stat("int", 0.0)]));

    let mut selection = BuildSelection::new();
    selection.set_guild_rank("mages_guild", 2);
    assert_eq!(engine.compute(&selection).value(&"int".into()), 15.0);

    selection.set_guild_rank("mages_guild", 3);
    assert_eq!(engine.compute(&selection).value(&"int".into()), 35.0);
}

/// Toggle-group exclusivity is advisory: two active toggles in one
/// group both apply.
#[test]
fn test_toggle_groups_not_enforced() {
    let mut stance_a = Modifier::new("a", "atk", "10", Stage::Flat).with_toggle("stance_a");
    stance_a.toggle_group = Some("stances".into());
    let mut stance_b = Modifier::new("b", "atk", "20", Stage::Flat).with_toggle("stance_b");
    stance_b.toggle_group = Some("stances".into());

    let rules = Entity::new("rules", EntityKind::GlobalRule, "Rules")
        .with_modifier(stance_a)
        .with_modifier(stance_b);
    let mut engine = Engine::new(Catalog::new(vec![rules], vec![stat("atk", 0.0)]));

    let mut selection = BuildSelection::new();
    selection.set_toggle("stance_a", true);
    selection.set_toggle("stance_b", true);

    assert_eq!(engine.compute(&selection).value(&"atk".into()), 30.0);
}

/// A malformed entity contributes nothing and blocks nothing.
#[test]
fn test_malformed_entity_skipped() {
    let good = Entity::new("rules", EntityKind::GlobalRule, "Rules")
        .with_modifier(Modifier::new("ok", "vit", "20", Stage::Flat))
        .with_modifier(Modifier::new("no_target", "", "50", Stage::Flat))
        .with_modifier(Modifier::new("no_formula", "vit", "   ", Stage::Flat));
    let clean = Entity::new("rules", EntityKind::GlobalRule, "Rules")
        .with_modifier(Modifier::new("ok", "vit", "20", Stage::Flat));

    let mut dirty_engine = Engine::new(Catalog::new(vec![good], vec![stat("vit", 100.0)]));
    let mut clean_engine = Engine::new(Catalog::new(vec![clean], vec![stat("vit", 100.0)]));

    let selection = BuildSelection::new();
    assert_eq!(
        dirty_engine.compute(&selection).value(&"vit".into()),
        clean_engine.compute(&selection).value(&"vit".into()),
    );
}

/// The modifier-value map covers every evaluated modifier, active or not.
#[test]
fn test_modifier_value_map() {
    let rules = Entity::new("rules", EntityKind::GlobalRule, "Rules")
        .with_modifier(Modifier::new("live", "vit", "5 * level", Stage::Flat))
        .with_modifier(Modifier::new("gated", "vit", "40", Stage::Flat).with_toggle("off"))
        .with_modifier(Modifier::new("loose", "style_points", "7", Stage::Flat));
    let mut engine = Engine::new(Catalog::new(vec![rules], vec![stat("vit", 0.0)]));

    let mut selection = BuildSelection::new();
    selection.set_config("level", 6.0);

    let computation = engine.compute(&selection);
    assert_eq!(computation.modifier_values.get(&"live".into()), Some(&30.0));
    assert_eq!(computation.modifier_values.get(&"gated".into()), Some(&40.0));
    // even a modifier aimed at an undefined statistic gets a value
    assert_eq!(computation.modifier_values.get(&"loose".into()), Some(&7.0));
    assert_eq!(computation.value(&"vit".into()), 30.0);
}

/// Catalog and selection survive a JSON round trip with identical
/// computation results.
#[test]
fn test_serde_round_trip_preserves_results() {
    let rules = Entity::new("rules", EntityKind::GlobalRule, "Rules")
        .with_modifier(Modifier::new("m", "vit", "10 + 5 * level", Stage::Flat))
        .with_modifier(
            Modifier::new("late", "vit", "50", Stage::SecondaryPercent)
                .with_condition("pass >= 1"),
        );
    let catalog = Catalog::new(vec![rules], vec![stat("vit", 100.0)]);

    let mut selection = BuildSelection::new();
    selection.set_config("level", 4.0);

    let catalog_json = serde_json::to_string(&catalog).unwrap();
    let selection_json = serde_json::to_string(&selection).unwrap();
    let catalog_back: Catalog = serde_json::from_str(&catalog_json).unwrap();
    let selection_back: BuildSelection = serde_json::from_str(&selection_json).unwrap();

    let direct = Engine::new(catalog).compute(&selection);
    let round_tripped = Engine::new(catalog_back).compute(&selection_back);
    assert_eq!(direct.stats, round_tripped.stats);
    assert_eq!(direct.modifier_values, round_tripped.modifier_values);
}

/// A formula referencing a disallowed name never executes: the engine
/// returns the fallback and marks the contribution, and the computation
/// as a whole is unaffected.
#[test]
fn test_sandbox_holds_inside_computation() {
    let rules = Entity::new("rules", EntityKind::GlobalRule, "Rules")
        .with_modifier(Modifier::new("ok", "vit", "20", Stage::Flat))
        .with_modifier(Modifier::new("evil", "vit", "process(env)", Stage::Flat));
    let mut engine = Engine::new(Catalog::new(vec![rules], vec![stat("vit", 100.0)]));

    let computation = engine.compute(&BuildSelection::new());
    assert_eq!(computation.value(&"vit".into()), 120.0);

    let result = computation.stat(&"vit".into()).unwrap();
    let marked = result
        .contributions
        .iter()
        .find(|c| c.modifier.as_str() == "evil")
        .unwrap();
    assert_eq!(marked.value, 0.0);
    assert!(marked.error.as_deref().unwrap().contains("process"));
}

/// Per-turn modifiers are reported alongside, never folded in.
#[test]
fn test_per_turn_reporting() {
    let rules = Entity::new("rules", EntityKind::GlobalRule, "Rules")
        .with_modifier(Modifier::new("static", "regen", "10", Stage::Flat))
        .with_modifier(Modifier::new("tick", "regen", "3", Stage::Flat).per_turn());
    let mut engine = Engine::new(Catalog::new(vec![rules], vec![stat("regen", 0.0)]));

    let computation = engine.compute(&BuildSelection::new());
    let result = computation.stat(&"regen".into()).unwrap();
    assert_eq!(result.value, 10.0);
    assert_eq!(result.per_turn.flat, 3.0);
    assert_eq!(result.per_turn.percent, 0.0);
}
