// Narrative scenarios: a finite appetite winding down over several
// turns, checkpoint resume, and demand pressure moving a price.

use agora_core::{
    Catalog, DesireProfile, DesireTarget, Firm, GainMode, Good, GoodId, GoodTag, MarketState,
    Shortfall, SimConfig, SpecificId, Want, WantId, World, run_turn,
};

const TIME: GoodId = GoodId(0);
const BREAD: GoodId = GoodId(1);
const LOAF: SpecificId = SpecificId(1);
const HUNGER: WantId = WantId(1);

// Bread is a named specific so a finite desire can chase it directly,
// and wealth-flagged so leftover loaves still read as assets.
fn bread_catalog() -> Catalog {
    Catalog::new(
        vec![
            Good::new(TIME, "Time").with_tag(GoodTag::EndOfDayConsumed),
            Good::new(BREAD, "Bread")
                .with_decay(3)
                .with_wealth()
                .with_specific(LOAF),
        ],
        vec![],
        vec![],
        TIME,
    )
    .unwrap()
}

fn hungry_catalog() -> Catalog {
    Catalog::new(
        vec![
            Good::new(TIME, "Time").with_tag(GoodTag::EndOfDayConsumed),
            Good::new(BREAD, "Bread").with_want(HUNGER, GainMode::Consumption, 1.0, 0),
        ],
        vec![Want::new(HUNGER, "Hunger")],
        vec![],
        TIME,
    )
    .unwrap()
}

#[test]
fn test_finite_desire_retires_after_five_loaves() {
    let catalog = bread_catalog();
    let mut world = World::new();
    let agora = world.add_locality("Agora");
    let pop = world
        .add_pop(
            agora,
            &DesireProfile::new().with_desire(DesireTarget::Specific(LOAF), 1.0, 0.0, Some(5)),
            24,
        )
        .unwrap();
    let baker = world.add_firm(Firm::new(agora, 10.0));

    let config = SimConfig::default();
    let mut matched = 0;
    for turn in 0..6 {
        // The baker restocks two fresh loaves every morning.
        world
            .get_firm_mut(baker)
            .unwrap()
            .inventory
            .add(BREAD, 2);
        let report = run_turn(&mut world, &catalog, &config).unwrap();
        matched += report.settlements.len();
        if turn < 5 {
            assert_eq!(report.settlements.len(), 1, "turn {turn} should buy a loaf");
        } else {
            assert!(
                report.settlements.is_empty(),
                "the appetite is spent, nothing left to bid"
            );
        }
    }
    assert_eq!(matched, 5);

    let ledger = &world.get_pop(pop).unwrap().ledger;
    assert_eq!(ledger.len(), 1, "only the standing wealth desire survives");
    assert_eq!(ledger.desires()[0].target, DesireTarget::Wealth);
}

#[test]
fn test_checkpoint_resumes_identically() {
    let catalog = hungry_catalog();
    let config = SimConfig::default();

    let mut world = World::new();
    let agora = world.add_locality("Agora");
    for weight in [1.0, 2.0, 3.0] {
        world
            .add_pop(agora, &DesireProfile::new().with_want(HUNGER, weight), 24)
            .unwrap();
    }
    world.add_firm(Firm::new(agora, 10.0).with_stock(BREAD, 5));

    run_turn(&mut world, &catalog, &config).unwrap();
    run_turn(&mut world, &catalog, &config).unwrap();

    let snapshot = world.checkpoint_json().unwrap();
    let mut restored = World::from_checkpoint_json(&snapshot).unwrap();

    let live = run_turn(&mut world, &catalog, &config).unwrap();
    let replay = run_turn(&mut restored, &catalog, &config).unwrap();

    assert_eq!(live.settlements, replay.settlements);
    assert_eq!(live.shortfalls, replay.shortfalls);
    assert_eq!(
        world.get_locality(agora).unwrap().amv(BREAD),
        restored.get_locality(agora).unwrap().amv(BREAD)
    );
    assert_eq!(
        world.checkpoint_json().unwrap(),
        restored.checkpoint_json().unwrap()
    );
}

#[test]
fn test_unanswered_bids_raise_next_turn_price() {
    let catalog = hungry_catalog();
    let config = SimConfig::default();
    let mut world = World::new();
    let agora = world.add_locality("Agora");
    world
        .add_pop(agora, &DesireProfile::new().with_want(HUNGER, 1.0), 24)
        .unwrap();
    // Open the book by hand; there is no seller to quote it into being.
    world
        .get_locality_mut(agora)
        .unwrap()
        .markets
        .insert(BREAD, MarketState::new(1.0));

    let report = run_turn(&mut world, &catalog, &config).unwrap();
    assert_eq!(
        report.shortfalls,
        vec![Shortfall::Liquidity {
            locality: agora,
            good: BREAD,
            unmet_bids: 1
        }]
    );
    assert_eq!(
        world.get_locality(agora).unwrap().amv(BREAD),
        Some(1.0),
        "pressure lands next turn, not this one"
    );

    run_turn(&mut world, &catalog, &config).unwrap();
    let amv = world.get_locality(agora).unwrap().amv(BREAD).unwrap();
    assert!((amv - 1.05).abs() < 1e-12, "expected a 5% step up, got {amv}");
}
