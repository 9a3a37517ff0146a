use runtime::{Encounter, RuntimeError, Scenario, run_encounter};
use sim_content::{
    ContentFactory, MonkSetup, MonkTalents, channel_rotation, default_rotation, idle_rotation,
    labels,
};
use sim_core::{ActionId, MetricKind, SimConfig, SimDuration, SimError, SimTime, UnitId};

const AUTO_ATTACK: ActionId = ActionId::spell(6603);
const CRACKLING_JADE_LIGHTNING: ActionId = ActionId::spell(117952);
const RUSHING_JADE_WIND_TICK: ActionId = ActionId::spell(148187);

fn bundled(seed: u64, secs: u64) -> Scenario {
    let factory = ContentFactory::bundled();
    Scenario::new(
        factory
            .load_config()
            .unwrap()
            .with_seed(seed)
            .with_duration(SimDuration::from_secs(secs)),
        factory.load_setup().unwrap(),
        factory.load_rotation().unwrap(),
    )
}

#[test]
fn bundled_content_runs_cleanly() {
    let report = run_encounter(&bundled(24301, 60)).unwrap();

    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert_eq!(report.duration, SimDuration::from_secs(60));
    assert!(report.dps > 0.0);
    let jab = report.action(labels::JAB).unwrap();
    assert!(jab.casts > 0);
    assert_eq!(jab.hits, jab.casts);
    assert!(report.action(labels::TIGER_PALM).is_some_and(|row| row.casts > 0));
}

#[test]
fn same_seed_reproduces_every_metric_event() {
    let mut first = Encounter::new(&bundled(99, 60)).unwrap();
    let mut second = Encounter::new(&bundled(99, 60)).unwrap();
    let first_report = first.run().unwrap();
    let second_report = second.run().unwrap();

    assert_eq!(
        first.simulation().metrics().events(),
        second.simulation().metrics().events()
    );
    assert_eq!(first_report, second_report);

    let mut other = Encounter::new(&bundled(100, 60)).unwrap();
    other.run().unwrap();
    assert_ne!(
        first.simulation().metrics().events(),
        other.simulation().metrics().events()
    );
}

#[test]
fn starved_channel_hands_back_melee_in_the_same_instant() {
    // Back-to-back channels from a full bar: the first runs its six ticks
    // (ending on 30 energy), the second is recast at 6.1s after the reaction
    // delay and pays three ticks before 11 energy cannot cover the fourth.
    let config = SimConfig::default().with_duration(SimDuration::from_millis(10_150));
    let scenario = Scenario::new(config, MonkSetup::default(), channel_rotation());
    let mut encounter = Encounter::new(&scenario).unwrap();
    encounter.run().unwrap();

    let sim = encounter.simulation();
    let events = sim.metrics().events();
    let lightning_hits = events
        .iter()
        .filter(|e| e.action == CRACKLING_JADE_LIGHTNING && matches!(e.kind, MetricKind::Damage { .. }))
        .count();
    let lightning_casts = events
        .iter()
        .filter(|e| e.action == CRACKLING_JADE_LIGHTNING && e.kind == MetricKind::Cast)
        .count();
    assert_eq!(lightning_casts, 2);
    assert_eq!(lightning_hits, 9);

    let starved_at = SimTime::from_millis(10_100);
    assert!(events.iter().any(|e| {
        e.action == AUTO_ATTACK && e.at == starved_at && matches!(e.kind, MetricKind::Damage { .. })
    }));
    let monk = encounter.monk().unit;
    assert!(sim.unit(monk).unwrap().cast_state().is_idle());
    assert_eq!(
        sim.gcd_ready_at(monk),
        starved_at + SimConfig::DEFAULT_CHANNEL_CLIP_DELAY
    );
}

#[test]
fn idle_rotation_only_swings() {
    let config = SimConfig::default().with_duration(SimDuration::from_secs(30));
    let scenario = Scenario::new(config, MonkSetup::default(), idle_rotation(1.0));
    let report = run_encounter(&scenario).unwrap();

    assert!(report.total_damage > 0.0);
    assert!(report.action(labels::JAB).is_none());
    assert!(report.actions.iter().all(|row| row.action == AUTO_ATTACK || row.damage == 0.0));
}

#[test]
fn rushing_jade_wind_hits_every_target() {
    let setup = MonkSetup::default().with_talents(MonkTalents {
        rushing_jade_wind: true,
        ..MonkTalents::default()
    });
    let config = SimConfig::default()
        .with_num_targets(3)
        .with_duration(SimDuration::from_secs(30));
    let mut encounter = Encounter::new(&Scenario::new(config, setup, default_rotation())).unwrap();
    let report = encounter.run().unwrap();

    assert!(report.action(labels::RUSHING_JADE_WIND).is_some_and(|row| row.casts > 0));
    let events = encounter.simulation().metrics().events();
    for target in [UnitId(0), UnitId(1), UnitId(2)] {
        assert!(events.iter().any(|e| {
            e.action == RUSHING_JADE_WIND_TICK
                && matches!(e.kind, MetricKind::Damage { target: hit, .. } if hit == target)
        }));
    }
}

#[test]
fn missing_talents_surface_as_diagnostics() {
    // The bundled rotation names Chi Wave, Chi Brew and Chi Sphere.
    let factory = ContentFactory::bundled();
    let scenario = Scenario::new(
        SimConfig::default().with_duration(SimDuration::from_secs(10)),
        MonkSetup::default(),
        factory.load_rotation().unwrap(),
    );
    let encounter = Encounter::new(&scenario).unwrap();
    let rules: Vec<_> = encounter
        .diagnostics()
        .iter()
        .filter_map(|d| d.rule.as_deref())
        .collect();
    assert_eq!(rules, ["chi_brew", "chi_wave", "chi_sphere"]);
}

#[test]
fn target_count_is_validated() {
    for num_targets in [0, SimConfig::MAX_TARGETS as u32 + 1] {
        let mut config = SimConfig::default();
        config.num_targets = num_targets;
        let scenario = Scenario::new(config, MonkSetup::default(), default_rotation());
        let err = Encounter::new(&scenario).err().unwrap();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}

#[test]
fn zero_timing_intervals_are_rejected_before_running() {
    let configs = [
        SimConfig::default().with_decision_poll_interval(SimDuration::ZERO),
        SimConfig::default().with_min_gcd(SimDuration::ZERO),
    ];
    for config in configs {
        let scenario = Scenario::new(
            config.with_duration(SimDuration::from_secs(10)),
            MonkSetup::default(),
            default_rotation(),
        );
        let err = Encounter::new(&scenario).err().unwrap();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }
}

#[test]
fn zero_swing_speed_aborts_the_encounter() {
    let setup = MonkSetup {
        swing_speed: SimDuration::ZERO,
        ..MonkSetup::default()
    };
    let scenario = Scenario::new(
        SimConfig::default().with_duration(SimDuration::from_secs(10)),
        setup,
        idle_rotation(1.0),
    );
    let err = run_encounter(&scenario).unwrap_err();
    assert!(matches!(err, RuntimeError::Kernel { .. }));
    assert_eq!(err.error_code(), "EFFECT_FAILED");
}
