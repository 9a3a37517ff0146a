//! Built-in rotations, used when no rotation file is given.
use sim_core::{
    ActionConfig, CompareOp, RotationConfig, RuleConfig, UnitReference, ValueConfig,
};

use crate::monk::labels;

/// Single-target priority for a talented monk. Rules naming spells the setup
/// lacks are dropped with a diagnostic when the rotation is built.
pub fn default_rotation() -> RotationConfig {
    let chi_at_least = |amount: i64| {
        ValueConfig::cmp(CompareOp::Ge, ValueConfig::CurrentChi, ValueConfig::int(amount))
    };
    RotationConfig::new(vec![
        RuleConfig::cast("chi_brew", labels::CHI_BREW)
            .when(ValueConfig::cmp(CompareOp::Le, ValueConfig::CurrentChi, ValueConfig::int(1))),
        RuleConfig::cast("tiger_palm", labels::TIGER_PALM).when(ValueConfig::Not(Box::new(
            ValueConfig::AuraIsActive {
                aura: labels::TIGER_POWER.into(),
                unit: UnitReference::Player,
            },
        ))),
        RuleConfig::cast("rushing_jade_wind", labels::RUSHING_JADE_WIND),
        RuleConfig::cast("chi_wave", labels::CHI_WAVE),
        RuleConfig::cast("blackout_kick", labels::BLACKOUT_KICK).when(chi_at_least(2)),
        RuleConfig::cast("chi_sphere", labels::CHI_SPHERE)
            .when(ValueConfig::cmp(CompareOp::Le, ValueConfig::CurrentChi, ValueConfig::int(2))),
        RuleConfig::cast("jab", labels::JAB),
    ])
}

/// Channels Crackling Jade Lightning whenever possible.
pub fn channel_rotation() -> RotationConfig {
    RotationConfig::new(vec![RuleConfig::cast(
        "crackling_jade_lightning",
        labels::CRACKLING_JADE_LIGHTNING,
    )])
}

/// Idles for `seconds` between decisions; useful as a baseline.
pub fn idle_rotation(seconds: f64) -> RotationConfig {
    RotationConfig::new(vec![RuleConfig {
        id: "wait".into(),
        action: ActionConfig::Wait {
            duration: ValueConfig::float(seconds),
        },
        condition: None,
        disabled: false,
    }])
}
