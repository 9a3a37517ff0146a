//! Typed resource pools.
//!
//! A unit owns one [`ResourcePool`] per [`ResourceKind`] it can use; the
//! [`ResourceSet`] map doubles as the unit's capability table. Regeneration
//! accrues lazily: a pool stores the value it had at its last settlement and
//! derives the current value from the elapsed time at read time.

use std::collections::BTreeMap;

use crate::error::{ErrorSeverity, SimError};
use crate::ids::UnitId;
use crate::time::{SimDuration, SimTime};

/// Tolerance for float comparisons on affordability checks.
const EPSILON: f64 = 1e-9;

// ============================================================================
// Resource Kind
// ============================================================================

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResourceKind {
    Health,
    Mana,
    Rage,
    Energy,
    Focus,
    ComboPoints,
    RunicPower,
    Chi,
}

impl ResourceKind {
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Mana => "Mana",
            Self::Rage => "Rage",
            Self::Energy => "Energy",
            Self::Focus => "Focus",
            Self::ComboPoints => "Combo Points",
            Self::RunicPower => "Runic Power",
            Self::Chi => "Chi",
        }
    }

    /// Whether the resource is counted in whole units (chi, combo points,
    /// runic power) rather than as a continuous amount.
    pub const fn is_discrete(self) -> bool {
        matches!(self, Self::ComboPoints | Self::RunicPower | Self::Chi)
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ResourceError {
    #[error("insufficient {resource}: need {cost}, have {current}")]
    Insufficient {
        resource: ResourceKind,
        cost: f64,
        current: f64,
    },

    #[error("invalid {resource} amount {amount} passed to {operation}")]
    InvalidAmount {
        resource: ResourceKind,
        operation: &'static str,
        amount: f64,
    },

    #[error("unit {unit} has no {resource} pool")]
    Missing { unit: UnitId, resource: ResourceKind },
}

impl SimError for ResourceError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Insufficient { .. } => ErrorSeverity::Recoverable,
            Self::InvalidAmount { .. } => ErrorSeverity::Fatal,
            Self::Missing { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Insufficient { .. } => "INSUFFICIENT_RESOURCE",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::Missing { .. } => "MISSING_RESOURCE",
        }
    }
}

// ============================================================================
// Resource Pool
// ============================================================================

/// A single accumulator with `0 <= current <= max`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourcePool {
    kind: ResourceKind,
    current: f64,
    max: f64,
    /// Base regeneration per second.
    regen_per_second: f64,
    regen_multiplier: f64,
    /// Time at which `current` was last brought up to date.
    settled_at: SimTime,
}

impl ResourcePool {
    pub fn new(kind: ResourceKind, current: f64, max: f64) -> Self {
        let max = if max.is_finite() { max.max(0.0) } else { 0.0 };
        let current = if current.is_finite() { current.clamp(0.0, max) } else { 0.0 };
        Self {
            kind,
            current,
            max,
            regen_per_second: 0.0,
            regen_multiplier: 1.0,
            settled_at: SimTime::ZERO,
        }
    }

    /// A pool that starts full.
    pub fn full(kind: ResourceKind, max: f64) -> Self {
        Self::new(kind, max, max)
    }

    pub fn with_regen(mut self, per_second: f64) -> Self {
        self.regen_per_second = if per_second.is_finite() { per_second.max(0.0) } else { 0.0 };
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Effective regeneration per second, multipliers included.
    pub fn regen_rate(&self) -> f64 {
        self.regen_per_second * self.regen_multiplier
    }

    /// Current value including regeneration accrued up to `now`.
    pub fn current_at(&self, now: SimTime) -> f64 {
        let rate = self.regen_rate();
        if rate <= 0.0 || now <= self.settled_at {
            return self.current;
        }
        let accrued = rate * (now - self.settled_at).as_secs_f64();
        (self.current + accrued).min(self.max)
    }

    /// Fraction of max in `[0, 1]`; zero for an empty-capacity pool.
    pub fn fraction_at(&self, now: SimTime) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        self.current_at(now) / self.max
    }

    fn settle(&mut self, now: SimTime) {
        self.current = self.current_at(now);
        if now > self.settled_at {
            self.settled_at = now;
        }
    }

    fn validate(&self, amount: f64, operation: &'static str) -> Result<(), ResourceError> {
        if amount.is_finite() && amount >= 0.0 {
            Ok(())
        } else {
            Err(ResourceError::InvalidAmount {
                resource: self.kind,
                operation,
                amount,
            })
        }
    }

    pub fn can_afford(&self, cost: f64, now: SimTime) -> bool {
        self.current_at(now) + EPSILON >= cost
    }

    /// Deducts `cost`. An unaffordable spend is rejected and leaves the pool
    /// untouched. Returns the remaining amount.
    pub fn spend(&mut self, cost: f64, now: SimTime) -> Result<f64, ResourceError> {
        self.validate(cost, "spend")?;
        let current = self.current_at(now);
        if current + EPSILON < cost {
            return Err(ResourceError::Insufficient {
                resource: self.kind,
                cost,
                current,
            });
        }
        self.settle(now);
        self.current = (self.current - cost).max(0.0);
        Ok(self.current)
    }

    /// Adds `amount`, clamped to max. Returns the amount actually gained.
    pub fn gain(&mut self, amount: f64, now: SimTime) -> Result<f64, ResourceError> {
        self.validate(amount, "gain")?;
        self.settle(now);
        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        Ok(self.current - before)
    }

    /// Removes up to `amount` without rejection (incoming damage). Returns
    /// the amount actually removed.
    pub fn drain(&mut self, amount: f64, now: SimTime) -> Result<f64, ResourceError> {
        self.validate(amount, "drain")?;
        self.settle(now);
        let before = self.current;
        self.current = (self.current - amount).max(0.0);
        Ok(before - self.current)
    }

    /// Changes the capacity. Lowering it clamps the current value.
    pub fn set_max(&mut self, max: f64, now: SimTime) -> Result<(), ResourceError> {
        self.validate(max, "set_max")?;
        self.settle(now);
        self.max = max;
        self.current = self.current.min(max);
        Ok(())
    }

    /// Scales regeneration by `factor`. Reverting applies `1.0 / factor`.
    pub fn multiply_regen(&mut self, factor: f64, now: SimTime) -> Result<(), ResourceError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ResourceError::InvalidAmount {
                resource: self.kind,
                operation: "multiply_regen",
                amount: factor,
            });
        }
        self.settle(now);
        self.regen_multiplier *= factor;
        Ok(())
    }

    /// Time until the pool will hold at least `amount` through regeneration
    /// alone. `None` if it never will.
    pub fn time_until(&self, amount: f64, now: SimTime) -> Option<SimDuration> {
        let current = self.current_at(now);
        if current + EPSILON >= amount {
            return Some(SimDuration::ZERO);
        }
        let rate = self.regen_rate();
        if rate <= 0.0 || amount > self.max + EPSILON {
            return None;
        }
        Some(SimDuration::from_secs_f64((amount - current) / rate))
    }
}

// ============================================================================
// Resource Set
// ============================================================================

/// Per-unit capability table: `ResourceKind -> ResourcePool`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceSet {
    pools: BTreeMap<ResourceKind, ResourcePool>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, pool: ResourcePool) -> Self {
        self.insert(pool);
        self
    }

    /// Inserts or replaces the pool for `pool.kind()`.
    pub fn insert(&mut self, pool: ResourcePool) {
        self.pools.insert(pool.kind(), pool);
    }

    pub fn has(&self, kind: ResourceKind) -> bool {
        self.pools.contains_key(&kind)
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&ResourcePool> {
        self.pools.get(&kind)
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> Option<&mut ResourcePool> {
        self.pools.get_mut(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.pools.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy(current: f64) -> ResourcePool {
        ResourcePool::new(ResourceKind::Energy, current, 100.0).with_regen(10.0)
    }

    #[test]
    fn spend_rejects_underflow_and_leaves_state() {
        let mut pool = ResourcePool::new(ResourceKind::Chi, 1.0, 4.0);
        let before = pool.clone();
        let err = pool.spend(2.0, SimTime::ZERO).unwrap_err();
        assert!(matches!(err, ResourceError::Insufficient { .. }));
        assert_eq!(pool, before);
        assert_eq!(pool.spend(1.0, SimTime::ZERO).unwrap(), 0.0);
        assert!(pool.current_at(SimTime::ZERO) >= 0.0);
    }

    #[test]
    fn spend_never_goes_negative_across_many_calls() {
        let mut pool = energy(50.0);
        let mut now = SimTime::ZERO;
        for _ in 0..200 {
            let _ = pool.spend(13.0, now);
            assert!(pool.current_at(now) >= 0.0);
            now += SimDuration::from_millis(250);
        }
    }

    #[test]
    fn regen_accrues_lazily_and_caps() {
        let pool = energy(15.0);
        assert_eq!(pool.current_at(SimTime::from_millis(500)), 20.0);
        assert_eq!(pool.current_at(SimTime::from_secs(60)), 100.0);
    }

    #[test]
    fn gain_clamps_and_reports_actual() {
        let mut pool = ResourcePool::new(ResourceKind::Chi, 3.0, 4.0);
        assert_eq!(pool.gain(2.0, SimTime::ZERO).unwrap(), 1.0);
        assert_eq!(pool.current_at(SimTime::ZERO), 4.0);
    }

    #[test]
    fn negative_and_non_finite_amounts_are_rejected() {
        let mut pool = energy(50.0);
        assert!(matches!(
            pool.spend(-1.0, SimTime::ZERO),
            Err(ResourceError::InvalidAmount { operation: "spend", .. })
        ));
        assert!(matches!(
            pool.gain(f64::INFINITY, SimTime::ZERO),
            Err(ResourceError::InvalidAmount { operation: "gain", .. })
        ));
        assert_eq!(pool.current_at(SimTime::ZERO), 50.0);
    }

    #[test]
    fn regen_multiplier_reverts_symmetrically() {
        let mut pool = energy(0.0);
        pool.multiply_regen(1.15, SimTime::ZERO).unwrap();
        assert!((pool.regen_rate() - 11.5).abs() < 1e-9);
        pool.multiply_regen(1.0 / 1.15, SimTime::from_secs(1)).unwrap();
        assert!((pool.regen_rate() - 10.0).abs() < 1e-9);
        assert!((pool.current_at(SimTime::from_secs(1)) - 11.5).abs() < 1e-9);
    }

    #[test]
    fn lowering_max_clamps_current() {
        let mut pool = ResourcePool::new(ResourceKind::Chi, 5.0, 5.0);
        pool.set_max(4.0, SimTime::ZERO).unwrap();
        assert_eq!(pool.current_at(SimTime::ZERO), 4.0);
    }

    #[test]
    fn time_until_affordable() {
        let pool = energy(15.0);
        assert_eq!(
            pool.time_until(20.0, SimTime::ZERO),
            Some(SimDuration::from_millis(500))
        );
        let chi = ResourcePool::new(ResourceKind::Chi, 0.0, 4.0);
        assert_eq!(chi.time_until(1.0, SimTime::ZERO), None);
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        use std::str::FromStr;
        assert_eq!(ResourceKind::from_str("Energy").unwrap(), ResourceKind::Energy);
        assert_eq!(ResourceKind::from_str("runic_power").unwrap(), ResourceKind::RunicPower);
        assert_eq!(ResourceKind::ComboPoints.to_string(), "combo_points");
    }

    #[test]
    fn capability_lookup() {
        let set = ResourceSet::new().with_pool(energy(0.0));
        assert!(set.has(ResourceKind::Energy));
        assert!(!set.has(ResourceKind::Mana));
    }
}
