//! Identifiers for kernel-owned objects.
//!
//! The simulation owns every unit, aura, spell and dot in id-indexed arenas;
//! callbacks and rotation values hold these ids instead of references.
use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// A combatant: the simulated player or one of the encounter targets.
    UnitId,
    "unit"
);
arena_id!(AuraId, "aura");
arena_id!(SpellId, "spell");
arena_id!(DotId, "dot");
arena_id!(
    /// A repeating action started with [`crate::Simulation::start_periodic_action`].
    PeriodicId,
    "periodic"
);

/// Metric key for an ability or effect.
///
/// `tag` distinguishes sub-effects that share a spell id (e.g. the damage
/// and healing halves of a bouncing spell).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionId {
    pub spell_id: u32,
    pub tag: i32,
}

impl ActionId {
    pub const fn spell(spell_id: u32) -> Self {
        Self { spell_id, tag: 0 }
    }

    pub const fn tagged(spell_id: u32, tag: i32) -> Self {
        Self { spell_id, tag }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag == 0 {
            write!(f, "{}", self.spell_id)
        } else {
            write!(f, "{}:{}", self.spell_id, self.tag)
        }
    }
}
