//! Leaf nodes backed by closures.
//!
//! Callers compile their own rule representation into closures once, at
//! tree construction, so ticking never re-parses anything.

use crate::{Behavior, Status};

/// Succeeds when the predicate holds. Never mutates the context.
pub struct Condition<F> {
    predicate: F,
}

impl<F> Condition<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<C, F> Behavior<C> for Condition<F>
where
    F: Fn(&C) -> bool + Send + Sync,
{
    #[inline]
    fn tick(&self, ctx: &mut C) -> Status {
        (self.predicate)(ctx).into()
    }
}

/// Acts on the context and reports whether it did anything.
pub struct Action<F> {
    act: F,
}

impl<F> Action<F> {
    pub fn new(act: F) -> Self {
        Self { act }
    }
}

impl<C, F> Behavior<C> for Action<F>
where
    F: Fn(&mut C) -> Status + Send + Sync,
{
    #[inline]
    fn tick(&self, ctx: &mut C) -> Status {
        (self.act)(ctx)
    }
}
