//! Core behavior trait.

use crate::Status;

/// A node that can be ticked against a context.
///
/// The context is the node's only window onto the world: conditions read
/// it, actions mutate it. Nodes hold no per-tick state.
pub trait Behavior<C>: Send + Sync {
    fn tick(&self, ctx: &mut C) -> Status;
}

impl<C> Behavior<C> for Box<dyn Behavior<C>> {
    #[inline]
    fn tick(&self, ctx: &mut C) -> Status {
        (**self).tick(ctx)
    }
}
