//! Composite behavior nodes.
//!
//! [`Sequence`] is a short-circuited AND over its children, [`Selector`] a
//! short-circuited OR. A rotation is a selector of per-rule sequences.

use crate::{Behavior, Status};

/// Ticks children left to right until one fails.
///
/// An empty sequence succeeds, like an empty AND.
pub struct Sequence<C> {
    children: Vec<Box<dyn Behavior<C>>>,
}

impl<C> Sequence<C> {
    pub fn new(children: Vec<Box<dyn Behavior<C>>>) -> Self {
        Self { children }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<C> Behavior<C> for Sequence<C> {
    fn tick(&self, ctx: &mut C) -> Status {
        for child in &self.children {
            if child.tick(ctx).is_failure() {
                return Status::Failure;
            }
        }
        Status::Success
    }
}

/// Ticks children left to right until one succeeds.
///
/// An empty selector fails, like an empty OR.
pub struct Selector<C> {
    children: Vec<Box<dyn Behavior<C>>>,
}

impl<C> Selector<C> {
    pub fn new(children: Vec<Box<dyn Behavior<C>>>) -> Self {
        Self { children }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Ticks like [`Behavior::tick`] and returns the index of the child
    /// that succeeded, if any.
    pub fn tick_indexed(&self, ctx: &mut C) -> Option<usize> {
        self.children
            .iter()
            .position(|child| child.tick(ctx).is_success())
    }
}

impl<C> Behavior<C> for Selector<C> {
    fn tick(&self, ctx: &mut C) -> Status {
        self.tick_indexed(ctx).is_some().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{action, condition};

    struct Counter {
        value: i32,
    }

    fn increment() -> Box<dyn Behavior<Counter>> {
        action(|ctx: &mut Counter| {
            ctx.value += 1;
            Status::Success
        })
    }

    fn refuse() -> Box<dyn Behavior<Counter>> {
        action(|_: &mut Counter| Status::Failure)
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let seq = Sequence::new(vec![increment(), refuse(), increment()]);

        let mut ctx = Counter { value: 0 };
        assert_eq!(seq.tick(&mut ctx), Status::Failure);
        assert_eq!(ctx.value, 1);
    }

    #[test]
    fn sequence_gates_an_action_behind_a_condition() {
        let seq = Sequence::new(vec![condition(|ctx: &Counter| ctx.value < 2), increment()]);

        let mut ctx = Counter { value: 0 };
        assert!(seq.tick(&mut ctx).is_success());
        assert!(seq.tick(&mut ctx).is_success());
        assert!(seq.tick(&mut ctx).is_failure());
        assert_eq!(ctx.value, 2);
    }

    #[test]
    fn selector_reports_the_first_child_that_succeeds() {
        let sel = Selector::new(vec![refuse(), increment(), increment()]);

        let mut ctx = Counter { value: 0 };
        assert_eq!(sel.tick_indexed(&mut ctx), Some(1));
        assert_eq!(ctx.value, 1);
    }

    #[test]
    fn empty_composites_follow_and_or_identities() {
        let mut ctx = Counter { value: 0 };
        assert!(Sequence::new(Vec::new()).tick(&mut ctx).is_success());

        let sel: Selector<Counter> = Selector::new(Vec::new());
        assert!(sel.is_empty());
        assert_eq!(sel.tick_indexed(&mut ctx), None);
        assert!(sel.tick(&mut ctx).is_failure());
    }
}
