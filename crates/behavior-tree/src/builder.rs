//! Boxing shorthands for tree construction.
//!
//! `sequence(vec![condition(..), action(..)])` instead of nesting
//! `Box::new(Sequence::new(..))` by hand.

use crate::{Action, Behavior, Condition, Selector, Sequence, Status};

#[inline]
pub fn sequence<C: 'static>(children: Vec<Box<dyn Behavior<C>>>) -> Box<dyn Behavior<C>> {
    Box::new(Sequence::new(children))
}

#[inline]
pub fn selector<C: 'static>(children: Vec<Box<dyn Behavior<C>>>) -> Box<dyn Behavior<C>> {
    Box::new(Selector::new(children))
}

#[inline]
pub fn condition<C: 'static>(
    predicate: impl Fn(&C) -> bool + Send + Sync + 'static,
) -> Box<dyn Behavior<C>> {
    Box::new(Condition::new(predicate))
}

#[inline]
pub fn action<C: 'static>(
    act: impl Fn(&mut C) -> Status + Send + Sync + 'static,
) -> Box<dyn Behavior<C>> {
    Box::new(Action::new(act))
}
