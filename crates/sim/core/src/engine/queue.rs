//! Time-ordered pending-action queue.
//!
//! Entries are keyed by `(fire_at, priority, sequence)`, so iteration order is
//! the execution order and the key doubles as the cancellation handle.
use std::collections::BTreeMap;
use std::fmt;

use crate::engine::Simulation;
use crate::error::SimResult;
use crate::ids::UnitId;
use crate::time::SimTime;

/// Ordering of actions that fire at the same instant. `High` runs first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionPriority {
    High,
    #[default]
    Normal,
    Low,
}

/// Handle returned by scheduling; cancelling a consumed handle is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionHandle {
    fire_at: SimTime,
    priority: ActionPriority,
    sequence: u64,
}

impl ActionHandle {
    pub fn fire_at(&self) -> SimTime {
        self.fire_at
    }

    pub fn priority(&self) -> ActionPriority {
        self.priority
    }
}

/// Callback run by the clock when its action comes due.
pub type ActionFn = Box<dyn FnOnce(&mut Simulation) -> SimResult<()> + Send>;

pub(crate) enum Scheduled {
    Callback(ActionFn),
    /// Handed back to the caller of `advance()` instead of executing.
    Decision(UnitId),
}

impl fmt::Debug for Scheduled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::Decision(unit) => f.debug_tuple("Decision").field(unit).finish(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ActionQueue {
    entries: BTreeMap<ActionHandle, Scheduled>,
    next_sequence: u64,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(
        &mut self,
        fire_at: SimTime,
        priority: ActionPriority,
        scheduled: Scheduled,
    ) -> ActionHandle {
        let handle = ActionHandle {
            fire_at,
            priority,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.entries.insert(handle, scheduled);
        handle
    }

    /// Removes a pending entry. Returns `false` if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, handle: ActionHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    pub fn contains(&self, handle: ActionHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub(crate) fn pop_next(&mut self) -> Option<(ActionHandle, Scheduled)> {
        self.entries.pop_first()
    }

    pub fn peek_time(&self) -> Option<SimTime> {
        self.entries.keys().next().map(|handle| handle.fire_at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(unit: u32) -> Scheduled {
        Scheduled::Decision(UnitId(unit))
    }

    fn drain(queue: &mut ActionQueue) -> Vec<u32> {
        let mut order = Vec::new();
        while let Some((_, scheduled)) = queue.pop_next() {
            if let Scheduled::Decision(unit) = scheduled {
                order.push(unit.0);
            }
        }
        order
    }

    #[test]
    fn orders_by_time_then_priority_then_insertion() {
        let mut queue = ActionQueue::new();
        let t1 = SimTime::from_secs(1);
        let t2 = SimTime::from_secs(2);
        queue.push(t2, ActionPriority::High, decision(0));
        queue.push(t1, ActionPriority::Low, decision(1));
        queue.push(t1, ActionPriority::Normal, decision(2));
        queue.push(t1, ActionPriority::Normal, decision(3));
        queue.push(t1, ActionPriority::High, decision(4));

        assert_eq!(drain(&mut queue), vec![4, 2, 3, 1, 0]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut queue = ActionQueue::new();
        let handle = queue.push(SimTime::from_secs(1), ActionPriority::Normal, decision(0));
        assert!(queue.contains(handle));
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert!(queue.is_empty());
    }

    #[test]
    fn cancelling_consumed_handle_is_noop() {
        let mut queue = ActionQueue::new();
        let handle = queue.push(SimTime::ZERO, ActionPriority::Normal, decision(0));
        let keep = queue.push(SimTime::ZERO, ActionPriority::Normal, decision(1));
        let (popped, _) = queue.pop_next().unwrap();
        assert_eq!(popped, handle);
        assert!(!queue.cancel(handle));
        assert!(queue.contains(keep));
        assert_eq!(queue.peek_time(), Some(SimTime::ZERO));
    }
}
