//! Status returned by behavior nodes.

/// The result of ticking a behavior node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The condition held, or the action was taken.
    Success,

    /// The condition did not hold, or the action was refused.
    Failure,
}

impl Status {
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure)
    }
}

impl From<bool> for Status {
    #[inline]
    fn from(value: bool) -> Self {
        if value { Status::Success } else { Status::Failure }
    }
}
