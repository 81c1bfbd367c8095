//! Group boundary detection on a stream sorted by group key.
//!
//! The detector keeps the currently open key as an `Option`, so no sentinel
//! value can collide with a real key. The first record of the stream opens a
//! group without closing one; every later key change closes the open group.

use evfilter_core::{Error, GroupKey, Result};
use std::collections::HashSet;

/// What observing a record's key did to the open group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// First record of the stream; a group was opened.
    Opened,
    /// The record belongs to the open group.
    Continued,
    /// The open group `closed` ended and a new group was opened.
    Crossed {
        /// Key of the group that just ended.
        closed: GroupKey,
    },
}

/// Single-pass detector of group boundaries.
#[derive(Debug, Default)]
pub struct GroupBoundaryDetector {
    current: Option<GroupKey>,
    /// Keys of closed groups, tracked only when ordering is validated.
    closed: Option<HashSet<GroupKey>>,
    groups_opened: usize,
}

impl GroupBoundaryDetector {
    /// Creates a detector; with `validate_ordering` a reappearing key is an error.
    #[must_use]
    pub fn new(validate_ordering: bool) -> Self {
        Self {
            current: None,
            closed: validate_ordering.then(HashSet::new),
            groups_opened: 0,
        }
    }

    /// Feeds the key of the next record.
    ///
    /// # Errors
    /// Returns [`Error::PreconditionViolation`] if ordering is validated and
    /// `key` belongs to a group that was already closed.
    pub fn observe(&mut self, key: GroupKey) -> Result<Boundary> {
        match self.current {
            Some(current) if current == key => Ok(Boundary::Continued),
            Some(current) => {
                if let Some(closed) = self.closed.as_mut() {
                    closed.insert(current);
                    if closed.contains(&key) {
                        return Err(Error::PreconditionViolation { key });
                    }
                }
                self.current = Some(key);
                self.groups_opened += 1;
                Ok(Boundary::Crossed { closed: current })
            }
            None => {
                if self.closed.as_ref().is_some_and(|closed| closed.contains(&key)) {
                    return Err(Error::PreconditionViolation { key });
                }
                self.current = Some(key);
                self.groups_opened += 1;
                Ok(Boundary::Opened)
            }
        }
    }

    /// Key of the open group, if any.
    #[must_use]
    pub fn current(&self) -> Option<GroupKey> {
        self.current
    }

    /// Number of groups opened so far.
    #[must_use]
    pub fn groups_opened(&self) -> usize {
        self.groups_opened
    }

    /// Closes the open group at end of stream and returns its key.
    ///
    /// The detector can be reused afterwards; with validation enabled the
    /// closed key stays forbidden.
    pub fn finish(&mut self) -> Option<GroupKey> {
        let last = self.current.take();
        if let (Some(key), Some(closed)) = (last, self.closed.as_mut()) {
            closed.insert(key);
        }
        last
    }
}
