//! Trigger flags and per-group decisions.

use crate::record::GroupKey;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trigger conditions evaluated for every group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TriggerKind {
    /// High-energy photon cluster.
    Photon,
    /// Cluster matched to a charged track above threshold.
    Electron,
    /// Cluster pair with invariant mass above threshold.
    Pair,
    /// Neutral cluster with antineutron-like shower shape.
    Antineutron,
}

impl TriggerKind {
    /// All trigger kinds, in flag order.
    pub const ALL: [TriggerKind; 4] = [
        TriggerKind::Photon,
        TriggerKind::Electron,
        TriggerKind::Pair,
        TriggerKind::Antineutron,
    ];

    /// Bit index of this trigger in [`TriggerFlags`].
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            TriggerKind::Photon => 0,
            TriggerKind::Electron => 1,
            TriggerKind::Pair => 2,
            TriggerKind::Antineutron => 3,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TriggerKind::Photon => "photon",
            TriggerKind::Electron => "electron",
            TriggerKind::Pair => "pair",
            TriggerKind::Antineutron => "antineutron",
        }
    }

    #[inline]
    fn bit(self) -> u8 {
        1 << self.index()
    }
}

/// Fixed-size set of trigger flags stored as a bitmask.
///
/// Flags only ever go from false to true while a group is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriggerFlags(u8);

impl TriggerFlags {
    /// No flag set.
    pub const NONE: TriggerFlags = TriggerFlags(0);

    /// Builds a flag set from the given kinds.
    #[must_use]
    pub fn from_kinds(kinds: &[TriggerKind]) -> Self {
        Self(kinds.iter().fold(0, |bits, kind| bits | kind.bit()))
    }

    /// ORs `fired` into the flag for `kind`.
    #[inline]
    pub fn raise(&mut self, kind: TriggerKind, fired: bool) {
        if fired {
            self.0 |= kind.bit();
        }
    }

    #[inline]
    #[must_use]
    pub fn get(self, kind: TriggerKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Returns true if every flag in `mask` is set.
    #[inline]
    #[must_use]
    pub fn contains(self, mask: TriggerFlags) -> bool {
        self.0 & mask.0 == mask.0
    }

    #[inline]
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the kinds that are set.
    pub fn iter(self) -> impl Iterator<Item = TriggerKind> {
        TriggerKind::ALL.into_iter().filter(move |kind| self.get(*kind))
    }
}

/// Outcome of the trigger scan for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriggerDecision {
    /// Group the decision belongs to.
    pub key: GroupKey,
    /// Flags raised by any record or pair of the group.
    pub flags: TriggerFlags,
}

impl TriggerDecision {
    #[must_use]
    pub fn new(key: GroupKey, flags: TriggerFlags) -> Self {
        Self { key, flags }
    }

    #[inline]
    #[must_use]
    pub fn fired(&self, kind: TriggerKind) -> bool {
        self.flags.get(kind)
    }

    /// Returns true if any trigger fired, i.e. the event is kept.
    #[inline]
    #[must_use]
    pub fn keep(&self) -> bool {
        !self.flags.is_empty()
    }
}

impl fmt::Display for TriggerDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {}:", self.key)?;
        if self.flags.is_empty() {
            return write!(f, " none");
        }
        for kind in self.flags.iter() {
            write!(f, " {}", kind.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_monotonic() {
        let mut flags = TriggerFlags::default();
        flags.raise(TriggerKind::Photon, true);
        flags.raise(TriggerKind::Photon, false);
        assert!(flags.get(TriggerKind::Photon));
        assert!(!flags.get(TriggerKind::Pair));
    }

    #[test]
    fn test_contains_mask() {
        let flags = TriggerFlags::from_kinds(&[TriggerKind::Photon, TriggerKind::Pair]);
        assert!(flags.contains(TriggerFlags::from_kinds(&[TriggerKind::Photon])));
        assert!(flags.contains(TriggerFlags::NONE));
        assert!(!flags.contains(TriggerFlags::from_kinds(&[
            TriggerKind::Photon,
            TriggerKind::Electron
        ])));
        assert_eq!(flags.bits(), 0b0101);
    }

    #[test]
    fn test_decision_display() {
        let decision = TriggerDecision::new(
            GroupKey(4),
            TriggerFlags::from_kinds(&[TriggerKind::Electron, TriggerKind::Antineutron]),
        );
        assert_eq!(decision.to_string(), "group 4: electron antineutron");
        assert!(decision.keep());
        assert_eq!(
            TriggerDecision::new(GroupKey(5), TriggerFlags::NONE).to_string(),
            "group 5: none"
        );
    }
}
