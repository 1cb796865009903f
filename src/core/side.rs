//! Side identification and per-side data storage.
//!
//! ## SideId
//!
//! An encounter always has exactly three sides: the neutral faction (0) and
//! the two competing parties (1 and 2).
//!
//! ## SideMap
//!
//! Fixed-size per-side storage with O(1) access, indexable by `SideId`.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// One of the three sides of an encounter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SideId {
    /// The neutral faction (side 0).
    #[default]
    Neutral,
    /// The first competing party (side 1).
    One,
    /// The second competing party (side 2).
    Two,
}

impl SideId {
    /// All sides in index order.
    pub const ALL: [SideId; 3] = [SideId::Neutral, SideId::One, SideId::Two];

    /// The two competing sides.
    pub const PARTIES: [SideId; 2] = [SideId::One, SideId::Two];

    /// Side from its numeric index (0, 1 or 2).
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(SideId::Neutral),
            1 => Some(SideId::One),
            2 => Some(SideId::Two),
            _ => None,
        }
    }

    /// Numeric index of this side.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            SideId::Neutral => 0,
            SideId::One => 1,
            SideId::Two => 2,
        }
    }

    /// The opposing party. The neutral side has no opponent.
    #[must_use]
    pub const fn opponent(self) -> Option<Self> {
        match self {
            SideId::Neutral => None,
            SideId::One => Some(SideId::Two),
            SideId::Two => Some(SideId::One),
        }
    }

    /// Is this the neutral faction?
    #[must_use]
    pub const fn is_neutral(self) -> bool {
        matches!(self, SideId::Neutral)
    }
}

impl std::fmt::Display for SideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Side {}", self.index())
    }
}

/// Per-side data storage with O(1) access.
///
/// ## Example
///
/// ```
/// use rust_parley::core::{SideId, SideMap};
///
/// let mut morale: SideMap<i32> = SideMap::new(|_| 10);
/// morale[SideId::Two] -= 3;
///
/// assert_eq!(morale[SideId::One], 10);
/// assert_eq!(morale[SideId::Two], 7);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideMap<T> {
    data: [T; 3],
}

impl<T> SideMap<T> {
    /// Create a SideMap with values from a factory function.
    pub fn new(factory: impl Fn(SideId) -> T) -> Self {
        Self {
            data: SideId::ALL.map(factory),
        }
    }

    /// Create a SideMap with all entries set to the same value.
    pub fn with_value(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(|_| value.clone())
    }

    /// Get a reference to a side's data.
    #[must_use]
    pub fn get(&self, side: SideId) -> &T {
        &self.data[side.index()]
    }

    /// Get a mutable reference to a side's data.
    pub fn get_mut(&mut self, side: SideId) -> &mut T {
        &mut self.data[side.index()]
    }

    /// Iterate over (SideId, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (SideId, &T)> {
        SideId::ALL.into_iter().zip(self.data.iter())
    }

    /// Iterate over (SideId, &mut T) pairs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SideId, &mut T)> {
        SideId::ALL.into_iter().zip(self.data.iter_mut())
    }
}

impl<T> Index<SideId> for SideMap<T> {
    type Output = T;

    fn index(&self, side: SideId) -> &Self::Output {
        self.get(side)
    }
}

impl<T> IndexMut<SideId> for SideMap<T> {
    fn index_mut(&mut self, side: SideId) -> &mut Self::Output {
        self.get_mut(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_index_roundtrip() {
        for side in SideId::ALL {
            assert_eq!(SideId::from_index(side.index() as u8), Some(side));
        }
        assert_eq!(SideId::from_index(3), None);
    }

    #[test]
    fn test_opponent() {
        assert_eq!(SideId::One.opponent(), Some(SideId::Two));
        assert_eq!(SideId::Two.opponent(), Some(SideId::One));
        assert_eq!(SideId::Neutral.opponent(), None);
    }

    #[test]
    fn test_side_map_new() {
        let map: SideMap<usize> = SideMap::new(|s| s.index() * 10);

        assert_eq!(map[SideId::Neutral], 0);
        assert_eq!(map[SideId::One], 10);
        assert_eq!(map[SideId::Two], 20);
    }

    #[test]
    fn test_side_map_mutation() {
        let mut map: SideMap<Vec<u32>> = SideMap::default();
        map[SideId::One].push(4);

        assert_eq!(map[SideId::One], vec![4]);
        assert!(map[SideId::Two].is_empty());
    }

    #[test]
    fn test_side_map_iter_order() {
        let map: SideMap<u8> = SideMap::with_value(1);
        let sides: Vec<_> = map.iter().map(|(s, _)| s).collect();
        assert_eq!(sides, SideId::ALL.to_vec());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SideId::Two), "Side 2");
    }
}
