//! Update reasons and their sets.

use std::fmt;
use std::ops::{BitOr, BitOrAssign, Sub};

/// Why a view needs work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateFlag {
    /// Place the view's root node into its layer.
    Insert,
    /// Tear the view down.
    Remove,
    /// The view was just created.
    Init,
    /// Build the view's node structure.
    Render,
    /// Recompute everything derived from the model.
    Update,
    Translate,
    Resize,
    Rotate,
    /// Re-read the link source end.
    Source,
    /// Re-read the link target end.
    Target,
    /// Re-run the connector over the current route.
    Connector,
}

impl UpdateFlag {
    pub const ALL: [UpdateFlag; 11] = [
        UpdateFlag::Insert,
        UpdateFlag::Remove,
        UpdateFlag::Init,
        UpdateFlag::Render,
        UpdateFlag::Update,
        UpdateFlag::Translate,
        UpdateFlag::Resize,
        UpdateFlag::Rotate,
        UpdateFlag::Source,
        UpdateFlag::Target,
        UpdateFlag::Connector,
    ];

    fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// A set of [`UpdateFlag`]s.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UpdateFlags(u16);

impl UpdateFlags {
    pub const EMPTY: UpdateFlags = UpdateFlags(0);

    pub fn of(flags: &[UpdateFlag]) -> Self {
        flags.iter().copied().fold(Self::EMPTY, |acc, f| acc | f)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, flag: UpdateFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn contains_all(self, other: UpdateFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: UpdateFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, flag: UpdateFlag) {
        self.0 |= flag.bit();
    }

    pub fn remove(&mut self, flag: UpdateFlag) {
        self.0 &= !flag.bit();
    }

    pub fn without(self, other: UpdateFlags) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = UpdateFlag> {
        UpdateFlag::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl From<UpdateFlag> for UpdateFlags {
    fn from(flag: UpdateFlag) -> Self {
        Self(flag.bit())
    }
}

impl BitOr for UpdateFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<UpdateFlag> for UpdateFlags {
    type Output = Self;

    fn bitor(self, rhs: UpdateFlag) -> Self {
        Self(self.0 | rhs.bit())
    }
}

impl BitOr for UpdateFlag {
    type Output = UpdateFlags;

    fn bitor(self, rhs: Self) -> UpdateFlags {
        UpdateFlags(self.bit() | rhs.bit())
    }
}

impl BitOrAssign for UpdateFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitOrAssign<UpdateFlag> for UpdateFlags {
    fn bitor_assign(&mut self, rhs: UpdateFlag) {
        self.insert(rhs);
    }
}

impl Sub<UpdateFlag> for UpdateFlags {
    type Output = Self;

    fn sub(self, rhs: UpdateFlag) -> Self {
        Self(self.0 & !rhs.bit())
    }
}

impl fmt::Debug for UpdateFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
