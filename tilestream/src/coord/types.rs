//! Spatial key types for the implicit quad-tree.
//!
//! Both [`QuadKey`] (geometry fragments) and [`CellKey`] (basemap cells) are
//! digit paths from the root of the tree. Each digit selects one quadrant:
//!
//! ```text
//! ┌───┬───┐
//! │ 0 │ 1 │   0 = north-west, 1 = north-east
//! ├───┼───┤
//! │ 2 │ 3 │   2 = south-west, 3 = south-east
//! └───┴───┘
//! ```
//!
//! The path length is the zoom level. The tree itself is never materialized;
//! parent, child and sibling relationships are pure key arithmetic.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

/// Maximum path depth a key can hold (two bits per digit in a `u64`).
pub const MAX_DEPTH: u8 = 30;

/// Errors that can occur when building or combining keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// A character outside `0..=3` appeared in a key string.
    #[error("Invalid quad digit '{0}' (expected 0-3)")]
    InvalidDigit(char),

    /// A digit value outside `0..=3`.
    #[error("Invalid quad digit value {0} (expected 0-3)")]
    InvalidDigitValue(u8),

    /// The resulting path would exceed [`MAX_DEPTH`].
    #[error("Key too deep: {len} digits (max: {max})")]
    TooDeep { len: usize, max: u8 },

    /// `suffix_after` was called with a key that is not an ancestor.
    #[error("{ancestor} is not an ancestor of {key}")]
    NotAncestor { ancestor: String, key: String },
}

/// Packed digit path shared by both key kinds.
///
/// Digits are stored most-significant first: the root-most digit occupies
/// the highest occupied bit pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
struct DigitPath {
    len: u8,
    bits: u64,
}

impl DigitPath {
    fn from_digits(digits: &[u8]) -> Result<Self, CoordError> {
        if digits.len() > MAX_DEPTH as usize {
            return Err(CoordError::TooDeep {
                len: digits.len(),
                max: MAX_DEPTH,
            });
        }
        let mut bits = 0u64;
        for &digit in digits {
            if digit > 3 {
                return Err(CoordError::InvalidDigitValue(digit));
            }
            bits = (bits << 2) | digit as u64;
        }
        Ok(Self {
            len: digits.len() as u8,
            bits,
        })
    }

    fn parse(s: &str) -> Result<Self, CoordError> {
        let digits = s
            .chars()
            .map(|c| match c {
                '0'..='3' => Ok(c as u8 - b'0'),
                other => Err(CoordError::InvalidDigit(other)),
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Self::from_digits(&digits)
    }

    fn digit(&self, level: u8) -> u8 {
        let shift = 2 * (self.len - 1 - level) as u32;
        ((self.bits >> shift) & 0b11) as u8
    }

    fn digits(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).map(move |level| self.digit(level))
    }

    fn truncate(&self, len: u8) -> Self {
        if len >= self.len {
            return *self;
        }
        Self {
            len,
            bits: self.bits >> (2 * (self.len - len) as u32),
        }
    }

    fn child(&self, digit: u8) -> Result<Self, CoordError> {
        if digit > 3 {
            return Err(CoordError::InvalidDigitValue(digit));
        }
        if self.len >= MAX_DEPTH {
            return Err(CoordError::TooDeep {
                len: self.len as usize + 1,
                max: MAX_DEPTH,
            });
        }
        Ok(Self {
            len: self.len + 1,
            bits: (self.bits << 2) | digit as u64,
        })
    }

    fn is_ancestor_of(&self, other: &Self) -> bool {
        self.len < other.len && other.truncate(self.len) == *self
    }

    fn suffix_len(&self, ancestor: &Self) -> Option<u8> {
        if ancestor.len <= self.len && self.truncate(ancestor.len) == *ancestor {
            Some(self.len - ancestor.len)
        } else {
            None
        }
    }

    fn suffix(&self, len: u8) -> Self {
        let mask = if len == 0 { 0 } else { (1u64 << (2 * len as u32)) - 1 };
        Self {
            len,
            bits: self.bits & mask,
        }
    }

    fn concat(&self, tail: &Self) -> Result<Self, CoordError> {
        let len = self.len as usize + tail.len as usize;
        if len > MAX_DEPTH as usize {
            return Err(CoordError::TooDeep {
                len,
                max: MAX_DEPTH,
            });
        }
        Ok(Self {
            len: len as u8,
            bits: (self.bits << (2 * tail.len as u32)) | tail.bits,
        })
    }
}

impl fmt::Display for DigitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in self.digits() {
            write!(f, "{}", digit)?;
        }
        Ok(())
    }
}

/// Generates the shared key surface for the two key kinds.
macro_rules! digit_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(DigitPath);

        impl $name {
            /// The root of the tree (zoom 0, empty path).
            pub const ROOT: Self = Self(DigitPath { len: 0, bits: 0 });

            /// Build a key from digit values (`0..=3`), root-most first.
            pub fn from_digits(digits: &[u8]) -> Result<Self, CoordError> {
                DigitPath::from_digits(digits).map(Self)
            }

            /// Path length, which is the zoom level.
            pub fn len(&self) -> u8 {
                self.0.len
            }

            /// Returns true for the root key.
            pub fn is_empty(&self) -> bool {
                self.0.len == 0
            }

            /// Alias for [`Self::len`].
            pub fn zoom(&self) -> u8 {
                self.0.len
            }

            /// Digit at the given level (0 = root-most).
            ///
            /// Returns `None` when `level` is outside the path.
            pub fn digit(&self, level: u8) -> Option<u8> {
                (level < self.0.len).then(|| self.0.digit(level))
            }

            /// Iterate the digits, root-most first.
            pub fn digits(&self) -> impl Iterator<Item = u8> + '_ {
                self.0.digits()
            }

            /// Parent key, or `None` for the root.
            pub fn parent(&self) -> Option<Self> {
                (self.0.len > 0).then(|| Self(self.0.truncate(self.0.len - 1)))
            }

            /// The key one level deeper in quadrant `digit`.
            pub fn child(&self, digit: u8) -> Result<Self, CoordError> {
                self.0.child(digit).map(Self)
            }

            /// The four children in digit order; empty at [`MAX_DEPTH`].
            pub fn children(&self) -> Vec<Self> {
                (0..4).filter_map(|digit| self.child(digit).ok()).collect()
            }

            /// All strict ancestors, nearest first, ending at the root.
            pub fn ancestors(&self) -> impl Iterator<Item = Self> + '_ {
                (0..self.0.len).rev().map(move |len| Self(self.0.truncate(len)))
            }

            /// The ancestor (or self) at the given length.
            pub fn truncate(&self, len: u8) -> Self {
                Self(self.0.truncate(len))
            }

            /// True when `self` is a strict ancestor of `other`.
            pub fn is_ancestor_of(&self, other: &Self) -> bool {
                self.0.is_ancestor_of(&other.0)
            }

            /// Concatenate two paths: `other` addressed relative to `self`.
            pub fn concat(&self, other: &Self) -> Result<Self, CoordError> {
                self.0.concat(&other.0).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(\"{}\")", stringify!($name), self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoordError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                DigitPath::parse(s).map(Self)
            }
        }
    };
}

digit_key!(
    /// Address of a geometry fragment node in the quad-tree.
    QuadKey
);

digit_key!(
    /// Address of a basemap cell in the quad-tree.
    ///
    /// Besides the shared key algebra, cell keys describe relative
    /// positions: `suffix_after` yields the path of a descendant relative to
    /// one of its ancestors ("this cell is sub-cell `b` of ancestor `a`").
    CellKey
);

impl CellKey {
    /// Path of `self` relative to `ancestor`.
    ///
    /// `ancestor` may equal `self`, in which case the result is the root.
    pub fn suffix_after(&self, ancestor: &CellKey) -> Result<CellKey, CoordError> {
        match self.0.suffix_len(&ancestor.0) {
            Some(len) => Ok(CellKey(self.0.suffix(len))),
            None => Err(CoordError::NotAncestor {
                ancestor: ancestor.to_string(),
                key: self.to_string(),
            }),
        }
    }
}

impl From<CellKey> for QuadKey {
    fn from(cell: CellKey) -> Self {
        QuadKey(cell.0)
    }
}

impl From<QuadKey> for CellKey {
    fn from(quad: QuadKey) -> Self {
        CellKey(quad.0)
    }
}

/// Identifier of a named map object (a geocoded region).
///
/// Backed by `Arc<str>` so fragment keys clone cheaply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(Arc<str>);

impl RegionId {
    /// Create a new region identifier.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for RegionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RegionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RegionId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One geometry piece: a region at one quad-tree node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentKey {
    /// The map object this fragment belongs to.
    pub region_id: RegionId,
    /// The quad-tree node the fragment is clipped to.
    pub quad_key: QuadKey,
}

impl FragmentKey {
    /// Create a new fragment key.
    pub fn new(region_id: impl Into<RegionId>, quad_key: QuadKey) -> Self {
        Self {
            region_id: region_id.into(),
            quad_key,
        }
    }

    /// Zoom level of the fragment's quad.
    pub fn zoom(&self) -> u8 {
        self.quad_key.zoom()
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fragment_{}_{}", self.region_id, self.quad_key)
    }
}
