// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Label value for samples that carry no transition point.
pub const NO_EVENT: u8 = 0;

/// Number of label classes: no-event plus the three keypoint classes.
pub const CLASS_COUNT: usize = 4;

/// One of the three ordered transition points of a well's inclination
/// profile.
///
/// A well builds inclination from vertical (build point), holds it through
/// the tangent section (hold point), and optionally drops it near target
/// depth (drop point). The three occur in this order with a minimum spacing
/// enforced by the decoder.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keypoint {
    /// Inclination starts increasing (label 1).
    Build,
    /// Inclination stabilizes (label 2).
    Hold,
    /// Inclination starts decreasing (label 3).
    Drop,
}

impl Keypoint {
    /// All classes in their physical order.
    pub const ALL: [Keypoint; 3] = [Keypoint::Build, Keypoint::Hold, Keypoint::Drop];

    /// Integer label written into prediction vectors.
    pub fn label(self) -> u8 {
        match self {
            Keypoint::Build => 1,
            Keypoint::Hold => 2,
            Keypoint::Drop => 3,
        }
    }

    /// Inverse of [`Keypoint::label`]; `0` and out-of-range labels map to
    /// `None`.
    pub fn from_label(label: u8) -> Option<Self> {
        match label {
            1 => Some(Keypoint::Build),
            2 => Some(Keypoint::Hold),
            3 => Some(Keypoint::Drop),
            _ => None,
        }
    }

    /// Column of this class in an n x 4 probability matrix.
    pub fn class_column(self) -> usize {
        usize::from(self.label())
    }

    /// Index of this class in per-keypoint `[T; 3]` arrays.
    pub fn slot(self) -> usize {
        usize::from(self.label()) - 1
    }
}
