// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::keypoint::Keypoint;

/// Decoded keypoint positions for one well.
///
/// At most one position per class; the drop point is legitimately absent in
/// wells that never drop inclination. Outside the decoder's fallback path,
/// present positions satisfy the ordering and minimum-gap invariants.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeypointAssignment {
    pub build: Option<usize>,
    pub hold: Option<usize>,
    pub drop: Option<usize>,
}

impl KeypointAssignment {
    /// Position assigned to one class, if any.
    pub fn get(&self, class: Keypoint) -> Option<usize> {
        match class {
            Keypoint::Build => self.build,
            Keypoint::Hold => self.hold,
            Keypoint::Drop => self.drop,
        }
    }

    /// Assigns a position to one class, replacing any previous one.
    pub fn set(&mut self, class: Keypoint, position: usize) {
        match class {
            Keypoint::Build => self.build = Some(position),
            Keypoint::Hold => self.hold = Some(position),
            Keypoint::Drop => self.drop = Some(position),
        }
    }

    /// Present entries in physical class order.
    pub fn entries(&self) -> impl Iterator<Item = (Keypoint, usize)> + '_ {
        Keypoint::ALL
            .into_iter()
            .filter_map(|class| self.get(class).map(|position| (class, position)))
    }

    /// Number of assigned classes.
    pub fn len(&self) -> usize {
        self.entries().count()
    }

    /// True when no class is assigned.
    pub fn is_empty(&self) -> bool {
        self.build.is_none() && self.hold.is_none() && self.drop.is_none()
    }

    /// Checks the ordering and minimum-gap invariants over present entries.
    pub fn respects_spacing(&self, min_gap: usize) -> bool {
        let mut previous: Option<usize> = None;
        for (_, position) in self.entries() {
            if let Some(prev) = previous
                && position < prev + min_gap
            {
                return false;
            }
            previous = Some(position);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::KeypointAssignment;
    use crate::keypoint::Keypoint;

    #[test]
    fn default_is_empty() {
        let assignment = KeypointAssignment::default();
        assert!(assignment.is_empty());
        assert_eq!(assignment.len(), 0);
        assert_eq!(assignment.entries().count(), 0);
        assert!(assignment.respects_spacing(20));
    }

    #[test]
    fn set_and_get_roundtrip_per_class() {
        let mut assignment = KeypointAssignment::default();
        assignment.set(Keypoint::Build, 45);
        assignment.set(Keypoint::Hold, 100);
        assert_eq!(assignment.get(Keypoint::Build), Some(45));
        assert_eq!(assignment.get(Keypoint::Hold), Some(100));
        assert_eq!(assignment.get(Keypoint::Drop), None);
        assert_eq!(assignment.len(), 2);
    }

    #[test]
    fn entries_iterate_in_physical_order() {
        let assignment = KeypointAssignment {
            build: Some(10),
            hold: Some(40),
            drop: Some(70),
        };
        let entries: Vec<_> = assignment.entries().collect();
        assert_eq!(
            entries,
            vec![
                (Keypoint::Build, 10),
                (Keypoint::Hold, 40),
                (Keypoint::Drop, 70),
            ]
        );
    }

    #[test]
    fn spacing_check_accepts_exact_gap_and_rejects_one_short() {
        let exact = KeypointAssignment {
            build: Some(10),
            hold: Some(30),
            drop: Some(50),
        };
        assert!(exact.respects_spacing(20));

        let short = KeypointAssignment {
            build: Some(10),
            hold: Some(29),
            drop: None,
        };
        assert!(!short.respects_spacing(20));
    }

    #[test]
    fn spacing_check_covers_build_drop_pairs_without_hold() {
        let sparse = KeypointAssignment {
            build: Some(10),
            hold: None,
            drop: Some(25),
        };
        assert!(!sparse.respects_spacing(20));
        assert!(sparse.respects_spacing(15));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn assignment_serde_roundtrip() {
        let assignment = KeypointAssignment {
            build: Some(45),
            hold: Some(100),
            drop: None,
        };
        let encoded = serde_json::to_string(&assignment).expect("serialize assignment");
        let decoded: KeypointAssignment =
            serde_json::from_str(&encoded).expect("deserialize assignment");
        assert_eq!(decoded, assignment);
    }
}
