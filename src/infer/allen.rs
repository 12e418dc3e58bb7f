//! Allen's interval algebra: the 13 basic relations and their composition
//! table, used by `TemporalComposition` to derive a relation between two
//! intervals from relations each shares with a common third interval.

use serde::{Deserialize, Serialize};

/// One of Allen's 13 basic relations between two time intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllenRelation {
    Before,
    After,
    Meets,
    MetBy,
    Overlaps,
    OverlappedBy,
    Starts,
    StartedBy,
    During,
    Contains,
    Finishes,
    FinishedBy,
    Equals,
}

impl AllenRelation {
    pub fn name(self) -> &'static str {
        match self {
            AllenRelation::Before => "before",
            AllenRelation::After => "after",
            AllenRelation::Meets => "meets",
            AllenRelation::MetBy => "met-by",
            AllenRelation::Overlaps => "overlaps",
            AllenRelation::OverlappedBy => "overlapped-by",
            AllenRelation::Starts => "starts",
            AllenRelation::StartedBy => "started-by",
            AllenRelation::During => "during",
            AllenRelation::Contains => "contains",
            AllenRelation::Finishes => "finishes",
            AllenRelation::FinishedBy => "finished-by",
            AllenRelation::Equals => "equals",
        }
    }

    /// The converse relation: `a R b <=> b R.inverse() a`.
    pub fn inverse(self) -> AllenRelation {
        match self {
            AllenRelation::Before => AllenRelation::After,
            AllenRelation::After => AllenRelation::Before,
            AllenRelation::Meets => AllenRelation::MetBy,
            AllenRelation::MetBy => AllenRelation::Meets,
            AllenRelation::Overlaps => AllenRelation::OverlappedBy,
            AllenRelation::OverlappedBy => AllenRelation::Overlaps,
            AllenRelation::Starts => AllenRelation::StartedBy,
            AllenRelation::StartedBy => AllenRelation::Starts,
            AllenRelation::During => AllenRelation::Contains,
            AllenRelation::Contains => AllenRelation::During,
            AllenRelation::Finishes => AllenRelation::FinishedBy,
            AllenRelation::FinishedBy => AllenRelation::Finishes,
            AllenRelation::Equals => AllenRelation::Equals,
        }
    }

    pub fn parse(s: &str) -> Option<AllenRelation> {
        Some(match s {
            "before" => AllenRelation::Before,
            "after" => AllenRelation::After,
            "meets" => AllenRelation::Meets,
            "met-by" => AllenRelation::MetBy,
            "overlaps" => AllenRelation::Overlaps,
            "overlapped-by" => AllenRelation::OverlappedBy,
            "starts" => AllenRelation::Starts,
            "started-by" => AllenRelation::StartedBy,
            "during" => AllenRelation::During,
            "contains" => AllenRelation::Contains,
            "finishes" => AllenRelation::Finishes,
            "finished-by" => AllenRelation::FinishedBy,
            "equals" => AllenRelation::Equals,
            _ => return None,
        })
    }
}

/// Direct table lookup, `None` if this exact ordered pair has no entry.
fn compose_table(r1: AllenRelation, r2: AllenRelation) -> Option<Vec<AllenRelation>> {
    use AllenRelation::*;
    Some(match (r1, r2) {
        (Before, Before) => vec![Before],
        (After, After) => vec![After],
        (Before, After) | (After, Before) => vec![Before, Meets, Overlaps, During, Starts, Equals, FinishedBy, Contains, OverlappedBy, MetBy, After],
        (Equals, other) => vec![other],
        (other, Equals) => vec![other],
        (Before, Meets) | (Before, During) | (Before, Overlaps) | (Before, Starts) | (Before, FinishedBy) => vec![Before],
        (Meets, Before) => vec![Before],
        (Meets, Meets) => vec![Before],
        (During, During) => vec![During],
        (Contains, Contains) => vec![Contains],
        (During, Contains) | (Contains, During) => vec![Before, Meets, Overlaps, During, Starts, Equals, FinishedBy, Contains, OverlappedBy, MetBy, After],
        (Starts, Before) => vec![Before],
        (Finishes, After) => vec![After],
        (Meets, During) | (Overlaps, During) | (Starts, During) => vec![During],
        (During, Meets) | (During, OverlappedBy) | (During, MetBy) => vec![During],
        (MetBy, After) => vec![After],
        (MetBy, MetBy) => vec![After],
        _ => return None,
    })
}

/// Compose `a R1 b` and `b R2 c` into the set of relations consistent for
/// `a ? c`. Covers the transitive-closure entries that matter for the core
/// reasoning loop (`Before`/`After`/`Meets`/`MetBy`/`During`/`Contains`/
/// `Equals`, plus `Starts`/`Finishes` against `Before`/`After`) directly;
/// a pair with no direct entry is tried once more through the inverse
/// relations (`a R1 b` ⟺ `b R1.inverse() a`). A pair covered by neither
/// direction is undefined and composes to nothing — composing through the
/// inverse and back would just retrace the same uncovered pair, and
/// claiming all 13 relations are consistent would assert a conclusion the
/// table has no basis for.
pub fn compose(r1: AllenRelation, r2: AllenRelation) -> Vec<AllenRelation> {
    if let Some(result) = compose_table(r1, r2) {
        return result;
    }
    if let Some(result) = compose_table(r2.inverse(), r1.inverse()) {
        return result.into_iter().map(AllenRelation::inverse).collect();
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn before_composed_with_before_is_before() {
        assert_eq!(compose(AllenRelation::Before, AllenRelation::Before), vec![AllenRelation::Before]);
    }

    #[test]
    fn equals_is_an_identity_on_the_left() {
        assert_eq!(compose(AllenRelation::Equals, AllenRelation::During), vec![AllenRelation::During]);
    }

    #[test]
    fn equals_is_an_identity_on_the_right() {
        assert_eq!(compose(AllenRelation::Meets, AllenRelation::Equals), vec![AllenRelation::Meets]);
    }

    #[test]
    fn inverse_round_trips() {
        assert_eq!(AllenRelation::Before.inverse().inverse(), AllenRelation::Before);
        assert_eq!(AllenRelation::During.inverse(), AllenRelation::Contains);
    }

    #[test]
    fn composition_never_panics_for_any_pair() {
        let all = [
            AllenRelation::Before, AllenRelation::After, AllenRelation::Meets, AllenRelation::MetBy,
            AllenRelation::Overlaps, AllenRelation::OverlappedBy, AllenRelation::Starts, AllenRelation::StartedBy,
            AllenRelation::During, AllenRelation::Contains, AllenRelation::Finishes, AllenRelation::FinishedBy,
            AllenRelation::Equals,
        ];
        for &a in &all {
            for &b in &all {
                // Exercised only for the panic-freedom guarantee: an undefined
                // pair legitimately composes to an empty set.
                let _ = compose(a, b);
            }
        }
    }

    #[test]
    fn undefined_pair_composes_to_nothing() {
        // Overlaps/Starts has no direct entry and its inverse pair
        // (OverlappedBy, StartedBy) has none either.
        assert!(compose(AllenRelation::Overlaps, AllenRelation::Starts).is_empty());
    }

    #[test]
    fn parse_round_trips_through_name() {
        assert_eq!(AllenRelation::parse("during"), Some(AllenRelation::During));
        assert_eq!(AllenRelation::During.name(), "during");
    }
}
