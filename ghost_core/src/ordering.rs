//! Position-aware ordering of sibling items.
//!
//! Works purely on `PositionType` values, so the same rules arrange the
//! entries of a pattern and the patterns of a workout:
//! - Linked items form a unit with the item before them
//! - Units headed by `LockedAtIndex(n)` land at slot `n` (or the first unit boundary after it)
//! - Units headed by `LockedLast` go after everything else, in source order
//! - Only free (Normal-headed) units move when shuffling

use crate::rng::SeededRng;
use crate::{IterationType, PositionType};

/// Where a unit is placed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Free,
    At(usize),
    Last,
}

/// A head item plus the items linked behind it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    pub members: Vec<usize>,
    pub anchor: Anchor,
}

impl Unit {
    pub fn head(&self) -> usize {
        self.members[0]
    }
}

/// Group items into inseparable units
pub fn units(positions: &[PositionType]) -> Vec<Unit> {
    let mut units: Vec<Unit> = Vec::new();
    for (index, position) in positions.iter().enumerate() {
        let anchor = match position {
            PositionType::LinkedToPrevious => {
                if let Some(unit) = units.last_mut() {
                    unit.members.push(index);
                    continue;
                }
                // Nothing to link to; the validator reports this, treat as free here.
                Anchor::Free
            }
            PositionType::Normal => Anchor::Free,
            PositionType::LockedAtIndex(slot) => Anchor::At(*slot),
            PositionType::LockedLast => Anchor::Last,
        };
        units.push(Unit {
            members: vec![index],
            anchor,
        });
    }
    units
}

/// Order of item indices for one pass.
///
/// `avoid_first` names an item that should not open a shuffled pass (the
/// last item played before a refill); when the shuffle puts it first, the
/// first two free units trade places.
pub fn arrange(
    positions: &[PositionType],
    iteration: IterationType,
    rng: &mut SeededRng,
    avoid_first: Option<usize>,
) -> Vec<usize> {
    let all = units(positions);

    let mut free: Vec<&Unit> = Vec::new();
    let mut pinned: Vec<(usize, &Unit)> = Vec::new();
    let mut last: Vec<&Unit> = Vec::new();
    for unit in &all {
        match unit.anchor {
            Anchor::Free => free.push(unit),
            Anchor::At(slot) => pinned.push((slot, unit)),
            Anchor::Last => last.push(unit),
        }
    }
    // Stable, so equal slots keep source order.
    pinned.sort_by_key(|(slot, _)| *slot);

    if iteration == IterationType::Shuffle {
        rng.shuffle(&mut free);
        if let Some(avoid) = avoid_first {
            if free.len() > 1 && free[0].head() == avoid {
                free.swap(0, 1);
            }
        }
    }

    let mut order = Vec::with_capacity(positions.len());
    let mut pinned = pinned.into_iter().peekable();
    let mut free = free.into_iter();
    loop {
        let due = matches!(pinned.peek(), Some((slot, _)) if order.len() >= *slot);
        let next = if due {
            pinned.next().map(|(_, unit)| unit)
        } else {
            free.next().or_else(|| pinned.next().map(|(_, unit)| unit))
        };
        match next {
            Some(unit) => order.extend_from_slice(&unit.members),
            None => break,
        }
    }
    for unit in last {
        order.extend_from_slice(&unit.members);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use PositionType::*;

    fn rng() -> SeededRng {
        SeededRng::new(11, 1)
    }

    #[test]
    fn test_in_order_keeps_source_order() {
        let positions = [Normal, Normal, Normal];
        assert_eq!(
            arrange(&positions, IterationType::InOrder, &mut rng(), None),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_units_group_linked_items() {
        let grouped = units(&[Normal, LinkedToPrevious, LinkedToPrevious, Normal]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].members, vec![0, 1, 2]);
        assert_eq!(grouped[1].members, vec![3]);
    }

    #[test]
    fn test_locks_applied_even_in_order() {
        let positions = [Normal, LinkedToPrevious, LockedAtIndex(0), Normal, LockedLast];
        assert_eq!(
            arrange(&positions, IterationType::InOrder, &mut rng(), None),
            vec![2, 0, 1, 3, 4]
        );
    }

    #[test]
    fn test_shuffle_respects_locks_and_links() {
        let positions = [
            Normal,
            LinkedToPrevious,
            Normal,
            LockedAtIndex(1),
            Normal,
            Normal,
            LockedLast,
        ];
        for seed in 0..50 {
            let mut rng = SeededRng::new(seed, 4);
            let order = arrange(&positions, IterationType::Shuffle, &mut rng, None);

            let mut sorted = order.clone();
            sorted.sort();
            assert_eq!(sorted, (0..positions.len()).collect::<Vec<_>>());

            let pos = |item: usize| order.iter().position(|&i| i == item).unwrap();
            assert_eq!(pos(1), pos(0) + 1, "linked item must follow its head");
            assert_eq!(*order.last().unwrap(), 6);
            assert!(pos(3) >= 1, "locked unit placed at or after its slot");
            assert!(pos(3) <= 2, "locked unit placed at the first boundary after its slot");
        }
    }

    #[test]
    fn test_shuffle_is_seeded() {
        let positions = [Normal; 8];
        let a = arrange(&positions, IterationType::Shuffle, &mut SeededRng::new(3, 1), None);
        let b = arrange(&positions, IterationType::Shuffle, &mut SeededRng::new(3, 1), None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_avoid_first_swaps_leading_unit() {
        let positions = [Normal, Normal, Normal];
        for seed in 0..30 {
            let mut probe = SeededRng::new(seed, 2);
            let plain = arrange(&positions, IterationType::Shuffle, &mut probe, None);

            let mut rng = SeededRng::new(seed, 2);
            let order = arrange(&positions, IterationType::Shuffle, &mut rng, Some(plain[0]));
            assert_ne!(order[0], plain[0]);
        }
    }

    #[test]
    fn test_pin_beyond_length_still_placed() {
        let positions = [LockedAtIndex(5), Normal];
        assert_eq!(
            arrange(&positions, IterationType::InOrder, &mut rng(), None),
            vec![1, 0]
        );
    }
}
