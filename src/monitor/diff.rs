//! Frame diffing against a subscription.

use std::collections::{HashMap, HashSet};

use super::RamEvent;
use crate::frame::{Address, CellValue, RamFrame};

/// The fixed set of addresses a monitor reports on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscription {
    addresses: HashSet<Address>,
}

impl Subscription {
    /// Create a subscription from any collection of addresses.
    ///
    /// Duplicates collapse; order is irrelevant.
    pub fn new<I>(addresses: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        Self {
            addresses: addresses.into_iter().collect(),
        }
    }

    /// Whether `location` is subscribed.
    #[inline]
    pub fn contains(&self, location: Address) -> bool {
        self.addresses.contains(&location)
    }

    /// Number of subscribed addresses.
    #[inline]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether nothing is subscribed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Iterate the subscribed addresses in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        self.addresses.iter().copied()
    }
}

impl FromIterator<Address> for Subscription {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Compute the subscribed changes between `old` and `new`.
///
/// - With no `old` frame, every subscribed address in `new` is a change with
///   `old: None`.
/// - Otherwise an address is a change when its value differs from `old`, or
///   when it is absent from `old`.
/// - Addresses present only in `old` are not reported.
///
/// Events are ordered by first appearance in `new.cells`. If an address
/// repeats within a frame, its last value is the one compared.
pub fn diff_frames(
    subscription: &Subscription,
    old: Option<&RamFrame>,
    new: &RamFrame,
) -> Vec<RamEvent> {
    let previous: HashMap<Address, CellValue> = old
        .map(|frame| subscribed_values(subscription, frame).into_iter().collect())
        .unwrap_or_default();

    subscribed_values(subscription, new)
        .into_iter()
        .filter_map(|(location, value)| {
            let old = previous.get(&location).copied();
            (old != Some(value)).then_some(RamEvent {
                location,
                old,
                new: value,
            })
        })
        .collect()
}

/// Subscribed `(address, value)` pairs in first-appearance order, last value wins.
fn subscribed_values(subscription: &Subscription, frame: &RamFrame) -> Vec<(Address, CellValue)> {
    let mut values: Vec<(Address, CellValue)> = Vec::new();
    let mut positions: HashMap<Address, usize> = HashMap::new();

    for cell in frame
        .cells
        .iter()
        .filter(|cell| subscription.contains(cell.location))
    {
        match positions.get(&cell.location) {
            Some(&index) => values[index].1 = cell.value,
            None => {
                positions.insert(cell.location, values.len());
                values.push((cell.location, cell.value));
            }
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription() -> Subscription {
        Subscription::new([1, 2, 3, 5, 8])
    }

    fn counting_frame(frame: u64) -> RamFrame {
        RamFrame::from_pairs(frame, (1..=10).map(|i| (i, i)))
    }

    #[test]
    fn test_first_frame_reports_every_subscribed_address() {
        let events = diff_frames(&subscription(), None, &counting_frame(10));

        let expected: Vec<_> = [1, 2, 3, 5, 8]
            .into_iter()
            .map(|i| RamEvent {
                location: i,
                old: None,
                new: i,
            })
            .collect();
        assert_eq!(events, expected);
    }

    #[test]
    fn test_only_subscribed_changes_are_reported() {
        let old = counting_frame(10);
        let new = RamFrame::from_pairs(
            20,
            (1..=10).map(|i| match i {
                3 => (3, 33),
                5 => (5, 55),
                6 => (6, 66),
                i => (i, i),
            }),
        );

        let events = diff_frames(&subscription(), Some(&old), &new);

        assert_eq!(
            events,
            vec![
                RamEvent {
                    location: 3,
                    old: Some(3),
                    new: 33
                },
                RamEvent {
                    location: 5,
                    old: Some(5),
                    new: 55
                },
            ]
        );
    }

    #[test]
    fn test_identical_frames_produce_no_events() {
        let events = diff_frames(
            &subscription(),
            Some(&counting_frame(1)),
            &counting_frame(2),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_newly_present_address_is_a_change() {
        let old = RamFrame::from_pairs(1, [(1, 1)]);
        let new = RamFrame::from_pairs(2, [(1, 1), (2, 7)]);

        let events = diff_frames(&subscription(), Some(&old), &new);

        assert_eq!(
            events,
            vec![RamEvent {
                location: 2,
                old: None,
                new: 7
            }]
        );
    }

    #[test]
    fn test_dropped_address_is_not_reported() {
        let old = RamFrame::from_pairs(1, [(1, 1), (2, 2)]);
        let new = RamFrame::from_pairs(2, [(1, 1)]);

        assert!(diff_frames(&subscription(), Some(&old), &new).is_empty());
    }

    #[test]
    fn test_order_follows_new_frame_cells() {
        let new = RamFrame::from_pairs(1, [(8, 0), (2, 0), (5, 0)]);

        let order: Vec<_> = diff_frames(&subscription(), None, &new)
            .into_iter()
            .map(|e| e.location)
            .collect();

        assert_eq!(order, vec![8, 2, 5]);
    }

    #[test]
    fn test_repeated_address_uses_last_value_at_first_position() {
        let new = RamFrame::from_pairs(1, [(2, 1), (3, 4), (2, 9)]);

        let events = diff_frames(&subscription(), None, &new);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].location, 2);
        assert_eq!(events[0].new, 9);
        assert_eq!(events[1].location, 3);
    }

    #[test]
    fn test_empty_subscription_never_reports() {
        let events = diff_frames(&Subscription::default(), None, &counting_frame(1));
        assert!(events.is_empty());
    }

    #[test]
    fn test_subscription_collapses_duplicates() {
        let sub: Subscription = [1, 1, 2].into_iter().collect();
        assert_eq!(sub.len(), 2);
        assert!(sub.contains(1));
        assert!(!sub.contains(3));
    }
}
