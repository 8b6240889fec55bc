//! Generic three-way diff.
//!
//! A resource family plugs in its identity and equality rules through
//! [`Family`]; [`compute`] turns (observed, desired) into disjoint create /
//! update / reauthorize / delete sets.

/// Identity and equality rules of one resource family.
pub trait Family {
    type Desired: Clone + Send + Sync;
    type Observed: Clone + Send + Sync;

    /// Remote identity, used for logging and disjointness checks.
    fn key(&self, observed: &Self::Observed) -> String;

    /// Same conceptual entity.
    fn matches(&self, observed: &Self::Observed, desired: &Self::Desired) -> bool;

    /// Observed item with desired-only fields carried over.
    fn merge(&self, observed: &Self::Observed, _desired: &Self::Desired) -> Self::Observed {
        observed.clone()
    }

    /// Matched pair whose content still differs.
    fn needs_update(&self, _observed: &Self::Observed, _desired: &Self::Desired) -> bool {
        false
    }

    /// Already being torn down remotely; never delete again.
    fn is_deleting(&self, _observed: &Self::Observed) -> bool {
        false
    }

    /// Created but not yet correlatable with any desired item.
    fn is_placeholder(&self, _observed: &Self::Observed) -> bool {
        false
    }

    /// May claim a placeholder when nothing matched it by identity.
    fn accepts_placeholder(&self, _desired: &Self::Desired) -> bool {
        false
    }

    /// Unmatched remote items outside our ownership are left alone.
    fn owns(&self, _observed: &Self::Observed) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Create<D> {
    /// Position in the desired list.
    pub index: usize,
    pub desired: D,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update<O, D> {
    pub index: usize,
    pub observed: O,
    pub desired: D,
    /// False when the pair is already in sync.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diff<O, D> {
    pub create: Vec<Create<D>>,
    pub update: Vec<Update<O, D>>,
    pub reauthorize: Vec<Update<O, D>>,
    pub delete: Vec<O>,
}

impl<O, D> Default for Diff<O, D> {
    fn default() -> Self {
        Self {
            create: Vec::new(),
            update: Vec::new(),
            reauthorize: Vec::new(),
            delete: Vec::new(),
        }
    }
}

impl<O, D> Diff<O, D> {
    /// Nothing to send to the remote.
    pub fn is_noop(&self) -> bool {
        self.create.is_empty()
            && self.delete.is_empty()
            && self.reauthorize.is_empty()
            && self.update.iter().all(|u| !u.changed)
    }

    pub fn changed_updates(&self) -> usize {
        self.update.iter().filter(|u| u.changed).count()
    }
}

/// Compute the operation sets for one family.
///
/// 1. Each observed item claims the first unclaimed desired item it matches.
///    A claimed pair becomes an update unless the observed item is deleting.
///    Unclaimed observed items are deleted unless deleting or not owned.
/// 2. Placeholders are handed to unclaimed desired items in FIFO order.
/// 3. Leftover placeholders are deleted; leftover desired items are created.
pub fn compute<F: Family>(
    family: &F,
    observed: &[F::Observed],
    desired: &[F::Desired],
) -> Diff<F::Observed, F::Desired> {
    let mut diff = Diff::default();
    let mut claimed = vec![false; desired.len()];
    let mut placeholders = std::collections::VecDeque::new();

    for item in observed {
        if family.is_placeholder(item) {
            placeholders.push_back(item);
            continue;
        }

        let found = desired
            .iter()
            .enumerate()
            .find(|(i, d)| !claimed[*i] && family.matches(item, d));

        match found {
            Some((index, wanted)) => {
                claimed[index] = true;
                if family.is_deleting(item) {
                    continue;
                }
                diff.update.push(Update {
                    index,
                    observed: family.merge(item, wanted),
                    desired: wanted.clone(),
                    changed: family.needs_update(item, wanted),
                });
            }
            None => {
                if !family.is_deleting(item) && family.owns(item) {
                    diff.delete.push(item.clone());
                }
            }
        }
    }

    for (index, wanted) in desired.iter().enumerate() {
        if claimed[index] || !family.accepts_placeholder(wanted) {
            continue;
        }
        let Some(placeholder) = placeholders.pop_front() else {
            break;
        };
        claimed[index] = true;
        diff.reauthorize.push(Update {
            index,
            observed: family.merge(placeholder, wanted),
            desired: wanted.clone(),
            changed: true,
        });
    }

    for leftover in placeholders {
        if !family.is_deleting(leftover) && family.owns(leftover) {
            diff.delete.push(leftover.clone());
        }
    }

    for (index, wanted) in desired.iter().enumerate() {
        if !claimed[index] {
            diff.create.push(Create {
                index,
                desired: wanted.clone(),
            });
        }
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    /// (name, value, deleting) against (name, value); empty name = placeholder.
    struct Pairs;

    impl Family for Pairs {
        type Desired = (String, u32);
        type Observed = (String, u32, bool);

        fn key(&self, observed: &Self::Observed) -> String {
            observed.0.clone()
        }

        fn matches(&self, observed: &Self::Observed, desired: &Self::Desired) -> bool {
            !observed.0.is_empty() && observed.0 == desired.0
        }

        fn merge(&self, observed: &Self::Observed, desired: &Self::Desired) -> Self::Observed {
            (desired.0.clone(), observed.1, observed.2)
        }

        fn needs_update(&self, observed: &Self::Observed, desired: &Self::Desired) -> bool {
            observed.1 != desired.1
        }

        fn is_deleting(&self, observed: &Self::Observed) -> bool {
            observed.2
        }

        fn is_placeholder(&self, observed: &Self::Observed) -> bool {
            observed.0.is_empty()
        }

        fn accepts_placeholder(&self, _desired: &Self::Desired) -> bool {
            true
        }
    }

    fn o(name: &str, value: u32) -> (String, u32, bool) {
        (name.to_string(), value, false)
    }

    fn d(name: &str, value: u32) -> (String, u32) {
        (name.to_string(), value)
    }

    #[test]
    fn test_create_update_delete_split() {
        let diff = compute(&Pairs, &[o("a", 1), o("b", 1)], &[d("a", 2), d("c", 1)]);
        assert_eq!(diff.update.len(), 1);
        assert!(diff.update[0].changed);
        assert_eq!(diff.delete, vec![o("b", 1)]);
        assert_eq!(diff.create.len(), 1);
        assert_eq!(diff.create[0].index, 1);
    }

    #[test]
    fn test_in_sync_is_noop() {
        let diff = compute(&Pairs, &[o("a", 1)], &[d("a", 1)]);
        assert!(diff.is_noop());
        assert_eq!(diff.update.len(), 1);
    }

    #[test]
    fn test_deleting_items_are_never_deleted_again() {
        let deleting = ("gone".to_string(), 1, true);
        let diff = compute(&Pairs, &[deleting], &[]);
        assert!(diff.delete.is_empty());
    }

    #[test]
    fn test_matched_deleting_item_blocks_create() {
        let deleting = ("a".to_string(), 1, true);
        let diff = compute(&Pairs, &[deleting], &[d("a", 1)]);
        assert!(diff.create.is_empty());
        assert!(diff.update.is_empty());
    }

    #[test]
    fn test_placeholders_consumed_fifo() {
        let observed = [o("", 10), o("", 20), o("", 30)];
        let diff = compute(&Pairs, &observed, &[d("x", 0), d("y", 0)]);
        assert_eq!(diff.reauthorize.len(), 2);
        assert_eq!(diff.reauthorize[0].observed.1, 10);
        assert_eq!(diff.reauthorize[1].observed.1, 20);
        assert_eq!(diff.delete, vec![o("", 30)]);
        assert!(diff.create.is_empty());
    }

    #[test]
    fn test_duplicate_desired_items_claim_separately() {
        let diff = compute(&Pairs, &[o("a", 1)], &[d("a", 1), d("a", 1)]);
        assert_eq!(diff.update.len(), 1);
        assert_eq!(diff.create.len(), 1);
        assert_eq!(diff.create[0].index, 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn items() -> impl Strategy<Value = Vec<(String, u32)>> {
            prop::collection::vec(("[a-d]", 0u32..3), 0..6)
        }

        proptest! {
            #[test]
            fn prop_each_desired_item_lands_in_one_set(observed in items(), desired in items()) {
                let observed: Vec<_> = observed.into_iter().map(|(n, v)| (n, v, false)).collect();
                let diff = compute(&Pairs, &observed, &desired);

                let mut seen: Vec<usize> = diff
                    .create
                    .iter()
                    .map(|c| c.index)
                    .chain(diff.update.iter().map(|u| u.index))
                    .chain(diff.reauthorize.iter().map(|u| u.index))
                    .collect();
                seen.sort_unstable();
                prop_assert_eq!(seen, (0..desired.len()).collect::<Vec<_>>());
                prop_assert_eq!(diff.update.len() + diff.delete.len(), observed.len());
            }

            #[test]
            fn prop_applied_state_diffs_to_noop(desired in items()) {
                let converged: Vec<_> = desired.iter().map(|(n, v)| (n.clone(), *v, false)).collect();
                let again = compute(&Pairs, &converged, &desired);
                prop_assert!(again.is_noop());
                prop_assert!(again.delete.is_empty());
            }
        }
    }
}
