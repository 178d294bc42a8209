use ahash::AHashSet;
use vec_map::VecMap;

use crate::cigar::CorrectedPosition;
use crate::umi::{AllowList, UmiIndex};

/// Corrected positions seen per UMI on the current chromosome.
///
/// Every entry starts out holding `CorrectedPosition::SENTINEL`, so a position of 0 is never
/// reported as unique.
#[derive(Debug, Default)]
pub struct DupTracker {
    seen: VecMap<AHashSet<CorrectedPosition>>,
}

impl DupTracker {
    pub fn new() -> DupTracker {
        DupTracker { seen: VecMap::new() }
    }

    /// Replace all state with a fresh entry for every UMI on the allow-list.
    pub fn reset(&mut self, allow_list: &AllowList) {
        self.seen = allow_list.indices().map(|i| (i.0, seeded())).collect();
    }

    /// Returns `true` when `pos` was already seen for `umi`, otherwise records it and returns
    /// `false`. `umi` must come from the allow-list the tracker was last reset with.
    pub fn is_duplicate_and_record(&mut self, umi: UmiIndex, pos: CorrectedPosition) -> bool {
        debug_assert!(self.seen.contains_key(umi.0), "UMI not on allow-list");
        !self.seen.entry(umi.0).or_insert_with(seeded).insert(pos)
    }

    #[cfg(test)]
    pub fn umis(&self) -> usize {
        self.seen.len()
    }

    /// Number of positions recorded for `umi`, not counting the sentinel.
    #[cfg(test)]
    pub fn positions(&self, umi: UmiIndex) -> usize {
        self.seen.get(umi.0).map(|s| s.len() - 1).unwrap_or(0)
    }
}

fn seeded() -> AHashSet<CorrectedPosition> {
    let mut set = AHashSet::new();
    set.insert(CorrectedPosition::SENTINEL);
    set
}

#[cfg(test)]
mod test {
    use super::*;

    async fn allow_list() -> AllowList {
        AllowList::from_reader(&b"AAAAAAAA\nCCCCCCCC\n"[..], 8).await.unwrap()
    }

    #[tokio::test]
    async fn duplicates_per_umi() {
        let allow = allow_list().await;
        let a = allow.get(b"AAAAAAAA").unwrap();
        let c = allow.get(b"CCCCCCCC").unwrap();

        let mut tracker = DupTracker::new();
        tracker.reset(&allow);
        assert_eq!(tracker.umis(), 2);

        assert!(!tracker.is_duplicate_and_record(a, CorrectedPosition::from(100)));
        assert!(tracker.is_duplicate_and_record(a, CorrectedPosition::from(100)));
        assert!(!tracker.is_duplicate_and_record(c, CorrectedPosition::from(100)));
        assert!(!tracker.is_duplicate_and_record(a, CorrectedPosition::from(-100)));
        assert!(tracker.is_duplicate_and_record(a, CorrectedPosition::from(-100)));
        assert_eq!(tracker.positions(a), 2);
        assert_eq!(tracker.positions(c), 1);
    }

    #[tokio::test]
    async fn sentinel_is_never_unique() {
        let allow = allow_list().await;
        let a = allow.get(b"AAAAAAAA").unwrap();

        let mut tracker = DupTracker::new();
        tracker.reset(&allow);
        assert!(tracker.is_duplicate_and_record(a, CorrectedPosition::SENTINEL));
        assert_eq!(tracker.positions(a), 0);
    }

    #[tokio::test]
    async fn reset_forgets_positions() {
        let allow = allow_list().await;
        let a = allow.get(b"AAAAAAAA").unwrap();

        let mut tracker = DupTracker::new();
        tracker.reset(&allow);
        assert!(!tracker.is_duplicate_and_record(a, CorrectedPosition::from(2500)));
        tracker.reset(&allow);
        assert_eq!(tracker.positions(a), 0);
        assert!(!tracker.is_duplicate_and_record(a, CorrectedPosition::from(2500)));
    }
}
