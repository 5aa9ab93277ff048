/// Reference interval covered by one aligned segment. Coordinates are 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentBlock {
    pub start: u64,
    pub end: u64,
}

impl AlignmentBlock {
    pub fn new(s: u64, e: u64) -> Self {
        let (start, end) = if s <= e { (s, e) } else { (e, s) };
        Self { start, end }
    }
}

/// Closed interval `[start, end]` of reference positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefInterval {
    pub start: u64,
    pub end: u64,
}

impl RefInterval {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn contains(&self, position: u64) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Reference positions not covered by any alignment block, held as sorted disjoint intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageSet {
    reference_length: u64,
    uncovered: Vec<RefInterval>,
}

impl CoverageSet {
    pub fn from_blocks(blocks: &[AlignmentBlock], reference_length: u64) -> Self {
        let mut clipped: Vec<RefInterval> = blocks
            .iter()
            .filter_map(|block| {
                let start = block.start.max(1);
                let end = block.end.min(reference_length);
                (start <= end).then_some(RefInterval { start, end })
            })
            .collect();
        clipped.sort_unstable();

        // Union of overlapping or abutting blocks
        let mut covered: Vec<RefInterval> = Vec::with_capacity(clipped.len());
        for interval in clipped {
            match covered.last_mut() {
                Some(last) if interval.start <= last.end.saturating_add(1) => {
                    last.end = last.end.max(interval.end);
                }
                _ => covered.push(interval),
            }
        }

        let mut uncovered = Vec::with_capacity(covered.len() + 1);
        let mut next = 1u64;
        for interval in &covered {
            if interval.start > next {
                uncovered.push(RefInterval {
                    start: next,
                    end: interval.start - 1,
                });
            }
            next = interval.end + 1;
        }
        if next <= reference_length {
            uncovered.push(RefInterval {
                start: next,
                end: reference_length,
            });
        }

        log::trace!(
            "Coverage: {} blocks -> {} covered / {} uncovered intervals",
            blocks.len(),
            covered.len(),
            uncovered.len()
        );

        Self {
            reference_length,
            uncovered,
        }
    }

    pub fn reference_length(&self) -> u64 {
        self.reference_length
    }

    pub fn intervals(&self) -> &[RefInterval] {
        &self.uncovered
    }

    pub fn contains(&self, position: u64) -> bool {
        let idx = self.uncovered.partition_point(|iv| iv.end < position);
        self.uncovered
            .get(idx)
            .is_some_and(|iv| iv.contains(position))
    }

    /// Number of uncovered positions.
    pub fn uncovered_len(&self) -> u64 {
        self.uncovered.iter().map(RefInterval::len).sum()
    }

    pub fn positions(&self) -> impl Iterator<Item = u64> + '_ {
        self.uncovered.iter().flat_map(|iv| iv.start..=iv.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intervals(set: &CoverageSet) -> Vec<(u64, u64)> {
        set.intervals().iter().map(|iv| (iv.start, iv.end)).collect()
    }

    #[test]
    fn test_no_blocks_leaves_everything_uncovered() {
        let set = CoverageSet::from_blocks(&[], 10);
        assert_eq!(intervals(&set), vec![(1, 10)]);
        assert_eq!(set.uncovered_len(), 10);
    }

    #[test]
    fn test_overlapping_unsorted_blocks_are_unioned() {
        let blocks = [
            AlignmentBlock::new(40, 60),
            AlignmentBlock::new(5, 20),
            AlignmentBlock::new(15, 30),
            AlignmentBlock::new(31, 35),
        ];
        let set = CoverageSet::from_blocks(&blocks, 100);
        assert_eq!(intervals(&set), vec![(1, 4), (36, 39), (61, 100)]);
        assert_eq!(set.uncovered_len(), 4 + 4 + 40);
    }

    #[test]
    fn test_duplicate_blocks_do_not_double_count() {
        let blocks = [AlignmentBlock::new(1, 50), AlignmentBlock::new(1, 50)];
        let set = CoverageSet::from_blocks(&blocks, 60);
        assert_eq!(intervals(&set), vec![(51, 60)]);
    }

    #[test]
    fn test_blocks_are_clipped_to_reference() {
        let blocks = [AlignmentBlock::new(0, 3), AlignmentBlock::new(8, 25)];
        let set = CoverageSet::from_blocks(&blocks, 10);
        assert_eq!(intervals(&set), vec![(4, 7)]);
    }

    #[test]
    fn test_reversed_block_coordinates_are_normalized() {
        let block = AlignmentBlock::new(30, 10);
        assert_eq!(block, AlignmentBlock { start: 10, end: 30 });
        let set = CoverageSet::from_blocks(&[block], 30);
        assert_eq!(intervals(&set), vec![(1, 9)]);
    }

    #[test]
    fn test_contains_and_positions_agree() {
        let blocks = [AlignmentBlock::new(3, 5), AlignmentBlock::new(8, 8)];
        let set = CoverageSet::from_blocks(&blocks, 10);
        let positions: Vec<u64> = set.positions().collect();
        assert_eq!(positions, vec![1, 2, 6, 7, 9, 10]);
        for pos in 1..=10 {
            assert_eq!(set.contains(pos), positions.contains(&pos), "pos {pos}");
        }
        assert!(!set.contains(11));
    }

    #[test]
    fn test_full_coverage_is_empty() {
        let set = CoverageSet::from_blocks(&[AlignmentBlock::new(1, 5)], 5);
        assert!(set.intervals().is_empty());
        assert_eq!(set.uncovered_len(), 0);
    }
}
