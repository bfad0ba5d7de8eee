//! Height-indexed bucket queue backing the highest- and lowest-label
//! Push-Relabel variants. Members are dense node indices; heights live
//! in `[0, max_height)`. Pushing a member twice at the same height is
//! idempotent, and out-of-range heights are ignored silently so the
//! gap heuristic can fling nodes past the top without ceremony.

use bitvec::vec::BitVec;

#[derive(Debug, Default)]
pub struct BucketQueue {
    buckets: Vec<Vec<usize>>,
    member: BitVec,
    len: usize,
    highest: usize,
    lowest: usize,
}

impl BucketQueue {
    /// `members` is the number of distinct indices, `max_height` the
    /// exclusive bound on usable heights (2|V| + 1 for Push-Relabel).
    pub fn new(members: usize, max_height: usize) -> Self {
        let mut member = BitVec::new();
        member.resize(members, false);
        Self {
            buckets: vec![Vec::new(); max_height],
            member,
            len: 0,
            highest: 0,
            lowest: max_height.saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn contains(&self, index: usize) -> bool {
        self.member.get(index).map(|bit| *bit).unwrap_or(false)
    }

    pub fn push(&mut self, index: usize, height: usize) {
        if height >= self.buckets.len() || index >= self.member.len() || self.contains(index) {
            return;
        }
        self.member.set(index, true);
        self.buckets[height].push(index);
        self.len += 1;
        self.highest = self.highest.max(height);
        self.lowest = self.lowest.min(height);
    }

    pub fn remove(&mut self, index: usize, height: usize) {
        if height >= self.buckets.len() || !self.contains(index) {
            return;
        }
        let bucket = &mut self.buckets[height];
        let before = bucket.len();
        bucket.retain(|&candidate| candidate != index);
        if bucket.len() < before {
            self.member.set(index, false);
            self.len -= 1;
        }
    }

    /// Moves a member between buckets when a relabel changes its
    /// height. A member pushed out past the top is dropped.
    pub fn update_height(&mut self, index: usize, old_height: usize, new_height: usize) {
        if !self.contains(index) {
            return;
        }
        self.remove(index, old_height);
        self.push(index, new_height);
    }

    pub fn pop_highest(&mut self) -> Option<(usize, usize)> {
        if self.len == 0 {
            return None;
        }
        while self.buckets[self.highest].is_empty() {
            if self.highest == 0 {
                return None;
            }
            self.highest -= 1;
        }
        let height = self.highest;
        let index = self.buckets[height].pop()?;
        self.member.set(index, false);
        self.len -= 1;
        Some((index, height))
    }

    pub fn pop_lowest(&mut self) -> Option<(usize, usize)> {
        if self.len == 0 {
            return None;
        }
        while self.lowest < self.buckets.len() && self.buckets[self.lowest].is_empty() {
            self.lowest += 1;
        }
        if self.lowest >= self.buckets.len() {
            return None;
        }
        let height = self.lowest;
        let index = self.buckets[height].pop()?;
        self.member.set(index, false);
        self.len -= 1;
        Some((index, height))
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.member.fill(false);
        self.len = 0;
        self.highest = 0;
        self.lowest = self.buckets.len().saturating_sub(1);
    }

    /// Occupancy of one height, used by the gap heuristic.
    pub fn bucket_len(&self, height: usize) -> usize {
        self.buckets.get(height).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_highest_and_lowest() {
        let mut queue = BucketQueue::new(8, 16);
        queue.push(0, 3);
        queue.push(1, 7);
        queue.push(2, 1);

        assert_eq!(queue.pop_highest(), Some((1, 7)));
        assert_eq!(queue.pop_lowest(), Some((2, 1)));
        assert_eq!(queue.pop_lowest(), Some((0, 3)));
        assert!(queue.is_empty());
        assert_eq!(queue.pop_highest(), None);
    }

    #[test]
    fn duplicate_push_is_idempotent() {
        let mut queue = BucketQueue::new(4, 8);
        queue.push(2, 5);
        queue.push(2, 5);
        queue.push(2, 3);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_highest(), Some((2, 5)));
        assert!(queue.is_empty());
    }

    #[test]
    fn out_of_range_heights_are_ignored() {
        let mut queue = BucketQueue::new(4, 8);
        queue.push(0, 8);
        queue.push(1, usize::MAX);
        assert!(queue.is_empty());
    }

    #[test]
    fn update_height_moves_between_buckets() {
        let mut queue = BucketQueue::new(4, 8);
        queue.push(0, 2);
        queue.push(1, 4);
        queue.update_height(0, 2, 6);

        assert_eq!(queue.pop_highest(), Some((0, 6)));
        assert_eq!(queue.pop_highest(), Some((1, 4)));
    }

    #[test]
    fn update_past_the_top_drops_the_member() {
        let mut queue = BucketQueue::new(4, 8);
        queue.push(0, 2);
        queue.update_height(0, 2, 9);
        assert!(queue.is_empty());
        assert!(!queue.contains(0));
    }

    #[test]
    fn remove_and_clear() {
        let mut queue = BucketQueue::new(4, 8);
        queue.push(0, 2);
        queue.push(1, 2);
        queue.remove(0, 2);
        assert_eq!(queue.len(), 1);
        assert!(!queue.contains(0));

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.pop_lowest(), None);

        // reusable after clear
        queue.push(3, 1);
        assert_eq!(queue.pop_lowest(), Some((3, 1)));
    }
}
