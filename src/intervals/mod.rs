use std::fmt::{Debug, Display, Formatter};

/// closed range of positions, `from..=to`.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub from: usize,
    pub to: usize,
}

impl Interval {
    pub fn new(from: usize, to: usize) -> Self {
        debug_assert!(from <= to, "empty interval {from}..={to}");
        Self { from, to }
    }

    pub fn point(at: usize) -> Self {
        Self { from: at, to: at }
    }

    pub fn len(&self) -> usize {
        self.to - self.from + 1
    }

    pub fn contains(&self, at: usize) -> bool {
        self.from <= at && at <= self.to
    }
}

impl Debug for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.from == self.to {
            write!(f, "[{}]", self.from)
        } else {
            write!(f, "[{}, {}]", self.from, self.to)
        }
    }
}

/// sorted set of disjoint, non-adjacent intervals.
///
/// the algebra (`union`, `intersection`, `difference`) builds new sets and leaves its operands
/// untouched. the point operations mutate in place and are what the garbage collector worklist
/// uses to move positions between its "dead" and "to process" sets.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self { intervals: Vec::new() }
    }

    /// `0..end` as a set. empty when `end` is zero.
    pub fn up_to(end: usize) -> Self {
        if end == 0 {
            Self::new()
        } else {
            Self { intervals: vec![Interval::new(0, end - 1)] }
        }
    }

    pub fn from_intervals<I: IntoIterator<Item = Interval>>(intervals: I) -> Self {
        let mut sorted: Vec<Interval> = intervals.into_iter().collect();
        sorted.sort_by_key(|i| i.from);
        let mut set = Self::new();
        for interval in sorted {
            set.push_sorted(interval);
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// amount of points in the set.
    pub fn len(&self) -> usize {
        self.intervals.iter().map(Interval::len).sum()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.intervals.iter().flat_map(|i| i.from..=i.to)
    }

    pub fn first(&self) -> Option<usize> {
        self.intervals.first().map(|i| i.from)
    }

    fn locate(&self, at: usize) -> Result<usize, usize> {
        self.intervals.binary_search_by(|i| {
            if i.to < at {
                std::cmp::Ordering::Less
            } else if i.from > at {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
    }

    pub fn contains(&self, at: usize) -> bool {
        self.locate(at).is_ok()
    }

    /// returns false if the point was already present.
    pub fn insert(&mut self, at: usize) -> bool {
        let idx = match self.locate(at) {
            Ok(_) => return false,
            Err(idx) => idx,
        };
        let joins_prev = idx > 0 && self.intervals[idx - 1].to + 1 == at;
        let joins_next = idx < self.intervals.len() && self.intervals[idx].from == at + 1;
        match (joins_prev, joins_next) {
            (true, true) => {
                self.intervals[idx - 1].to = self.intervals[idx].to;
                self.intervals.remove(idx);
            }
            (true, false) => self.intervals[idx - 1].to = at,
            (false, true) => self.intervals[idx].from = at,
            (false, false) => self.intervals.insert(idx, Interval::point(at)),
        }
        true
    }

    /// returns false if the point was not present.
    pub fn remove(&mut self, at: usize) -> bool {
        let idx = match self.locate(at) {
            Ok(idx) => idx,
            Err(_) => return false,
        };
        let Interval { from, to } = self.intervals[idx];
        match (from == at, to == at) {
            (true, true) => {
                self.intervals.remove(idx);
            }
            (true, false) => self.intervals[idx].from = at + 1,
            (false, true) => self.intervals[idx].to = at - 1,
            (false, false) => {
                self.intervals[idx].to = at - 1;
                self.intervals.insert(idx + 1, Interval::new(at + 1, to));
            }
        }
        true
    }

    pub fn pop_first(&mut self) -> Option<usize> {
        let first = self.first()?;
        self.remove(first);
        Some(first)
    }

    /// appends an interval that starts at or after the start of the last one, merging
    /// overlapping and adjacent ranges.
    fn push_sorted(&mut self, interval: Interval) {
        if let Some(last) = self.intervals.last_mut() {
            debug_assert!(last.from <= interval.from);
            if interval.from <= last.to.saturating_add(1) {
                last.to = last.to.max(interval.to);
                return;
            }
        }
        self.intervals.push(interval);
    }

    pub fn union(&self, other: &IntervalSet) -> IntervalSet {
        let mut merged = Vec::with_capacity(self.intervals.len() + other.intervals.len());
        let (mut a, mut b) = (self.intervals.iter().peekable(), other.intervals.iter().peekable());
        loop {
            let next = match (a.peek(), b.peek()) {
                (Some(x), Some(y)) if x.from <= y.from => a.next(),
                (Some(_), Some(_)) => b.next(),
                (Some(_), None) => a.next(),
                (None, Some(_)) => b.next(),
                (None, None) => break,
            };
            merged.extend(next.copied());
        }
        let mut set = IntervalSet::new();
        for interval in merged {
            set.push_sorted(interval);
        }
        set
    }

    pub fn intersection(&self, other: &IntervalSet) -> IntervalSet {
        let mut set = IntervalSet::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let (x, y) = (self.intervals[i], other.intervals[j]);
            let from = x.from.max(y.from);
            let to = x.to.min(y.to);
            if from <= to {
                set.push_sorted(Interval::new(from, to));
            }
            if x.to < y.to {
                i += 1;
            } else {
                j += 1;
            }
        }
        set
    }

    pub fn difference(&self, other: &IntervalSet) -> IntervalSet {
        let mut set = IntervalSet::new();
        let mut j = 0;
        for &interval in &self.intervals {
            let mut from = interval.from;
            while j < other.intervals.len() && other.intervals[j].to < from {
                j += 1;
            }
            let mut k = j;
            let mut exhausted = false;
            while k < other.intervals.len() && other.intervals[k].from <= interval.to {
                let cut = other.intervals[k];
                if cut.from > from {
                    set.push_sorted(Interval::new(from, cut.from - 1));
                }
                if cut.to >= interval.to {
                    exhausted = true;
                    break;
                }
                from = cut.to + 1;
                k += 1;
            }
            if !exhausted {
                set.push_sorted(Interval::new(from, interval.to));
            }
        }
        set
    }

    /// every point of `bounds` that is not in this set.
    pub fn complement_within(&self, bounds: Interval) -> IntervalSet {
        IntervalSet::from_intervals([bounds]).difference(self)
    }
}

impl Debug for IntervalSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.intervals.iter()).finish()
    }
}

impl Display for IntervalSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ranges: &[(usize, usize)]) -> IntervalSet {
        IntervalSet::from_intervals(ranges.iter().map(|&(a, b)| Interval::new(a, b)))
    }

    #[test]
    fn construction_merges_overlaps_and_neighbours() {
        let s = set(&[(5, 7), (0, 2), (3, 3), (6, 9), (20, 20)]);
        assert_eq!(s.intervals(), &[Interval::new(0, 9), Interval::point(20)]);
        assert_eq!(s.len(), 11);
        assert!(IntervalSet::up_to(0).is_empty());
        assert_eq!(IntervalSet::up_to(4).intervals(), &[Interval::new(0, 3)]);
    }

    #[test]
    fn point_insertion_bridges_gaps() {
        let mut s = set(&[(0, 1), (3, 4)]);
        assert!(s.insert(2));
        assert!(!s.insert(2));
        assert_eq!(s.intervals(), &[Interval::new(0, 4)]);
        assert!(s.insert(6));
        assert!(s.insert(10));
        assert_eq!(s, set(&[(0, 4), (6, 6), (10, 10)]));
    }

    #[test]
    fn point_removal_splits_intervals() {
        let mut s = set(&[(0, 9)]);
        assert!(s.remove(4));
        assert!(!s.remove(4));
        assert_eq!(s, set(&[(0, 3), (5, 9)]));
        assert!(s.remove(0));
        assert!(s.remove(9));
        assert_eq!(s, set(&[(1, 3), (5, 8)]));
        assert!(!s.contains(4));
        assert!(s.contains(5));
    }

    #[test]
    fn pop_first_drains_in_order() {
        let mut s = set(&[(7, 8), (2, 3)]);
        let drained: Vec<usize> = std::iter::from_fn(|| s.pop_first()).collect();
        assert_eq!(drained, vec![2, 3, 7, 8]);
        assert!(s.is_empty());
    }

    #[test]
    fn algebra() {
        let a = set(&[(0, 5), (10, 15)]);
        let b = set(&[(3, 12), (20, 21)]);
        assert_eq!(a.union(&b), set(&[(0, 15), (20, 21)]));
        assert_eq!(a.intersection(&b), set(&[(3, 5), (10, 12)]));
        assert_eq!(a.difference(&b), set(&[(0, 2), (13, 15)]));
        assert_eq!(b.difference(&a), set(&[(6, 9), (20, 21)]));
        assert_eq!(a.difference(&a), IntervalSet::new());
        assert_eq!(set(&[(0, 10)]).difference(&set(&[(2, 2), (4, 5), (10, 10)])),
                   set(&[(0, 1), (3, 3), (6, 9)]));
    }

    #[test]
    fn complement() {
        let holes = set(&[(2, 3), (8, 8)]);
        assert_eq!(holes.complement_within(Interval::new(0, 9)), set(&[(0, 1), (4, 7), (9, 9)]));
        assert_eq!(holes.iter().collect::<Vec<_>>(), vec![2, 3, 8]);
    }
}
