// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Occupancy intervals over a slot array.

An [`IntervalList`] records which indices of a slot array are currently occupied, as a
sorted list of `[start, start + len)` spans.  The list is kept maximally coalesced: no two
stored intervals touch, so binding a range needs exactly one native call per interval.

Updates cost O(number of intervals).
*/

use smallvec::SmallVec;

/// A contiguous occupied span of slot-array indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: u32,
    pub len: u32,
}

impl Interval {
    pub const fn new(start: u32, len: u32) -> Self {
        Interval { start, len }
    }
    /// One past the last index.
    pub const fn end(&self) -> u32 {
        self.start + self.len
    }
    pub const fn contains(&self, index: u32) -> bool {
        index >= self.start && index < self.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalList {
    intervals: SmallVec<[Interval; 4]>,
}

impl IntervalList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.intervals.iter().any(|i| i.contains(index))
    }

    /**
    Marks `index` occupied.

    `index` must currently be vacant.
    */
    pub fn occupy(&mut self, index: u32) {
        debug_assert!(!self.contains(index), "index {index} already occupied");
        for k in 0..self.intervals.len() {
            let current = self.intervals[k];
            if index + 1 == current.start {
                //grow left, then maybe join the previous interval
                self.intervals[k].start -= 1;
                self.intervals[k].len += 1;
                if k > 0 && self.intervals[k - 1].end() == self.intervals[k].start {
                    self.intervals[k - 1].len += self.intervals[k].len;
                    self.intervals.remove(k);
                }
                self.debug_check();
                return;
            } else if index == current.end() {
                //grow right, then maybe join the next interval
                self.intervals[k].len += 1;
                if k + 1 < self.intervals.len()
                    && self.intervals[k].end() == self.intervals[k + 1].start
                {
                    self.intervals[k].len += self.intervals[k + 1].len;
                    self.intervals.remove(k + 1);
                }
                self.debug_check();
                return;
            } else if index < current.start {
                //strictly between the previous interval and this one, touching neither
                self.intervals.insert(k, Interval::new(index, 1));
                self.debug_check();
                return;
            }
        }
        //past every interval; the right-growth case above already handled adjacency
        self.intervals.push(Interval::new(index, 1));
        self.debug_check();
    }

    /**
    Marks `index` vacant.

    `index` must currently be occupied.
    */
    pub fn vacate(&mut self, index: u32) {
        let Some(k) = self.intervals.iter().position(|i| i.contains(index)) else {
            debug_assert!(false, "index {index} was not occupied");
            return;
        };
        let current = self.intervals[k];
        if current.len == 1 {
            self.intervals.remove(k);
        } else if index == current.start {
            self.intervals[k].start += 1;
            self.intervals[k].len -= 1;
        } else if index == current.end() - 1 {
            self.intervals[k].len -= 1;
        } else {
            //split around index
            self.intervals[k].len = index - current.start;
            self.intervals
                .insert(k + 1, Interval::new(index + 1, current.end() - index - 1));
        }
        self.debug_check();
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    fn debug_check(&self) {
        debug_assert!(
            self.intervals
                .windows(2)
                .all(|w| w[0].end() < w[1].start),
            "intervals not sorted and coalesced: {:?}",
            self.intervals
        );
        debug_assert!(self.intervals.iter().all(|i| i.len > 0));
    }
}
