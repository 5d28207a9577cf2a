// Copyright 2024 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;
use std::hash::Hash;

/// Half-open range `[start, end)` ordered by start, then by end.
#[derive(Clone, Eq, PartialEq, Hash, Default, Debug)]
pub struct OrderedRange<Num: Ord>(pub std::ops::Range<Num>);

impl<Num: Ord + Copy> OrderedRange<Num> {
    pub fn new(start: Num, end: Num) -> Self {
        OrderedRange(start..end)
    }

    pub fn start(&self) -> Num {
        self.0.start
    }

    pub fn end(&self) -> Num {
        self.0.end
    }

    /// Whether `self` spans all of `[start, stop]`, boundaries included.
    pub fn covers(&self, start: Num, stop: Num) -> bool {
        self.0.start <= start && self.0.end >= stop
    }
}

impl<Num: Ord> OrderedRange<Num> {
    pub fn overlaps_range(&self, start: Num, stop: Num) -> bool {
        self.0.start < stop && self.0.end > start
    }
}

impl<Num: Ord> Ord for OrderedRange<Num> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.0.start.cmp(&other.0.start) {
            Ordering::Equal => self.0.end.cmp(&other.0.end),
            ordering => ordering,
        }
    }
}

impl<Num: Ord> PartialOrd for OrderedRange<Num> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Num: Ord + Copy> From<(Num, Num)> for OrderedRange<Num> {
    fn from((start, end): (Num, Num)) -> Self {
        OrderedRange(start..end)
    }
}
