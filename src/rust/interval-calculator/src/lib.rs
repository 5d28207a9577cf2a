// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Interval algorithms on integer time spans.
//!
//! The functions here operate on slices of spans and answer in terms of span
//! indices, so callers can map the result back onto whatever the spans were
//! derived from (pulses, playback events, ...).

pub mod interval;
use crate::interval::OrderedRange;

/// A minimal slice of the timeline together with the spans active during it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub range: OrderedRange<i64>,
    /// Indices of the spans covering the whole segment, in input order.
    pub active: Vec<usize>,
}

impl Segment {
    pub fn is_overlap(&self) -> bool {
        self.active.len() > 1
    }
}

/// Sorted, deduplicated start and end points of all spans.
pub fn boundaries(spans: &[OrderedRange<i64>]) -> Vec<i64> {
    let mut times: Vec<i64> = spans
        .iter()
        .flat_map(|span| [span.start(), span.end()])
        .collect();
    times.sort_unstable();
    times.dedup();
    times
}

/// Split the timeline into the disjoint segments delimited by consecutive
/// span boundaries.
///
/// For each segment `[a, b)` the result lists the spans with `start <= a` and
/// `end >= b`, i.e. the spans that are active during the entire segment.
/// Segments in which nothing plays are kept, with an empty `active` list, so
/// the returned segments always tile `[first boundary, last boundary)`.
pub fn segment_overlaps(spans: &[OrderedRange<i64>]) -> Vec<Segment> {
    boundaries(spans)
        .windows(2)
        .map(|window| {
            let (start, end) = (window[0], window[1]);
            let active = spans
                .iter()
                .enumerate()
                .filter(|(_, span)| span.covers(start, end))
                .map(|(index, _)| index)
                .collect();
            Segment {
                range: OrderedRange::new(start, end),
                active,
            }
        })
        .collect()
}

/// Whether at least two spans are simultaneously active at some point.
pub fn has_overlaps(spans: &[OrderedRange<i64>]) -> bool {
    segment_overlaps(spans).iter().any(Segment::is_overlap)
}

/// Greedy first-fit partitioning into groups of mutually non-overlapping spans.
///
/// Spans are visited in input order. Each span goes to the first partition
/// none of whose members overlaps it; if there is no such partition a new one
/// is opened. Touching spans (`a.end == b.start`) do not overlap.
///
/// Returns the span indices of each partition, in the order partitions were
/// opened.
pub fn partition_first_fit(spans: &[OrderedRange<i64>]) -> Vec<Vec<usize>> {
    let mut partitions: Vec<Vec<usize>> = vec![];
    for (index, span) in spans.iter().enumerate() {
        let slot = partitions.iter_mut().find(|members| {
            members
                .iter()
                .all(|&member| !spans[member].overlaps_range(span.start(), span.end()))
        });
        match slot {
            Some(members) => members.push(index),
            None => partitions.push(vec![index]),
        }
    }
    partitions
}
