// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! An always-sorted collection of pulses.
//!
//! Pulses are stored behind [`Arc`]: filtered views and shallow copies share
//! the stored pulses instead of cloning them. Mutation needs `&mut`, so a
//! reader on another thread works on its own [`PulseSequence::shallow_copy`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Index, Mul};
use std::sync::Arc;

use indexmap::IndexMap;
use interval_calculator::interval::OrderedRange;
use interval_calculator::{partition_first_fit, segment_overlaps};
use pulse_log::diagnostic;
use rayon::prelude::*;

use crate::pulse::{Pulse, PulseKind, PulseType};
use crate::waveform::Waveform;
use crate::{Error, Result};

/// Anything that can be added to a [`PulseSequence`].
#[derive(Debug, Clone)]
pub enum SequenceItem {
    Pulse(Arc<Pulse>),
    Sequence(PulseSequence),
}

impl From<Pulse> for SequenceItem {
    fn from(pulse: Pulse) -> Self {
        SequenceItem::Pulse(Arc::new(pulse))
    }
}

impl From<Arc<Pulse>> for SequenceItem {
    fn from(pulse: Arc<Pulse>) -> Self {
        SequenceItem::Pulse(pulse)
    }
}

impl From<PulseSequence> for SequenceItem {
    fn from(sequence: PulseSequence) -> Self {
        SequenceItem::Sequence(sequence)
    }
}

impl From<&PulseSequence> for SequenceItem {
    fn from(sequence: &PulseSequence) -> Self {
        SequenceItem::Sequence(sequence.shallow_copy())
    }
}

/// Pulses sorted ascending by `(start, channel)`.
///
/// The order is restored after every mutation. The sort is stable, so pulses
/// with equal keys keep their insertion order. Equality and hashing follow
/// [`PulseSequence::serial`].
#[derive(Debug, Clone, Default)]
pub struct PulseSequence {
    pulses: Vec<Arc<Pulse>>,
}

impl PulseSequence {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_shared(pulses: impl IntoIterator<Item = Arc<Pulse>>) -> Self {
        let mut sequence = PulseSequence {
            pulses: pulses.into_iter().collect(),
        };
        sequence.sort();
        sequence
    }

    fn sort(&mut self) {
        self.pulses
            .sort_by(|a, b| (a.start(), a.channel()).cmp(&(b.start(), b.channel())));
    }

    /// Add pulses and the pulses of other sequences, then restore the order.
    pub fn add_items<I>(&mut self, items: I)
    where
        I: IntoIterator,
        I::Item: Into<SequenceItem>,
    {
        for item in items {
            match item.into() {
                SequenceItem::Pulse(pulse) => self.pulses.push(pulse),
                SequenceItem::Sequence(sequence) => self.pulses.extend(sequence.pulses),
            }
        }
        self.sort();
    }

    pub fn push(&mut self, pulse: impl Into<Arc<Pulse>>) {
        self.add_items([SequenceItem::Pulse(pulse.into())]);
    }

    /// Remove every pulse equal to `pulse`. Returns the number removed.
    pub fn remove(&mut self, pulse: &Pulse) -> usize {
        let serial = pulse.serial();
        let before = self.pulses.len();
        self.pulses.retain(|stored| stored.serial() != serial);
        before - self.pulses.len()
    }

    pub fn pop(&mut self, index: usize) -> Option<Arc<Pulse>> {
        (index < self.pulses.len()).then(|| self.pulses.remove(index))
    }

    pub fn pop_last(&mut self) -> Option<Arc<Pulse>> {
        self.pulses.pop()
    }

    /// Position of the first pulse equal to `pulse`.
    pub fn index_of(&self, pulse: &Pulse) -> Option<usize> {
        let serial = pulse.serial();
        self.pulses.iter().position(|stored| stored.serial() == serial)
    }

    pub fn contains(&self, pulse: &Pulse) -> bool {
        self.index_of(pulse).is_some()
    }

    pub fn clear(&mut self) {
        self.pulses.clear();
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Pulse>> {
        self.pulses.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Pulse>> {
        self.pulses.iter()
    }

    pub fn serial(&self) -> String {
        let mut serial = String::from("PulseSequence\n");
        let pulses: Vec<String> = self.pulses.iter().map(|pulse| pulse.serial()).collect();
        serial.push_str(&pulses.join("\n"));
        serial
    }

    /// A sequence of independent copies of the stored pulses.
    pub fn copy(&self) -> Self {
        self.pulses
            .iter()
            .map(|pulse| Arc::new(pulse.copy()))
            .collect()
    }

    /// A new sequence sharing the stored pulses.
    pub fn shallow_copy(&self) -> Self {
        self.clone()
    }

    /// `n` independent copies of the stored pulses.
    pub fn repeat(&self, n: i64) -> Result<Self> {
        let n = usize::try_from(n)
            .map_err(|_| Error::InvalidOperand(format!("argument n should be >= 0, got {n}")))?;
        Ok(self * n)
    }

    /// Append `n - 1` independent copies of the current content.
    pub fn repeat_in_place(&mut self, n: i64) -> Result<()> {
        if n < 1 {
            return Err(Error::InvalidOperand(format!(
                "argument n should be >= 1, got {n}"
            )));
        }
        let snapshot = self.shallow_copy();
        for _ in 1..n {
            self.add_items([snapshot.copy()]);
        }
        Ok(())
    }

    fn filtered(&self, predicate: impl Fn(&Pulse) -> bool) -> Self {
        Self::from_shared(
            self.pulses
                .iter()
                .filter(|&pulse| predicate(pulse))
                .cloned(),
        )
    }

    fn of_type(&self, pulse_type: PulseType) -> Self {
        self.filtered(|pulse| pulse.pulse_type() == pulse_type)
    }

    pub fn readout_pulses(&self) -> Self {
        self.of_type(PulseType::Readout)
    }

    pub fn drive_pulses(&self) -> Self {
        self.of_type(PulseType::Drive)
    }

    pub fn flux_pulses(&self) -> Self {
        self.of_type(PulseType::Flux)
    }

    pub fn coupler_flux_pulses(&self) -> Self {
        self.of_type(PulseType::CouplerFlux)
    }

    pub fn pulses_on_channels(&self, channels: &[&str]) -> Self {
        self.filtered(|pulse| {
            pulse
                .channel()
                .is_some_and(|channel| channels.contains(&channel))
        })
    }

    /// Pulses addressing any of `qubits`. Coupler flux pulses address
    /// couplers and are never included.
    pub fn pulses_on_qubits(&self, qubits: &[i64]) -> Self {
        self.filtered(|pulse| {
            pulse.kind() != PulseKind::CouplerFlux && qubits.contains(&pulse.qubit())
        })
    }

    /// Coupler flux pulses addressing any of `couplers`.
    pub fn coupler_pulses(&self, couplers: &[i64]) -> Self {
        self.filtered(|pulse| {
            pulse.kind() == PulseKind::CouplerFlux && couplers.contains(&pulse.qubit())
        })
    }

    /// Latest finish time, 0 if empty.
    pub fn finish(&self) -> i64 {
        self.pulses.iter().map(|pulse| pulse.finish()).fold(0, i64::max)
    }

    /// Earliest start time, never later than [`PulseSequence::finish`].
    pub fn start(&self) -> i64 {
        self.pulses
            .iter()
            .map(|pulse| pulse.start())
            .fold(self.finish(), i64::min)
    }

    pub fn duration(&self) -> i64 {
        self.finish() - self.start()
    }

    /// Channels in use, sorted and deduplicated. Pulses without a channel
    /// are skipped.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .pulses
            .iter()
            .filter_map(|pulse| pulse.channel().map(str::to_string))
            .collect();
        channels.sort();
        channels.dedup();
        channels
    }

    pub fn qubits(&self) -> Vec<i64> {
        let mut qubits: Vec<i64> = self.pulses.iter().map(|pulse| pulse.qubit()).collect();
        qubits.sort_unstable();
        qubits.dedup();
        qubits
    }

    fn spans(&self) -> Vec<OrderedRange<i64>> {
        self.pulses
            .iter()
            .map(|pulse| OrderedRange::new(pulse.start(), pulse.finish()))
            .collect()
    }

    /// Split the timeline at every pulse start and finish.
    ///
    /// Maps each minimal interval `[a, b)` to the pulses with `start <= a`
    /// and `finish >= b`. Intervals in which nothing plays map to an empty
    /// sequence.
    pub fn overlap_intervals(&self) -> IndexMap<OrderedRange<i64>, PulseSequence> {
        segment_overlaps(&self.spans())
            .into_iter()
            .map(|segment| {
                let pulses = segment
                    .active
                    .iter()
                    .map(|&index| Arc::clone(&self.pulses[index]));
                (segment.range, Self::from_shared(pulses))
            })
            .collect()
    }

    /// Whether two or more pulses play at the same time.
    pub fn has_overlaps(&self) -> bool {
        interval_calculator::has_overlaps(&self.spans())
    }

    /// Split into sequences without overlapping pulses, first fit in
    /// sequence order.
    ///
    /// Pulse frequencies are not compared: pulses with different carriers
    /// may share a partition.
    pub fn partition_non_overlapping(&self) -> Vec<PulseSequence> {
        let partitions: Vec<PulseSequence> = partition_first_fit(&self.spans())
            .into_iter()
            .map(|members| {
                Self::from_shared(
                    members
                        .into_iter()
                        .map(|index| Arc::clone(&self.pulses[index])),
                )
            })
            .collect();
        diagnostic!(
            "Partitioned {} pulses into {} non-overlapping sequences",
            self.len(),
            partitions.len()
        );
        partitions
    }

    /// Modulated I/Q waveforms of every pulse, in sequence order.
    ///
    /// Pulses are synthesized in parallel.
    pub fn synthesize(&self, sampling_rate: f64) -> Result<Vec<(Waveform, Waveform)>> {
        self.pulses
            .par_iter()
            .map(|pulse| pulse.modulated_waveforms(sampling_rate))
            .collect()
    }
}

impl PartialEq for PulseSequence {
    fn eq(&self, other: &Self) -> bool {
        self.serial() == other.serial()
    }
}

impl Eq for PulseSequence {}

impl Hash for PulseSequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serial().hash(state);
    }
}

impl fmt::Display for PulseSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serial())
    }
}

impl FromIterator<Pulse> for PulseSequence {
    fn from_iter<T: IntoIterator<Item = Pulse>>(iter: T) -> Self {
        Self::from_shared(iter.into_iter().map(Arc::new))
    }
}

impl FromIterator<Arc<Pulse>> for PulseSequence {
    fn from_iter<T: IntoIterator<Item = Arc<Pulse>>>(iter: T) -> Self {
        Self::from_shared(iter)
    }
}

impl<'a> IntoIterator for &'a PulseSequence {
    type Item = &'a Arc<Pulse>;
    type IntoIter = std::slice::Iter<'a, Arc<Pulse>>;

    fn into_iter(self) -> Self::IntoIter {
        self.pulses.iter()
    }
}

impl Index<usize> for PulseSequence {
    type Output = Arc<Pulse>;

    fn index(&self, index: usize) -> &Arc<Pulse> {
        &self.pulses[index]
    }
}

impl Add for PulseSequence {
    type Output = PulseSequence;

    fn add(mut self, other: PulseSequence) -> PulseSequence {
        self += other;
        self
    }
}

impl Add<&PulseSequence> for &PulseSequence {
    type Output = PulseSequence;

    fn add(self, other: &PulseSequence) -> PulseSequence {
        self.shallow_copy() + other.shallow_copy()
    }
}

impl Add<Pulse> for PulseSequence {
    type Output = PulseSequence;

    fn add(mut self, pulse: Pulse) -> PulseSequence {
        self += pulse;
        self
    }
}

impl AddAssign for PulseSequence {
    fn add_assign(&mut self, other: PulseSequence) {
        self.add_items([other]);
    }
}

impl AddAssign<&PulseSequence> for PulseSequence {
    fn add_assign(&mut self, other: &PulseSequence) {
        self.add_items([other]);
    }
}

impl AddAssign<Pulse> for PulseSequence {
    fn add_assign(&mut self, pulse: Pulse) {
        self.push(pulse);
    }
}

impl Mul<usize> for &PulseSequence {
    type Output = PulseSequence;

    fn mul(self, n: usize) -> PulseSequence {
        (0..n)
            .flat_map(|_| self.pulses.iter().map(|pulse| Arc::new(pulse.copy())))
            .collect()
    }
}

impl Mul<usize> for PulseSequence {
    type Output = PulseSequence;

    fn mul(self, n: usize) -> PulseSequence {
        &self * n
    }
}
