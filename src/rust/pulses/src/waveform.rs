// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::hash::{Hash, Hasher};

use sha1::{Digest, Sha1};

/// A sequence of samples, the discrete data points used by the DACs to
/// synthesise pulses.
///
/// Two waveforms are equal if their samples, rounded to
/// [`Waveform::DECIMALS`] decimal places, are equal. The label is free text
/// for diagnostics and takes no part in comparisons.
#[derive(Debug, Clone, Default)]
pub struct Waveform {
    data: Vec<f64>,
    label: String,
}

impl Waveform {
    pub const DECIMALS: i32 = 5;

    pub fn new(data: Vec<f64>) -> Self {
        Waveform {
            data,
            label: String::new(),
        }
    }

    pub(crate) fn with_label(data: Vec<f64>, label: String) -> Self {
        Waveform { data, label }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Samples rounded to [`Waveform::DECIMALS`] places, as scaled integers.
    ///
    /// Rounding is half-to-even and `-0.0` collapses onto `0.0`.
    fn rounded(&self) -> impl Iterator<Item = i64> + '_ {
        let scale = 10f64.powi(Self::DECIMALS);
        self.data.iter().map(move |&sample| {
            if sample.is_nan() {
                i64::MIN
            } else {
                (sample * scale).round_ties_even() as i64
            }
        })
    }

    /// Hex SHA-1 digest of the rounded samples.
    ///
    /// Unlike [`Hash`], the digest is stable across processes and can be used
    /// to name waveforms uploaded to an instrument.
    pub fn fingerprint(&self) -> String {
        let rounded: Vec<i64> = self.rounded().collect();
        let mut hasher = Sha1::new();
        // Serializing a Vec<i64> cannot fail.
        hasher.update(serde_json::to_string(&rounded).unwrap_or_default().as_bytes());
        let hash = hasher.finalize();
        format!("{hash:x}")
    }
}

impl PartialEq for Waveform {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.rounded().eq(other.rounded())
    }
}

impl Eq for Waveform {}

impl Hash for Waveform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for sample in self.rounded() {
            sample.hash(state);
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl From<Vec<f64>> for Waveform {
    fn from(data: Vec<f64>) -> Self {
        Waveform::new(data)
    }
}
