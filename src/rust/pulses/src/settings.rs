// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Module for defining settings for waveform synthesis.
use anyhow::Context;
use serde::Deserialize;

use crate::{Error, Result};

/// Default sampling rate in samples per nanosecond (GSa/s).
///
/// Used for generating waveforms when the instrument does not provide a
/// different value.
pub const DEFAULT_SAMPLING_RATE: f64 = 5.89824;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SynthesisSettings {
    /// Samples per nanosecond.
    pub sampling_rate: f64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        SynthesisSettings {
            sampling_rate: DEFAULT_SAMPLING_RATE,
        }
    }
}

impl SynthesisSettings {
    pub fn new(sampling_rate: f64) -> Result<Self> {
        let settings = SynthesisSettings { sampling_rate };
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a JSON object. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: SynthesisSettings =
            serde_json::from_str(json).context("Failed to parse synthesis settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        check_sampling_rate(self.sampling_rate)
    }

    /// Highest carrier frequency in Hz that can be represented at this rate.
    pub fn nyquist_frequency(&self) -> f64 {
        self.sampling_rate * 1e9 / 2.0
    }
}

/// Reject rates that cannot size a waveform: non-finite, zero or negative.
pub(crate) fn check_sampling_rate(sampling_rate: f64) -> Result<()> {
    if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
        return Err(Error::InvalidSettings(format!(
            "sampling rate must be a positive number of samples per ns, got {sampling_rate}"
        )));
    }
    Ok(())
}
