// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::f64::consts::TAU;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::format::{format_float, format_grouped};
use crate::sequence::PulseSequence;
use crate::shape::{PulseParameters, Shape};
use crate::waveform::Waveform;
use crate::{Error, Result};

/// Functional role of a pulse.
///
/// Readout pulses trigger acquisitions, drive pulses control qubit states,
/// flux pulses shift the frequency of flux tunable qubits and coupler flux
/// pulses do the same for tunable couplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PulseType {
    #[serde(rename = "ro")]
    Readout,
    #[serde(rename = "qd")]
    Drive,
    #[serde(rename = "qf")]
    Flux,
    #[serde(rename = "cf")]
    CouplerFlux,
}

impl PulseType {
    /// Short code used by platform descriptions.
    pub fn code(&self) -> &'static str {
        match self {
            PulseType::Readout => "ro",
            PulseType::Drive => "qd",
            PulseType::Flux => "qf",
            PulseType::CouplerFlux => "cf",
        }
    }
}

impl fmt::Display for PulseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PulseType::Readout => "READOUT",
            PulseType::Drive => "DRIVE",
            PulseType::Flux => "FLUX",
            PulseType::CouplerFlux => "COUPLERFLUX",
        };
        write!(f, "PulseType.{name}")
    }
}

impl FromStr for PulseType {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        match code {
            "ro" => Ok(PulseType::Readout),
            "qd" => Ok(PulseType::Drive),
            "qf" => Ok(PulseType::Flux),
            "cf" => Ok(PulseType::CouplerFlux),
            _ => Err(Error::new(&format!("Unknown pulse type `{code}`"))),
        }
    }
}

/// The pulse variant.
///
/// `Generic` pulses carry an arbitrary [`PulseType`]. The typed variants fix
/// the type and specialize behavior: readout pulses have zero global phase,
/// flux and coupler flux pulses have no carrier and no quadrature component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PulseKind {
    Generic(PulseType),
    Readout,
    Drive,
    Flux,
    CouplerFlux,
}

impl PulseKind {
    pub fn pulse_type(&self) -> PulseType {
        match self {
            PulseKind::Generic(pulse_type) => *pulse_type,
            PulseKind::Readout => PulseType::Readout,
            PulseKind::Drive => PulseType::Drive,
            PulseKind::Flux => PulseType::Flux,
            PulseKind::CouplerFlux => PulseType::CouplerFlux,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PulseKind::Generic(_) => "Pulse",
            PulseKind::Readout => "ReadoutPulse",
            PulseKind::Drive => "DrivePulse",
            PulseKind::Flux => "FluxPulse",
            PulseKind::CouplerFlux => "CouplerFluxPulse",
        }
    }

    fn is_flux(&self) -> bool {
        matches!(self, PulseKind::Flux | PulseKind::CouplerFlux)
    }
}

/// A pulse to be played on a channel of the QPU control electronics.
///
/// Identity is defined by [`Pulse::serial`]: two pulses with the same
/// fields compare equal and hash alike, wherever they live.
#[derive(Debug, Clone)]
pub struct Pulse {
    /// Start time in ns.
    start: i64,
    /// Duration in ns.
    duration: i64,
    /// Digital amplitude, normalized to [-1, 1] by convention.
    amplitude: f64,
    /// Intermediate frequency in Hz, intended range 10 MHz to 300 MHz.
    frequency: i64,
    /// Phase offset in radians.
    relative_phase: f64,
    shape: Arc<Shape>,
    channel: Option<String>,
    /// Qubit or coupler addressed by the pulse.
    qubit: i64,
    kind: PulseKind,
}

impl Pulse {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start: i64,
        duration: i64,
        amplitude: f64,
        frequency: i64,
        relative_phase: f64,
        shape: Shape,
        channel: Option<&str>,
        pulse_type: PulseType,
        qubit: i64,
    ) -> Self {
        Pulse {
            start,
            duration,
            amplitude,
            frequency,
            relative_phase,
            shape: Arc::new(shape),
            channel: channel.map(str::to_string),
            qubit,
            kind: PulseKind::Generic(pulse_type),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn readout(
        start: i64,
        duration: i64,
        amplitude: f64,
        frequency: i64,
        relative_phase: f64,
        shape: Shape,
        channel: Option<&str>,
        qubit: i64,
    ) -> Self {
        Pulse {
            kind: PulseKind::Readout,
            ..Pulse::new(
                start,
                duration,
                amplitude,
                frequency,
                relative_phase,
                shape,
                channel,
                PulseType::Readout,
                qubit,
            )
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn drive(
        start: i64,
        duration: i64,
        amplitude: f64,
        frequency: i64,
        relative_phase: f64,
        shape: Shape,
        channel: Option<&str>,
        qubit: i64,
    ) -> Self {
        Pulse {
            kind: PulseKind::Drive,
            ..Pulse::new(
                start,
                duration,
                amplitude,
                frequency,
                relative_phase,
                shape,
                channel,
                PulseType::Drive,
                qubit,
            )
        }
    }

    /// A flux pulse. Frequency and relative phase are always zero.
    pub fn flux(
        start: i64,
        duration: i64,
        amplitude: f64,
        shape: Shape,
        channel: Option<&str>,
        qubit: i64,
    ) -> Self {
        Pulse {
            kind: PulseKind::Flux,
            ..Pulse::new(
                start,
                duration,
                amplitude,
                0,
                0.0,
                shape,
                channel,
                PulseType::Flux,
                qubit,
            )
        }
    }

    /// A coupler flux pulse; `coupler` is the index of the addressed coupler.
    pub fn coupler_flux(
        start: i64,
        duration: i64,
        amplitude: f64,
        shape: Shape,
        channel: Option<&str>,
        coupler: i64,
    ) -> Self {
        Pulse {
            kind: PulseKind::CouplerFlux,
            ..Pulse::flux(start, duration, amplitude, shape, channel, coupler)
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// Time when the pulse is scheduled to finish.
    pub fn finish(&self) -> i64 {
        self.start + self.duration
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn frequency(&self) -> i64 {
        self.frequency
    }

    pub fn relative_phase(&self) -> f64 {
        self.relative_phase
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shared_shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn qubit(&self) -> i64 {
        self.qubit
    }

    pub fn kind(&self) -> PulseKind {
        self.kind
    }

    pub fn pulse_type(&self) -> PulseType {
        self.kind.pulse_type()
    }

    pub fn set_start(&mut self, start: i64) {
        self.start = start;
    }

    pub fn set_duration(&mut self, duration: i64) {
        self.duration = duration;
    }

    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.amplitude = amplitude;
    }

    pub fn set_channel(&mut self, channel: Option<&str>) {
        self.channel = channel.map(str::to_string);
    }

    pub fn set_qubit(&mut self, qubit: i64) {
        self.qubit = qubit;
    }

    /// Phase in radians accumulated by the carrier up to the pulse start,
    /// `2π·frequency·start` with start in ns.
    ///
    /// Readout pulses have zero global phase, so that results in the I-Q
    /// plane depend on the relative phase only.
    pub fn global_phase(&self) -> f64 {
        match self.pulse_type() {
            PulseType::Readout => 0.0,
            _ => TAU * self.frequency as f64 * self.start as f64 / 1e9,
        }
    }

    /// Total phase: global plus relative phase.
    pub fn phase(&self) -> f64 {
        self.global_phase() + self.relative_phase
    }

    /// The quantities the shape needs for synthesis.
    pub fn parameters(&self) -> PulseParameters {
        PulseParameters {
            duration: Some(self.duration),
            amplitude: self.amplitude,
            frequency: self.frequency,
            global_phase: self.global_phase(),
            relative_phase: self.relative_phase,
        }
    }

    /// Canonical text form; the key for equality and hashing.
    pub fn serial(&self) -> String {
        let channel = self.channel.as_deref().unwrap_or("None");
        match self.kind {
            PulseKind::Generic(pulse_type) => format!(
                "Pulse({}, {}, {}, {}, {}, {}, {}, {}, {})",
                self.start,
                self.duration,
                format_float(self.amplitude),
                format_grouped(self.frequency),
                format_float(self.relative_phase),
                self.shape,
                channel,
                pulse_type,
                self.qubit
            ),
            PulseKind::Readout | PulseKind::Drive => format!(
                "{}({}, {}, {}, {}, {}, {}, {}, {})",
                self.kind.name(),
                self.start,
                self.duration,
                format_float(self.amplitude),
                format_grouped(self.frequency),
                format_float(self.relative_phase),
                self.shape,
                channel,
                self.qubit
            ),
            PulseKind::Flux | PulseKind::CouplerFlux => format!(
                "{}({}, {}, {}, {}, {}, {})",
                self.kind.name(),
                self.start,
                self.duration,
                format_float(self.amplitude),
                self.shape,
                channel,
                self.qubit
            ),
        }
    }

    pub fn envelope_waveform_i(&self, sampling_rate: f64) -> Result<Waveform> {
        self.shape
            .envelope_waveform_i(&self.parameters(), sampling_rate)
    }

    /// Flux pulses only have an I component, which is returned for Q as well.
    pub fn envelope_waveform_q(&self, sampling_rate: f64) -> Result<Waveform> {
        if self.kind.is_flux() {
            return self.envelope_waveform_i(sampling_rate);
        }
        self.shape
            .envelope_waveform_q(&self.parameters(), sampling_rate)
    }

    pub fn envelope_waveforms(&self, sampling_rate: f64) -> Result<(Waveform, Waveform)> {
        Ok((
            self.envelope_waveform_i(sampling_rate)?,
            self.envelope_waveform_q(sampling_rate)?,
        ))
    }

    /// I and Q waveforms modulated with the pulse frequency.
    ///
    /// Flux pulses are not mixed: both components equal the I envelope.
    pub fn modulated_waveforms(&self, sampling_rate: f64) -> Result<(Waveform, Waveform)> {
        if self.kind.is_flux() {
            let envelope = self.envelope_waveform_i(sampling_rate)?;
            return Ok((envelope.clone(), envelope));
        }
        self.shape
            .modulated_waveforms(&self.parameters(), sampling_rate)
    }

    pub fn modulated_waveform_i(&self, sampling_rate: f64) -> Result<Waveform> {
        Ok(self.modulated_waveforms(sampling_rate)?.0)
    }

    pub fn modulated_waveform_q(&self, sampling_rate: f64) -> Result<Waveform> {
        Ok(self.modulated_waveforms(sampling_rate)?.1)
    }

    /// An independent pulse of the same variant, with a freshly allocated
    /// shape.
    pub fn copy(&self) -> Pulse {
        Pulse {
            shape: Arc::new(Shape::clone(&self.shape)),
            ..self.clone()
        }
    }

    /// A generic pulse with the same fields, sharing this pulse's shape.
    pub fn shallow_copy(&self) -> Pulse {
        Pulse {
            kind: PulseKind::Generic(self.pulse_type()),
            shape: Arc::clone(&self.shape),
            ..self.clone()
        }
    }

    /// Whether the pulses are equal in everything but their start time.
    pub fn equal_ignoring_start(&self, other: &Pulse) -> bool {
        self.duration == other.duration
            && self.amplitude == other.amplitude
            && self.frequency == other.frequency
            && self.relative_phase == other.relative_phase
            && self.shape == other.shape
            && self.channel == other.channel
            && self.pulse_type() == other.pulse_type()
            && self.qubit == other.qubit
    }

    /// A sequence of `n` independent copies of this pulse.
    pub fn repeat(&self, n: i64) -> Result<PulseSequence> {
        let n = usize::try_from(n)
            .map_err(|_| Error::InvalidOperand(format!("argument n should be >= 0, got {n}")))?;
        Ok((0..n).map(|_| self.copy()).collect())
    }
}

impl PartialEq for Pulse {
    fn eq(&self, other: &Self) -> bool {
        self.serial() == other.serial()
    }
}

impl Eq for Pulse {}

impl Hash for Pulse {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serial().hash(state);
    }
}

impl fmt::Display for Pulse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serial())
    }
}

impl Add for Pulse {
    type Output = PulseSequence;

    fn add(self, other: Pulse) -> PulseSequence {
        PulseSequence::from_iter([self, other])
    }
}

impl Add<PulseSequence> for Pulse {
    type Output = PulseSequence;

    fn add(self, other: PulseSequence) -> PulseSequence {
        PulseSequence::from_iter([self]) + other
    }
}

impl Add<&PulseSequence> for Pulse {
    type Output = PulseSequence;

    fn add(self, other: &PulseSequence) -> PulseSequence {
        self + other.shallow_copy()
    }
}

impl Mul<usize> for &Pulse {
    type Output = PulseSequence;

    fn mul(self, n: usize) -> PulseSequence {
        (0..n).map(|_| self.copy()).collect()
    }
}

impl Mul<usize> for Pulse {
    type Output = PulseSequence;

    fn mul(self, n: usize) -> PulseSequence {
        &self * n
    }
}
