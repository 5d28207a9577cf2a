// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Pulses played by arbitrary waveform generators and their scheduling.
//!
//! A [`Pulse`] carries timing, amplitude, carrier frequency, phase, the
//! channel it is played on and an envelope [`Shape`]. Shapes synthesize
//! [`Waveform`]s from the pulse parameters; pulses are collected into an
//! always-sorted [`PulseSequence`], which answers overlap queries.

pub mod format;
pub mod pulse;
pub mod sequence;
pub mod settings;
pub mod shape;
pub mod waveform;

pub use pulse::{Pulse, PulseKind, PulseType};
pub use sequence::{PulseSequence, SequenceItem};
pub use settings::{DEFAULT_SAMPLING_RATE, SynthesisSettings};
pub use shape::{PulseParameters, Shape};
pub use waveform::Waveform;

pub use interval_calculator::interval::OrderedRange;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(
        "Shape is not bound to any pulse parameters, waveforms cannot be generated before the pulse duration is known"
    )]
    UninitializedShape,

    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    #[error("Shape `{0}` not found")]
    UnknownShape(String),

    #[error("Shape `{shape}` expects {expected} parameter(s), got {found}")]
    ShapeArity {
        shape: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Malformed shape expression `{0}`")]
    MalformedShape(String),

    #[error("Invalid synthesis settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn new(msg: &str) -> Self {
        Error::Anyhow(anyhow::anyhow!(msg.to_string()))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
