// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Envelope shapes and their synthesis into I/Q waveforms.
//!
//! A [`Shape`] holds no reference to the pulse it belongs to. Every
//! synthesis call receives the pulse quantities it needs as
//! [`PulseParameters`], sourced from the owning pulse at call time.
//!
//! Each shape has a canonical text form, `Name(param, ...)`, which is both
//! its [`Display`](fmt::Display) output and the input accepted by
//! [`FromStr`]. Parsing goes through a static registry of known shapes.

use std::f64::consts::{FRAC_1_SQRT_2, TAU};
use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use pulse_log::warn;

use crate::format::{format_float, format_grouped};
use crate::settings::check_sampling_rate;
use crate::waveform::Waveform;
use crate::{Error, Result};

/// The pulse quantities a shape needs to synthesize waveforms.
///
/// The default value is unbound (no duration) and synthesis from it fails
/// with [`Error::UninitializedShape`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PulseParameters {
    /// Duration in ns.
    pub duration: Option<i64>,
    pub amplitude: f64,
    /// Carrier frequency in Hz.
    pub frequency: i64,
    /// Phase in radians derived from the pulse start time.
    pub global_phase: f64,
    /// Phase in radians set on the pulse.
    pub relative_phase: f64,
}

impl PulseParameters {
    /// Number of samples covering the pulse duration, rounded half to even.
    ///
    /// Fails with [`Error::InvalidSettings`] for a non-finite or
    /// non-positive sampling rate.
    pub fn num_samples(&self, sampling_rate: f64) -> Result<usize> {
        check_sampling_rate(sampling_rate)?;
        let duration = self.duration.ok_or(Error::UninitializedShape)?;
        Ok((duration as f64 * sampling_rate).round_ties_even().max(0.0) as usize)
    }

    pub fn phase(&self) -> f64 {
        self.global_phase + self.relative_phase
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Constant envelope at the pulse amplitude.
    Rectangular,
    /// Gaussian envelope with standard deviation `duration / rel_sigma`.
    Gaussian { rel_sigma: f64 },
    /// DRAG-corrected Gaussian: the Q component is the scaled time
    /// derivative of the I component.
    ///
    /// See Motzoi F. et al., Phys. Rev. Lett., 103 (2009) 110501.
    Drag { rel_sigma: f64, beta: f64 },
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Rectangular => "Rectangular",
            Shape::Gaussian { .. } => "Gaussian",
            Shape::Drag { .. } => "Drag",
        }
    }

    /// Parameters in canonical order.
    pub fn parameters(&self) -> Vec<f64> {
        match self {
            Shape::Rectangular => vec![],
            Shape::Gaussian { rel_sigma } => vec![*rel_sigma],
            Shape::Drag { rel_sigma, beta } => vec![*rel_sigma, *beta],
        }
    }

    /// The envelope waveform of the I component.
    pub fn envelope_waveform_i(
        &self,
        params: &PulseParameters,
        sampling_rate: f64,
    ) -> Result<Waveform> {
        let num_samples = params.num_samples(sampling_rate)?;
        let data = match self {
            Shape::Rectangular => vec![params.amplitude; num_samples],
            Shape::Gaussian { rel_sigma } | Shape::Drag { rel_sigma, .. } => {
                gaussian(params.amplitude, *rel_sigma, num_samples)
            }
        };
        Ok(Waveform::with_label(
            data,
            self.envelope_label('I', num_samples, params),
        ))
    }

    /// The envelope waveform of the Q component.
    pub fn envelope_waveform_q(
        &self,
        params: &PulseParameters,
        sampling_rate: f64,
    ) -> Result<Waveform> {
        let num_samples = params.num_samples(sampling_rate)?;
        let data = match self {
            Shape::Rectangular | Shape::Gaussian { .. } => vec![0.0; num_samples],
            Shape::Drag { rel_sigma, beta } => {
                let sigma = num_samples as f64 / rel_sigma;
                let mu = center(num_samples);
                gaussian(params.amplitude, *rel_sigma, num_samples)
                    .into_iter()
                    .enumerate()
                    .map(|(x, i)| beta * (-(x as f64 - mu) / sigma.powi(2)) * i * sampling_rate)
                    .collect()
            }
        };
        Ok(Waveform::with_label(
            data,
            self.envelope_label('Q', num_samples, params),
        ))
    }

    pub fn envelope_waveforms(
        &self,
        params: &PulseParameters,
        sampling_rate: f64,
    ) -> Result<(Waveform, Waveform)> {
        Ok((
            self.envelope_waveform_i(params, sampling_rate)?,
            self.envelope_waveform_q(params, sampling_rate)?,
        ))
    }

    /// The I and Q waveforms mixed with the pulse carrier.
    ///
    /// Sample `n` at time `t = n / sampling_rate` (ns) is rotated by
    /// `θ = 2π·f·t + global_phase + relative_phase` and scaled by `1/√2`:
    /// `(I', Q') = R(θ)·(I, Q) / √2`.
    ///
    /// A carrier above the Nyquist frequency is reported but still
    /// synthesized.
    pub fn modulated_waveforms(
        &self,
        params: &PulseParameters,
        sampling_rate: f64,
    ) -> Result<(Waveform, Waveform)> {
        let frequency_ghz = params.frequency as f64 / 1e9;
        if 2.0 * frequency_ghz.abs() > sampling_rate {
            warn!(
                "The frequency {} Hz of a {} pulse is higher than the Nyquist frequency ({} Hz) for the sampling rate of {} GSa/s",
                format_grouped(params.frequency),
                self,
                (sampling_rate * 1e9 / 2.0) as i64,
                sampling_rate
            );
        }
        let (envelope_i, envelope_q) = self.envelope_waveforms(params, sampling_rate)?;
        let num_samples = envelope_i.len();
        let phase = params.phase();

        let (modulated_i, modulated_q): (Vec<f64>, Vec<f64>) = envelope_i
            .data()
            .iter()
            .zip(envelope_q.data())
            .enumerate()
            .map(|(n, (&i, &q))| {
                let time = n as f64 / sampling_rate;
                let carrier = Complex64::from_polar(FRAC_1_SQRT_2, TAU * frequency_ghz * time + phase);
                let sample = Complex64::new(i, q) * carrier;
                (sample.re, sample.im)
            })
            .unzip();

        Ok((
            Waveform::with_label(
                modulated_i,
                self.modulated_label('I', num_samples, params),
            ),
            Waveform::with_label(
                modulated_q,
                self.modulated_label('Q', num_samples, params),
            ),
        ))
    }

    fn envelope_label(&self, component: char, num_samples: usize, params: &PulseParameters) -> String {
        format!(
            "Envelope_Waveform_{component}(num_samples = {num_samples}, amplitude = {}, shape = {self})",
            format_float(params.amplitude),
        )
    }

    fn modulated_label(&self, component: char, num_samples: usize, params: &PulseParameters) -> String {
        format!(
            "Modulated_Waveform_{component}(num_samples = {num_samples}, amplitude = {}, shape = {self}, frequency = {}, phase = {})",
            format_float(params.amplitude),
            format_grouped(params.frequency),
            format_float(params.phase()),
        )
    }
}

fn center(num_samples: usize) -> f64 {
    (num_samples as f64 - 1.0) / 2.0
}

fn gaussian(amplitude: f64, rel_sigma: f64, num_samples: usize) -> Vec<f64> {
    let sigma = num_samples as f64 / rel_sigma;
    let mu = center(num_samples);
    (0..num_samples)
        .map(|x| amplitude * (-0.5 * (x as f64 - mu).powi(2) / sigma.powi(2)).exp())
        .collect()
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .parameters()
            .into_iter()
            .map(|param| param.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({params})", self.name())
    }
}

/// A registry entry: how to build a shape from its parsed parameters.
pub struct ShapeConstructor {
    pub name: &'static str,
    pub arity: usize,
    build: fn(&[f64]) -> Shape,
}

impl ShapeConstructor {
    pub fn build(&self, params: &[f64]) -> Result<Shape> {
        if params.len() != self.arity {
            return Err(Error::ShapeArity {
                shape: self.name,
                expected: self.arity,
                found: params.len(),
            });
        }
        Ok((self.build)(params))
    }
}

fn build_rectangular(_: &[f64]) -> Shape {
    Shape::Rectangular
}

fn build_gaussian(params: &[f64]) -> Shape {
    Shape::Gaussian {
        rel_sigma: params[0],
    }
}

fn build_drag(params: &[f64]) -> Shape {
    Shape::Drag {
        rel_sigma: params[0],
        beta: params[1],
    }
}

const SHAPE_REGISTRY: &[ShapeConstructor] = &[
    ShapeConstructor {
        name: "Rectangular",
        arity: 0,
        build: build_rectangular,
    },
    ShapeConstructor {
        name: "Gaussian",
        arity: 1,
        build: build_gaussian,
    },
    ShapeConstructor {
        name: "Drag",
        arity: 2,
        build: build_drag,
    },
];

/// Find the constructor registered under `name`.
pub fn lookup_shape(name: &str) -> Option<&'static ShapeConstructor> {
    SHAPE_REGISTRY.iter().find(|entry| entry.name == name)
}

pub fn registered_shapes() -> impl Iterator<Item = &'static str> {
    SHAPE_REGISTRY.iter().map(|entry| entry.name)
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for Shape {
    type Err = Error;

    /// Parse the canonical form `Name(p1, p2, ...)`. A bare `Name` is
    /// accepted for shapes without parameters.
    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        let (name, args) = match value.split_once('(') {
            Some((name, rest)) => {
                let args = rest
                    .strip_suffix(')')
                    .ok_or_else(|| Error::MalformedShape(value.to_string()))?;
                (name.trim(), args.trim())
            }
            None => (value, ""),
        };
        if !is_identifier(name) {
            return Err(Error::MalformedShape(value.to_string()));
        }
        let constructor = lookup_shape(name).ok_or_else(|| Error::UnknownShape(name.to_string()))?;
        let params = if args.is_empty() {
            vec![]
        } else {
            args.split(',')
                .map(|arg| {
                    arg.trim()
                        .parse::<f64>()
                        .map_err(|_| Error::MalformedShape(value.to_string()))
                })
                .collect::<Result<Vec<_>>>()?
        };
        constructor.build(&params)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    use super::*;

    fn params(duration: i64, amplitude: f64) -> PulseParameters {
        PulseParameters {
            duration: Some(duration),
            amplitude,
            ..Default::default()
        }
    }

    #[test]
    fn test_rectangular_envelopes() {
        let shape = Shape::Rectangular;
        let (i, q) = shape.envelope_waveforms(&params(40, 0.9), 1.0).unwrap();
        assert_eq!(i.len(), 40);
        assert_eq!(q.len(), 40);
        assert!(i.data().iter().all(|&s| s == 0.9));
        assert!(q.data().iter().all(|&s| s == 0.0));
        assert_eq!(
            i.label(),
            "Envelope_Waveform_I(num_samples = 40, amplitude = 0.9, shape = Rectangular())"
        );
        assert_eq!(
            q.label(),
            "Envelope_Waveform_Q(num_samples = 40, amplitude = 0.9, shape = Rectangular())"
        );
    }

    #[test]
    fn test_num_samples_rounding() {
        // 10 * 5.89824 = 58.9824
        assert_eq!(params(10, 1.0).num_samples(5.89824).unwrap(), 59);
        // Half to even
        assert_eq!(params(5, 1.0).num_samples(0.5).unwrap(), 2);
        assert_eq!(params(7, 1.0).num_samples(0.5).unwrap(), 4);
        assert_eq!(params(-5, 1.0).num_samples(1.0).unwrap(), 0);
    }

    #[test]
    fn test_unbound_shape() {
        let shape = Shape::Rectangular;
        let unbound = PulseParameters::default();
        assert!(matches!(
            shape.envelope_waveform_i(&unbound, 1.0),
            Err(Error::UninitializedShape)
        ));
        assert!(matches!(
            shape.modulated_waveforms(&unbound, 1.0),
            Err(Error::UninitializedShape)
        ));
    }

    #[test]
    fn test_gaussian_envelope() {
        let shape = Shape::Gaussian { rel_sigma: 5.0 };
        let i = shape.envelope_waveform_i(&params(41, 1.0), 1.0).unwrap();
        assert_eq!(i.len(), 41);
        // Peak at the center, symmetric flanks
        assert!((i.data()[20] - 1.0).abs() < 1e-12);
        assert!((i.data()[0] - i.data()[40]).abs() < 1e-12);
        let sigma: f64 = 41.0 / 5.0;
        let expected = (-0.5 * 20.0_f64.powi(2) / sigma.powi(2)).exp();
        assert!((i.data()[0] - expected).abs() < 1e-12);
        let q = shape.envelope_waveform_q(&params(41, 1.0), 1.0).unwrap();
        assert!(q.data().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_drag_quadrature_is_antisymmetric() {
        let shape = Shape::Drag {
            rel_sigma: 4.0,
            beta: 0.2,
        };
        let (i, q) = shape.envelope_waveforms(&params(21, 0.5), 2.0).unwrap();
        assert_eq!(i.len(), 42);
        assert_eq!(q.len(), 42);
        let n = q.len();
        for k in 0..n {
            assert!((q.data()[k] + q.data()[n - 1 - k]).abs() < 1e-12);
        }
        // Before the center the derivative term is positive for positive beta
        assert!(q.data()[0] > 0.0);
    }

    #[test]
    fn test_modulation_without_carrier_rotates_by_phase() {
        let shape = Shape::Rectangular;
        let params = PulseParameters {
            duration: Some(10),
            amplitude: 1.0,
            frequency: 0,
            global_phase: 0.0,
            relative_phase: std::f64::consts::FRAC_PI_2,
        };
        let (i, q) = shape.modulated_waveforms(&params, 1.0).unwrap();
        assert_eq!(i.len(), 10);
        for (&si, &sq) in i.data().iter().zip(q.data()) {
            assert!(si.abs() < 1e-12);
            assert!((sq - FRAC_1_SQRT_2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_modulation_with_carrier() {
        let shape = Shape::Rectangular;
        let params = PulseParameters {
            duration: Some(8),
            amplitude: 1.0,
            // A quarter turn per sample at 1 GSa/s
            frequency: 250_000_000,
            global_phase: 0.0,
            relative_phase: 0.0,
        };
        let (i, q) = shape.modulated_waveforms(&params, 1.0).unwrap();
        let expected_i = [1.0, 0.0, -1.0, 0.0, 1.0, 0.0, -1.0, 0.0];
        let expected_q = [0.0, 1.0, 0.0, -1.0, 0.0, 1.0, 0.0, -1.0];
        let scale = FRAC_1_SQRT_2;
        assert_eq!(i, Waveform::new(expected_i.iter().map(|x| x * scale).collect()));
        assert_eq!(q, Waveform::new(expected_q.iter().map(|x| x * scale).collect()));
        assert_eq!(
            i.label(),
            "Modulated_Waveform_I(num_samples = 8, amplitude = 1, shape = Rectangular(), frequency = 250_000_000, phase = 0)"
        );
    }

    #[test]
    fn test_modulation_above_nyquist_still_synthesizes() {
        let shape = Shape::Rectangular;
        let params = PulseParameters {
            duration: Some(4),
            amplitude: 0.3,
            frequency: 2_000_000_000,
            ..Default::default()
        };
        let (i, q) = shape.modulated_waveforms(&params, 1.0).unwrap();
        assert_eq!(i.len(), 4);
        assert_eq!(q.len(), 4);
    }

    struct CapturingLogger;

    /// Level and target of every record, tagged with the emitting thread.
    static RECORDS: Mutex<Vec<(ThreadId, log::Level, String)>> = Mutex::new(Vec::new());
    static LOGGER: CapturingLogger = CapturingLogger;

    impl log::Log for CapturingLogger {
        fn enabled(&self, _: &log::Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &log::Record<'_>) {
            RECORDS.lock().unwrap().push((
                thread::current().id(),
                record.level(),
                record.target().to_string(),
            ));
        }

        fn flush(&self) {}
    }

    /// Targets of the warnings logged by the current thread while running `f`.
    fn warnings_during(f: impl FnOnce()) -> Vec<String> {
        // Another test may have installed the logger already
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
        let seen = RECORDS.lock().unwrap().len();
        f();
        let current = thread::current().id();
        RECORDS.lock().unwrap()[seen..]
            .iter()
            .filter(|(id, level, _)| *id == current && *level == log::Level::Warn)
            .map(|(_, _, target)| target.clone())
            .collect()
    }

    #[test]
    fn test_nyquist_warning() {
        let params = |frequency| PulseParameters {
            duration: Some(4),
            amplitude: 0.3,
            frequency,
            ..Default::default()
        };
        let warnings = warnings_during(|| {
            Shape::Rectangular
                .modulated_waveforms(&params(2_000_000_000), 1.0)
                .unwrap();
        });
        assert_eq!(warnings, vec!["pulses.rust::pulses::shape".to_string()]);

        let warnings = warnings_during(|| {
            Shape::Rectangular
                .modulated_waveforms(&params(100_000_000), 1.0)
                .unwrap();
        });
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_invalid_sampling_rate() {
        let p = params(10, 0.5);
        for rate in [f64::INFINITY, f64::NAN, 0.0, -1.0] {
            assert!(matches!(
                Shape::Rectangular.envelope_waveform_i(&p, rate),
                Err(Error::InvalidSettings(_))
            ));
            assert!(matches!(
                Shape::Rectangular.modulated_waveforms(&p, rate),
                Err(Error::InvalidSettings(_))
            ));
        }
    }

    #[test]
    fn test_canonical_form() {
        assert_eq!(Shape::Rectangular.to_string(), "Rectangular()");
        assert_eq!(Shape::Gaussian { rel_sigma: 5.0 }.to_string(), "Gaussian(5)");
        assert_eq!(
            Shape::Drag {
                rel_sigma: 5.0,
                beta: 0.25
            }
            .to_string(),
            "Drag(5, 0.25)"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("Rectangular()".parse::<Shape>().unwrap(), Shape::Rectangular);
        assert_eq!("Rectangular".parse::<Shape>().unwrap(), Shape::Rectangular);
        assert_eq!(
            " Gaussian( 2.5 ) ".parse::<Shape>().unwrap(),
            Shape::Gaussian { rel_sigma: 2.5 }
        );
        assert_eq!(
            "Drag(5, -0.1)".parse::<Shape>().unwrap(),
            Shape::Drag {
                rel_sigma: 5.0,
                beta: -0.1
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "Triangle()".parse::<Shape>(),
            Err(Error::UnknownShape(name)) if name == "Triangle"
        ));
        assert!(matches!(
            "Gaussian()".parse::<Shape>(),
            Err(Error::ShapeArity {
                shape: "Gaussian",
                expected: 1,
                found: 0
            })
        ));
        assert!(matches!(
            "Rectangular(1)".parse::<Shape>(),
            Err(Error::ShapeArity { .. })
        ));
        assert!(matches!(
            "Gaussian(abc)".parse::<Shape>(),
            Err(Error::MalformedShape(_))
        ));
        assert!(matches!(
            "Gaussian(5".parse::<Shape>(),
            Err(Error::MalformedShape(_))
        ));
        assert!(matches!("".parse::<Shape>(), Err(Error::MalformedShape(_))));
    }

    #[test]
    fn test_round_trip_preserves_envelopes() {
        let shapes = [
            Shape::Rectangular,
            Shape::Gaussian { rel_sigma: 5.0 },
            Shape::Drag {
                rel_sigma: 4.0,
                beta: 0.125,
            },
        ];
        for shape in shapes {
            let parsed: Shape = shape.to_string().parse().unwrap();
            let p = params(30, 0.7);
            assert_eq!(
                shape.envelope_waveforms(&p, DEFAULT_RATE).unwrap(),
                parsed.envelope_waveforms(&p, DEFAULT_RATE).unwrap()
            );
        }
    }

    #[test]
    fn test_round_trip_keeps_full_precision() {
        let p = params(40, 0.8);
        for k in 0..2000 {
            let rel_sigma = 3.0 + k as f64 * 0.00100037;
            let shapes = [
                Shape::Gaussian { rel_sigma },
                Shape::Drag {
                    rel_sigma,
                    beta: 0.1 + k as f64 * 1.234567e-7,
                },
            ];
            for shape in shapes {
                let parsed: Shape = shape.to_string().parse().unwrap();
                assert_eq!(parsed, shape);
                assert_eq!(
                    shape.envelope_waveforms(&p, DEFAULT_RATE).unwrap(),
                    parsed.envelope_waveforms(&p, DEFAULT_RATE).unwrap()
                );
            }
        }
        assert_eq!(
            Shape::Gaussian {
                rel_sigma: 3.00200074
            }
            .to_string(),
            "Gaussian(3.00200074)"
        );
    }

    const DEFAULT_RATE: f64 = crate::settings::DEFAULT_SAMPLING_RATE;

    #[test]
    fn test_registry() {
        let names: Vec<_> = registered_shapes().collect();
        assert_eq!(names, vec!["Rectangular", "Gaussian", "Drag"]);
        assert_eq!(lookup_shape("Drag").unwrap().arity, 2);
        assert!(lookup_shape("drag").is_none());
    }
}
