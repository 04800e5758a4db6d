//! # chaosmag
//!
//! Evaluation of the CHAOS geomagnetic field model: spherical-harmonic
//! synthesis of Gauss coefficients, piecewise-polynomial time dependence,
//! the magnetospheric field in rotating solar-magnetic frames and the field
//! it induces in a conducting Earth.
//!
//! ## Layers
//!
//! - **[`core`]: Numerics and formats.** Stateless functions: time
//!   conversion, Legendre functions, B-splines, SH synthesis, reference
//!   frames, rotation of expansions, induction response and file I/O.
//!
//! - **[`engine`]: Models.** `BaseModel`, `RcIndex`, `RotationSpectrum` and
//!   `ChaosModel`, with progress reporting and the unified `ModelError`.
//!
//! - **[`workflows`]: Entry points.** Complete procedures (model evaluation,
//!   spectrum computation) used by the command line and Python front ends.

pub mod core;
pub mod engine;
pub mod workflows;
