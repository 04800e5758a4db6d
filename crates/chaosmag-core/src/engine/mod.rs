//! # Engine Module
//!
//! Stateful model objects assembled from the [`crate::core`] numerics: fitted
//! coefficient models, the RC index, rotation spectra and the complete CHAOS
//! model.
//!
//! ## Architecture
//!
//! - **Base Models** ([`model`]) - Piecewise-polynomial Gauss coefficients with extrapolation
//! - **Time Series** ([`timeseries`]) - RC index interpolation
//! - **Rotation Spectra** ([`spectrum`]) - Fourier representation of GSM/SM rotations
//! - **CHAOS Model** ([`chaos`]) - Internal, magnetospheric and induced sources
//! - **Requests** ([`config`]) - Validated evaluation and spectrum requests
//! - **Progress Monitoring** ([`progress`]) - Phase and task events for front ends
//! - **Error Handling** ([`error`]) - `ModelError` wrapping the lower-level errors

pub mod chaos;
pub mod config;
pub mod error;
pub mod model;
pub mod progress;
pub mod spectrum;
pub mod timeseries;
