//! # Core Module
//!
//! Stateless numerics and data formats behind the field model evaluation.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Validated parameter dictionary (radii, dipole, data files)
//! - **Time** ([`time`]) - Modified Julian dates (epoch 2000) and decimal years
//! - **Numerics** ([`math`]) - Legendre functions, quadrature, B-splines and piecewise polynomials
//! - **Synthesis** ([`harmonics`]) - Potential field components from Gauss coefficients
//! - **Reference Frames** ([`coordinates`]) - GSM, SM, MAG, geodetic and local frames
//! - **Rotation** ([`rotation`]) - Re-expansion of harmonics in rotated frames
//! - **Induction** ([`induction`]) - Q-response of a radially layered Earth
//! - **File I/O** ([`io`]) - SHC coefficient files, RC index, conductivity and model manifests
//!
//! ## Conventions
//!
//! - Gauss coefficients are in natural order `g10, g11, h11, g20, ...`
//! - Positions are geocentric spherical: radius (km), colatitude and longitude (degrees)
//! - Field vectors are `(B_radius, B_theta, B_phi)` in nT
//! - Times are days since 2000-01-01 00:00 UTC

pub mod config;
pub mod coordinates;
pub mod harmonics;
pub mod induction;
pub mod io;
pub mod math;
pub mod rotation;
pub mod time;
