//! # Workflows Module
//!
//! End-to-end procedures tying [`crate::engine`] and [`crate::core`] together.
//! Each workflow loads its resources, reports progress by phase and returns
//! plain result structs.
//!
//! - **Evaluation** ([`evaluate`]) - Build a CHAOS model from a manifest and
//!   evaluate the selected field sources at a set of points
//! - **Rotation Spectrum** ([`spectrum`]) - Compute and save the GSM or SM
//!   rotation spectrum, including the induced response of the mantle

pub mod evaluate;
pub mod spectrum;
