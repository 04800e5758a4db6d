pub mod coeffs;
pub mod config;
pub mod eval;
pub mod spectrum;
pub mod time;
