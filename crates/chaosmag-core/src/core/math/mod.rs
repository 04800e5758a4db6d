//! Numerical building blocks shared by the field synthesis and the coordinate
//! rotation code: associated Legendre functions, Gauss-Legendre quadrature,
//! B-splines and piecewise polynomials.

pub mod bspline;
pub mod legendre;
pub mod pp;
pub mod quadrature;
