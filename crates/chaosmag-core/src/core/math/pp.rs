use super::bspline::BsplineError;
use serde::{Deserialize, Serialize};

/// Piecewise polynomial of a vector-valued function of time.
///
/// On piece `i` (`breaks[i] <= t < breaks[i + 1]`) the value of dimension `d`
/// is `sum_j c[i][j][d] * (t - breaks[i])^j`, with powers in ascending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiecewisePolynomial {
    breaks: Vec<f64>,
    order: usize,
    dim: usize,
    coefs: Vec<f64>,
}

fn falling_factorial(j: usize, d: usize) -> f64 {
    ((j + 1 - d)..=j).map(|v| v as f64).product()
}

impl PiecewisePolynomial {
    /// Builds a piecewise polynomial from `coefs` laid out as
    /// `[piece][power][dim]` (row-major).
    pub fn new(
        breaks: Vec<f64>,
        order: usize,
        dim: usize,
        coefs: Vec<f64>,
    ) -> Result<Self, BsplineError> {
        if order == 0 {
            return Err(BsplineError::InvalidOrder(order));
        }
        if breaks.len() < 2 {
            return Err(BsplineError::TooFewBreaks(breaks.len()));
        }
        if breaks.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(BsplineError::UnsortedBreaks);
        }
        let expected = (breaks.len() - 1) * order * dim;
        if coefs.len() != expected {
            return Err(BsplineError::ShapeMismatch {
                expected,
                found: coefs.len(),
            });
        }
        Ok(Self {
            breaks,
            order,
            dim,
            coefs,
        })
    }

    /// A single-piece polynomial that is constant on `[start, end]`.
    pub fn constant(start: f64, end: f64, values: &[f64]) -> Result<Self, BsplineError> {
        Self::new(vec![start, end], 1, values.len(), values.to_vec())
    }

    pub fn breaks(&self) -> &[f64] {
        &self.breaks
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn pieces(&self) -> usize {
        self.breaks.len() - 1
    }

    pub fn start(&self) -> f64 {
        self.breaks[0]
    }

    pub fn end(&self) -> f64 {
        self.breaks[self.breaks.len() - 1]
    }

    pub fn coefs(&self) -> &[f64] {
        &self.coefs
    }

    #[inline]
    pub fn coef(&self, piece: usize, power: usize, d: usize) -> f64 {
        self.coefs[(piece * self.order + power) * self.dim + d]
    }

    /// Index of the piece containing `t`; times outside the breaks map to
    /// the first or last piece.
    pub fn piece_index(&self, t: f64) -> usize {
        let last = self.pieces() - 1;
        match self.breaks[1..self.breaks.len() - 1]
            .binary_search_by(|b| b.partial_cmp(&t).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(i) => (i + 1).min(last),
            Err(i) => i.min(last),
        }
    }

    /// Evaluates the `deriv`-th time derivative at `t` (time units of the
    /// breaks). Outside the breaks the polynomial of the nearest end piece is
    /// continued.
    pub fn evaluate(&self, t: f64, deriv: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.dim];
        if deriv >= self.order {
            return out;
        }
        let piece = self.piece_index(t);
        let dt = t - self.breaks[piece];
        for power in deriv..self.order {
            let factor = falling_factorial(power, deriv) * dt.powi((power - deriv) as i32);
            for (d, value) in out.iter_mut().enumerate() {
                *value += factor * self.coef(piece, power, d);
            }
        }
        out
    }

    /// Taylor polynomial of degree `degree` around `t0`, evaluated at `t` for
    /// the `deriv`-th derivative. Used to extrapolate beyond the end points.
    pub fn taylor_at(&self, t0: f64, degree: usize, t: f64, deriv: usize) -> Vec<f64> {
        let mut out = vec![0.0; self.dim];
        if deriv > degree {
            return out;
        }
        let dt = t - t0;
        for j in deriv..=degree {
            let derivative = self.evaluate(t0, j);
            let factor = dt.powi((j - deriv) as i32)
                / (1..=(j - deriv)).map(|v| v as f64).product::<f64>();
            for (value, dj) in out.iter_mut().zip(&derivative) {
                *value += factor * dj;
            }
        }
        out
    }

    pub fn evaluate_many(&self, times: &[f64], deriv: usize) -> Vec<Vec<f64>> {
        times.iter().map(|&t| self.evaluate(t, deriv)).collect()
    }
}

/// Evaluates piecewise polynomial data given as raw arrays.
pub fn synth_from_pp(
    breaks: &[f64],
    order: usize,
    coefs: &[f64],
    dim: usize,
    times: &[f64],
    deriv: usize,
) -> Result<Vec<Vec<f64>>, BsplineError> {
    let pp = PiecewisePolynomial::new(breaks.to_vec(), order, dim, coefs.to_vec())?;
    Ok(pp.evaluate_many(times, deriv))
}
