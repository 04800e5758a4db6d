use super::pp::PiecewisePolynomial;
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BsplineError {
    #[error("Spline order must be at least 1, got {0}")]
    InvalidOrder(usize),
    #[error("At least two breaks are required, got {0}")]
    TooFewBreaks(usize),
    #[error("Breaks must be strictly increasing")]
    UnsortedBreaks,
    #[error("Knots must be non-decreasing")]
    UnsortedKnots,
    #[error("{knots} knots cannot support a spline of order {order}")]
    TooFewKnots { knots: usize, order: usize },
    #[error("Coefficient shape mismatch: expected {expected} values, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
}

/// Clamped knot vector: the first and last break are repeated `order - 1`
/// additional times.
pub fn augment_breaks(breaks: &[f64], order: usize) -> Vec<f64> {
    let extra = order.saturating_sub(1);
    let mut knots = Vec::with_capacity(breaks.len() + 2 * extra);
    if let (Some(&first), Some(&last)) = (breaks.first(), breaks.last()) {
        knots.extend(std::iter::repeat_n(first, extra));
        knots.extend_from_slice(breaks);
        knots.extend(std::iter::repeat_n(last, extra));
    }
    knots
}

fn validate_knots(knots: &[f64], order: usize) -> Result<(), BsplineError> {
    if order == 0 {
        return Err(BsplineError::InvalidOrder(order));
    }
    if knots.len() <= order {
        return Err(BsplineError::TooFewKnots {
            knots: knots.len(),
            order,
        });
    }
    if knots.windows(2).any(|w| w[1] < w[0]) {
        return Err(BsplineError::UnsortedKnots);
    }
    if knots[order - 1] >= knots[knots.len() - order] {
        return Err(BsplineError::TooFewKnots {
            knots: knots.len(),
            order,
        });
    }
    Ok(())
}

/// Index `mu` of the non-empty knot interval `[t_mu, t_mu+1)` used to evaluate
/// at `x`. The right end point and anything beyond fall into the last
/// non-empty interval, anything before into the first.
fn knot_interval(x: f64, knots: &[f64], order: usize) -> usize {
    let lo = order - 1;
    let hi = knots.len() - order - 1;
    if x < knots[lo] {
        return (lo..=hi).find(|&i| knots[i] < knots[i + 1]).unwrap_or(lo);
    }
    let mut mu = lo;
    for i in lo..=hi {
        if knots[i] < knots[i + 1] && knots[i] <= x {
            mu = i;
        }
    }
    mu
}

#[inline]
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Values (or the `deriv`-th derivative) of all `len(knots) - order` B-spline
/// basis functions of the given order at `x`.
pub fn bspline_basis(
    x: f64,
    knots: &[f64],
    order: usize,
    deriv: usize,
) -> Result<Vec<f64>, BsplineError> {
    validate_knots(knots, order)?;
    let n_basis = knots.len() - order;
    if deriv >= order {
        return Ok(vec![0.0; n_basis]);
    }

    let mu = knot_interval(x, knots, order);
    let mut basis = vec![0.0; knots.len() - 1];
    basis[mu] = 1.0;

    let value_order = order - deriv;
    for j in 2..=value_order {
        for i in 0..knots.len() - j {
            let left = ratio(x - knots[i], knots[i + j - 1] - knots[i]) * basis[i];
            let right = ratio(knots[i + j] - x, knots[i + j] - knots[i + 1]) * basis[i + 1];
            basis[i] = left + right;
        }
        basis[knots.len() - j] = 0.0;
    }

    for j in (value_order + 1)..=order {
        let scale = (j - 1) as f64;
        for i in 0..knots.len() - j {
            basis[i] = scale
                * (ratio(basis[i], knots[i + j - 1] - knots[i])
                    - ratio(basis[i + 1], knots[i + j] - knots[i + 1]));
        }
        basis[knots.len() - j] = 0.0;
    }

    basis.truncate(n_basis);
    Ok(basis)
}

/// Collocation matrix with one row per point in `xs` and one column per basis
/// function.
pub fn colloc_matrix(
    xs: &[f64],
    knots: &[f64],
    order: usize,
    deriv: usize,
) -> Result<DMatrix<f64>, BsplineError> {
    validate_knots(knots, order)?;
    let n_basis = knots.len() - order;
    let mut matrix = DMatrix::zeros(xs.len(), n_basis);
    for (row, &x) in xs.iter().enumerate() {
        let basis = bspline_basis(x, knots, order, deriv)?;
        for (col, value) in basis.into_iter().enumerate() {
            matrix[(row, col)] = value;
        }
    }
    Ok(matrix)
}

/// Converts B-spline coefficients (one row per basis function, one column per
/// dimension) into the equivalent piecewise polynomial.
pub fn pp_from_bspline(
    coeffs: &DMatrix<f64>,
    knots: &[f64],
    order: usize,
) -> Result<PiecewisePolynomial, BsplineError> {
    validate_knots(knots, order)?;
    let n_basis = knots.len() - order;
    if coeffs.nrows() != n_basis {
        return Err(BsplineError::ShapeMismatch {
            expected: n_basis,
            found: coeffs.nrows(),
        });
    }
    let dim = coeffs.ncols();

    let mut breaks: Vec<f64> = knots[order - 1..=n_basis].to_vec();
    breaks.dedup();

    let mut coefs = Vec::with_capacity((breaks.len() - 1) * order * dim);
    let mut factorial = 1.0;
    let mut factorials = Vec::with_capacity(order);
    for j in 0..order {
        if j > 0 {
            factorial *= j as f64;
        }
        factorials.push(factorial);
    }

    for &left in &breaks[..breaks.len() - 1] {
        for (power, fact) in factorials.iter().enumerate() {
            let basis = bspline_basis(left, knots, order, power)?;
            for d in 0..dim {
                let value: f64 = basis
                    .iter()
                    .enumerate()
                    .map(|(i, b)| b * coeffs[(i, d)])
                    .sum();
                coefs.push(value / fact);
            }
        }
    }

    PiecewisePolynomial::new(breaks, order, dim, coefs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn augment_breaks_clamps_both_ends() {
        assert_eq!(
            augment_breaks(&[0.0, 1.0, 2.0], 3),
            vec![0.0, 0.0, 0.0, 1.0, 2.0, 2.0, 2.0]
        );
        assert_eq!(augment_breaks(&[0.0, 1.0], 1), vec![0.0, 1.0]);
    }

    #[test]
    fn basis_forms_partition_of_unity() {
        let knots = augment_breaks(&[0.0, 0.5, 1.3, 2.0, 4.0], 4);
        for &x in &[0.0, 0.1, 0.5, 1.0, 2.7, 4.0] {
            let basis = bspline_basis(x, &knots, 4, 0).unwrap();
            assert_eq!(basis.len(), knots.len() - 4);
            assert_relative_eq!(basis.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            assert!(basis.iter().all(|&b| b >= -1e-15));
        }
    }

    #[test]
    fn derivative_basis_sums_to_zero() {
        let knots = augment_breaks(&[0.0, 1.0, 3.0], 3);
        for deriv in 1..3 {
            let basis = bspline_basis(0.7, &knots, 3, deriv).unwrap();
            assert_relative_eq!(basis.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
        }
        let basis = bspline_basis(0.7, &knots, 3, 3).unwrap();
        assert!(basis.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn linear_basis_is_hat_function() {
        let knots = augment_breaks(&[0.0, 1.0, 2.0], 2);
        let basis = bspline_basis(0.25, &knots, 2, 0).unwrap();
        assert_relative_eq!(basis[0], 0.75);
        assert_relative_eq!(basis[1], 0.25);
        assert_relative_eq!(basis[2], 0.0);
        let slope = bspline_basis(0.25, &knots, 2, 1).unwrap();
        assert_relative_eq!(slope[0], -1.0);
        assert_relative_eq!(slope[1], 1.0);
        let end = bspline_basis(2.0, &knots, 2, 0).unwrap();
        assert_relative_eq!(end[2], 1.0);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let knots = augment_breaks(&[0.0, 0.4, 1.0, 1.5], 4);
        let (x, h) = (0.7, 1e-6);
        let slope = bspline_basis(x, &knots, 4, 1).unwrap();
        let plus = bspline_basis(x + h, &knots, 4, 0).unwrap();
        let minus = bspline_basis(x - h, &knots, 4, 0).unwrap();
        for i in 0..slope.len() {
            assert_relative_eq!(slope[i], (plus[i] - minus[i]) / (2.0 * h), epsilon = 1e-6);
        }
    }

    #[test]
    fn invalid_knots_are_rejected() {
        assert_eq!(
            bspline_basis(0.0, &[1.0, 0.0], 1, 0),
            Err(BsplineError::UnsortedKnots)
        );
        assert_eq!(
            bspline_basis(0.0, &[0.0, 1.0], 2, 0),
            Err(BsplineError::TooFewKnots { knots: 2, order: 2 })
        );
        assert_eq!(bspline_basis(0.0, &[0.0, 1.0], 0, 0), Err(BsplineError::InvalidOrder(0)));
    }

    #[test]
    fn pp_from_bspline_reproduces_spline() {
        let order = 4;
        let knots = augment_breaks(&[0.0, 0.5, 1.3, 2.0], order);
        let n_basis = knots.len() - order;
        let coeffs = DMatrix::from_fn(n_basis, 2, |i, d| (i as f64 + 1.0) * if d == 0 { 1.0 } else { -0.5 });
        let pp = pp_from_bspline(&coeffs, &knots, order).unwrap();
        assert_eq!(pp.breaks(), &[0.0, 0.5, 1.3, 2.0]);

        for &x in &[0.0, 0.3, 0.5, 1.1, 1.9, 2.0] {
            for deriv in 0..order {
                let basis = DMatrix::from_row_slice(
                    1,
                    n_basis,
                    &bspline_basis(x, &knots, order, deriv).unwrap(),
                );
                let expected = basis * &coeffs;
                let values = pp.evaluate(x, deriv);
                assert_relative_eq!(values[0], expected[(0, 0)], epsilon = 1e-10);
                assert_relative_eq!(values[1], expected[(0, 1)], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn colloc_matrix_has_one_row_per_point() {
        let knots = augment_breaks(&[0.0, 1.0, 2.0], 3);
        let matrix = colloc_matrix(&[0.0, 0.5, 1.5, 2.0], &knots, 3, 0).unwrap();
        assert_eq!(matrix.shape(), (4, 4));
        for row in matrix.row_iter() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
    }
}
