/// Schmidt semi-normalized associated Legendre functions `P_n^m(cos θ)` and
/// their colatitude derivatives `dP_n^m/dθ` for `0 <= m <= n <= nmax`.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendreTable {
    nmax: usize,
    values: Vec<f64>,
    derivatives: Vec<f64>,
}

#[inline]
fn index(n: usize, m: usize) -> usize {
    n * (n + 1) / 2 + m
}

impl LegendreTable {
    pub fn nmax(&self) -> usize {
        self.nmax
    }

    /// `P_n^m`; zero for `m > n`.
    #[inline]
    pub fn p(&self, n: usize, m: usize) -> f64 {
        if m > n || n > self.nmax {
            0.0
        } else {
            self.values[index(n, m)]
        }
    }

    /// `dP_n^m / dθ` with θ in radians; zero for `m > n`.
    #[inline]
    pub fn dp(&self, n: usize, m: usize) -> f64 {
        if m > n || n > self.nmax {
            0.0
        } else {
            self.derivatives[index(n, m)]
        }
    }
}

/// Evaluates the Schmidt semi-normalized associated Legendre functions at
/// colatitude `theta` (degrees).
pub fn legendre_poly(nmax: usize, theta: f64) -> LegendreTable {
    let size = index(nmax, nmax) + 1;
    let mut values = vec![0.0; size];
    let mut derivatives = vec![0.0; size];

    let (sin_theta, cos_theta) = theta.to_radians().sin_cos();

    values[index(0, 0)] = 1.0;
    if nmax >= 1 {
        values[index(1, 1)] = sin_theta;
    }

    for m in 0..nmax {
        let seed = ((2 * m + 1) as f64).sqrt() * values[index(m, m)];
        values[index(m + 1, m)] = cos_theta * seed;
        if m > 0 {
            values[index(m + 1, m + 1)] = sin_theta * seed / ((2 * m + 2) as f64).sqrt();
        }
        for n in (m + 2)..=nmax {
            let d = (n * n - m * m) as f64;
            let e = (2 * n - 1) as f64;
            values[index(n, m)] = (e * cos_theta * values[index(n - 1, m)]
                - (d - e).sqrt() * values[index(n - 2, m)])
                / d.sqrt();
        }
    }

    let p = |n: usize, m: usize| if m > n { 0.0 } else { values[index(n, m)] };

    for n in 1..=nmax {
        let nf = n as f64;
        derivatives[index(n, 0)] = -(nf * (nf + 1.0) / 2.0).sqrt() * p(n, 1);
        derivatives[index(n, 1)] = ((2.0 * nf * (nf + 1.0)).sqrt() * p(n, 0)
            - ((nf + 2.0) * (nf - 1.0)).sqrt() * p(n, 2))
            / 2.0;
        for m in 2..=n {
            let mf = m as f64;
            derivatives[index(n, m)] = 0.5
                * (((nf + mf) * (nf - mf + 1.0)).sqrt() * p(n, m - 1)
                    - ((nf + mf + 1.0) * (nf - mf)).sqrt() * p(n, m + 1));
        }
    }

    LegendreTable {
        nmax,
        values,
        derivatives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::quadrature::gauss_legendre;
    use approx::assert_relative_eq;

    #[test]
    fn low_degree_functions_match_closed_forms() {
        let theta: f64 = 37.0;
        let (s, c) = theta.to_radians().sin_cos();
        let table = legendre_poly(3, theta);

        assert_relative_eq!(table.p(0, 0), 1.0);
        assert_relative_eq!(table.p(1, 0), c, epsilon = 1e-14);
        assert_relative_eq!(table.p(1, 1), s, epsilon = 1e-14);
        assert_relative_eq!(table.p(2, 0), 1.5 * c * c - 0.5, epsilon = 1e-14);
        assert_relative_eq!(table.p(2, 1), 3f64.sqrt() * c * s, epsilon = 1e-14);
        assert_relative_eq!(table.p(2, 2), 3f64.sqrt() / 2.0 * s * s, epsilon = 1e-14);
        assert_relative_eq!(table.p(3, 3), 10f64.sqrt() / 4.0 * s.powi(3), epsilon = 1e-14);

        assert_relative_eq!(table.dp(1, 0), -s, epsilon = 1e-14);
        assert_relative_eq!(table.dp(1, 1), c, epsilon = 1e-14);
        assert_relative_eq!(table.dp(2, 2), 3f64.sqrt() * s * c, epsilon = 1e-14);
    }

    #[test]
    fn derivatives_agree_with_finite_differences() {
        let nmax = 8;
        let theta = 63.0;
        let h = 1e-6;
        let table = legendre_poly(nmax, theta);
        let plus = legendre_poly(nmax, theta + h);
        let minus = legendre_poly(nmax, theta - h);
        let h_rad = h.to_radians();
        for n in 0..=nmax {
            for m in 0..=n {
                let fd = (plus.p(n, m) - minus.p(n, m)) / (2.0 * h_rad);
                assert_relative_eq!(table.dp(n, m), fd, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn functions_are_schmidt_normalized() {
        let nmax = 6;
        let (nodes, weights) = gauss_legendre(nmax + 1);
        for n in 0..=nmax {
            for m in 0..=n {
                let integral: f64 = nodes
                    .iter()
                    .zip(&weights)
                    .map(|(x, w)| {
                        let table = legendre_poly(nmax, x.acos().to_degrees());
                        w * table.p(n, m).powi(2)
                    })
                    .sum();
                let expected = (if m == 0 { 2.0 } else { 4.0 }) / (2 * n + 1) as f64;
                assert_relative_eq!(integral, expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn out_of_range_orders_evaluate_to_zero() {
        let table = legendre_poly(2, 45.0);
        assert_eq!(table.p(1, 2), 0.0);
        assert_eq!(table.dp(5, 0), 0.0);
    }
}
