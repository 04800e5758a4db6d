use std::f64::consts::PI;

const MAX_NEWTON_ITERATIONS: usize = 100;
const NEWTON_TOLERANCE: f64 = 1e-15;

/// Nodes and weights of the `n`-point Gauss-Legendre rule on `[-1, 1]`.
///
/// The rule integrates polynomials of degree `2n - 1` exactly. Nodes are
/// returned in ascending order.
pub fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    if n == 0 {
        return (nodes, weights);
    }

    let nf = n as f64;
    for i in 0..n.div_ceil(2) {
        // Chebyshev-like initial guess for the i-th largest root
        let mut x = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();

        for _ in 0..MAX_NEWTON_ITERATIONS {
            let (p_n, p_n1) = legendre_pair(n, x);
            let derivative = nf * (x * p_n - p_n1) / (x * x - 1.0);
            let step = p_n / derivative;
            x -= step;
            if step.abs() < NEWTON_TOLERANCE {
                break;
            }
        }
        let (p_n, p_n1) = legendre_pair(n, x);
        let derivative = nf * (x * p_n - p_n1) / (x * x - 1.0);

        let weight = 2.0 / ((1.0 - x * x) * derivative * derivative);
        nodes[i] = -x;
        nodes[n - 1 - i] = x;
        weights[i] = weight;
        weights[n - 1 - i] = weight;
    }
    (nodes, weights)
}

/// Returns `(P_n(x), P_{n-1}(x))` of the ordinary Legendre polynomials.
fn legendre_pair(n: usize, x: f64) -> (f64, f64) {
    let mut p_prev = 1.0;
    let mut p = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let kf = k as f64;
        let next = ((2.0 * kf - 1.0) * x * p - (kf - 1.0) * p_prev) / kf;
        p_prev = p;
        p = next;
    }
    (p, p_prev)
}
