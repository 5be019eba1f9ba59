//! Levenberg parameter for a given trust radius (Moré, 1978).
//!
//! Finds `alpha ≥ 0` such that the solution `x` of
//! $\min \|\mathbf{J}x - b\|^2 + \alpha \|\mathbf{D}x\|^2$ satisfies
//! $\|\mathbf{D}x\| \approx \Delta$ within 10 %, or `alpha = 0` when the
//! Gauss-Newton step already fits.

use ndarray::Array1;

use crate::qr::PivotedQr;

const MAX_ITERATIONS: usize = 10;

/// Trial step and the Levenberg parameter that produced it.
#[derive(Debug, Clone)]
pub(crate) struct LevenbergStep {
    pub x: Array1<f64>,
    pub alpha: f64,
}

fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

/// Compute the step for trust radius `delta`, starting the search from the
/// previous `alpha`.
pub(crate) fn levenberg_step(
    qr: &PivotedQr,
    diag: &Array1<f64>,
    delta: f64,
    alpha: f64,
) -> LevenbergStep {
    let n = qr.n();
    let r = qr.r();
    let perm = qr.permutation();
    let dwarf = f64::MIN_POSITIVE;

    let gauss_newton = qr.gauss_newton_step();
    let mut scaled = diag * &gauss_newton;
    let mut dx_norm = norm(&scaled);
    let mut fp = dx_norm - delta;
    if fp <= 0.1 * delta {
        return LevenbergStep {
            x: gauss_newton,
            alpha: 0.0,
        };
    }

    // Lower bound from the Newton step, only available at full rank.
    let mut lower = 0.0;
    if !qr.is_rank_deficient() {
        let mut w = Array1::zeros(n);
        for j in 0..n {
            let l = perm[j];
            w[j] = diag[l] * (scaled[l] / dx_norm);
        }
        for j in 0..n {
            let sum: f64 = (0..j).map(|i| r[(i, j)] * w[i]).sum();
            w[j] = (w[j] - sum) / r[(j, j)];
        }
        let w_norm = norm(&w);
        lower = ((fp / delta) / w_norm) / w_norm;
    }

    let mut w = Array1::zeros(n);
    for j in 0..n {
        let sum: f64 = (0..=j).map(|i| r[(i, j)] * qr.qtb()[i]).sum();
        w[j] = sum / diag[perm[j]];
    }
    let gradient_norm = norm(&w);
    let mut upper = gradient_norm / delta;
    if upper == 0.0 {
        upper = dwarf / delta.min(0.1);
    }

    let mut alpha = alpha.max(lower).min(upper);
    if alpha == 0.0 {
        alpha = gradient_norm / dx_norm;
    }

    let mut x;
    let mut iteration = 0;
    loop {
        iteration += 1;
        if alpha == 0.0 {
            alpha = dwarf.max(0.001 * upper);
        }
        let damping = diag * alpha.sqrt();
        let solution = qr.solve_damped(&damping);
        x = solution.x;
        scaled = diag * &x;
        dx_norm = norm(&scaled);
        let previous_fp = fp;
        fp = dx_norm - delta;

        if fp.abs() <= 0.1 * delta
            || (lower == 0.0 && fp <= previous_fp && previous_fp < 0.0)
            || iteration == MAX_ITERATIONS
        {
            break;
        }

        // Newton correction.
        let mut w = Array1::zeros(n);
        for j in 0..n {
            let l = perm[j];
            w[j] = diag[l] * (scaled[l] / dx_norm);
        }
        for j in 0..n {
            w[j] /= solution.s_diag[j];
            let wj = w[j];
            for i in j + 1..n {
                w[i] -= solution.s[(i, j)] * wj;
            }
        }
        let w_norm = norm(&w);
        let correction = ((fp / delta) / w_norm) / w_norm;

        if fp > 0.0 {
            lower = lower.max(alpha);
        }
        if fp < 0.0 {
            upper = upper.min(alpha);
        }
        alpha = lower.max(alpha + correction);
    }

    log::trace!("Levenberg parameter {alpha:.3e} after {iteration} iteration(s)");
    LevenbergStep { x, alpha }
}
