//! Statistical primitives.
//!
//! Implements from first principles:
//! - Lanczos approximation for ln(Gamma)
//! - Regularized incomplete gamma functions P(a, x) and Q(a, x)
//! - Chi-square survival function
//! - Poisson pmf / cdf
//! - Error function and standard normal CDF
//! - Kolmogorov distribution survival function (for K-S p-values)
//! - Mean, population standard deviation, sample variance

// ─── Gamma family ────────────────────────────────────────────────────

/// Lanczos series (g = 7, nine terms) for the log-gamma function.
const LANCZOS_G: f64 = 7.0;
#[allow(clippy::excessive_precision)]
const LANCZOS: [f64; 9] = [
    0.99999999999980993,
    676.5203681218851,
    -1259.1392167224028,
    771.32342877765313,
    -176.61502916214059,
    12.507343278686905,
    -0.13857109526572012,
    9.9843695780195716e-6,
    1.5056327351493116e-7,
];

/// ln Γ(x) for x > 0; NaN otherwise.
///
/// Feeds the Poisson pmf (ln k!) and the incomplete gamma prefactor, whose
/// shape is half the chi-square degrees of freedom, so arguments below 0.5
/// only come from direct calls and go through Γ(x) = Γ(x + 1) / x.
pub fn ln_gamma(x: f64) -> f64 {
    if !(x > 0.0) {
        return f64::NAN;
    }
    if x < 0.5 {
        return ln_gamma(x + 1.0) - x.ln();
    }

    let z = x - 1.0;
    let series = LANCZOS
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS[0], |acc, (i, &c)| acc + c / (z + i as f64));
    let t = z + LANCZOS_G + 0.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (z + 0.5) * t.ln() - t + series.ln()
}

const MAX_ITER: usize = 500;
const EPSILON: f64 = 1e-15;
const TINY: f64 = 1e-300;

/// Regularized lower incomplete gamma P(a, x).
pub fn regularized_gamma_p(a: f64, x: f64) -> f64 {
    if a <= 0.0 || x < 0.0 || x.is_nan() {
        return f64::NAN;
    }
    if x == 0.0 {
        return 0.0;
    }
    if x < a + 1.0 {
        gamma_series(a, x)
    } else {
        1.0 - gamma_continued_fraction(a, x)
    }
}

/// Regularized upper incomplete gamma Q(a, x) = 1 - P(a, x).
///
/// Computed directly in the tail so small probabilities keep their precision.
pub fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if a <= 0.0 || x < 0.0 || x.is_nan() {
        return f64::NAN;
    }
    if x == 0.0 {
        return 1.0;
    }
    if x < a + 1.0 {
        1.0 - gamma_series(a, x)
    } else {
        gamma_continued_fraction(a, x)
    }
}

/// Series expansion of P(a, x), converges quickly for x < a + 1.
fn gamma_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut del = 1.0 / a;
    let mut sum = del;
    for _ in 0..MAX_ITER {
        ap += 1.0;
        del *= x / ap;
        sum += del;
        if del.abs() < sum.abs() * EPSILON {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

/// Continued fraction for Q(a, x) via modified Lentz, for x >= a + 1.
fn gamma_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=MAX_ITER {
        let i_f64 = i as f64;
        let an = -i_f64 * (i_f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < TINY {
            d = TINY;
        }
        c = b + an / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// P(X > x) for X ~ chi-square with `df` degrees of freedom.
pub fn chi_square_sf(x: f64, df: f64) -> f64 {
    if df <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 1.0;
    }
    regularized_gamma_q(df / 2.0, x / 2.0)
}

// ─── Poisson ─────────────────────────────────────────────────────────

/// P(X = k) for X ~ Poisson(lambda).
pub fn poisson_pmf(k: u32, lambda: f64) -> f64 {
    if lambda < 0.0 || lambda.is_nan() {
        return f64::NAN;
    }
    if lambda == 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    let k_f64 = f64::from(k);
    (k_f64 * lambda.ln() - lambda - ln_gamma(k_f64 + 1.0)).exp()
}

/// P(X <= k) for X ~ Poisson(lambda).
pub fn poisson_cdf(k: u32, lambda: f64) -> f64 {
    if lambda == 0.0 {
        return 1.0;
    }
    regularized_gamma_q(f64::from(k) + 1.0, lambda)
}

// ─── Normal ──────────────────────────────────────────────────────────

/// Error function, via erf(x) = P(1/2, x²).
pub fn erf(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    let p = regularized_gamma_p(0.5, x * x);
    if x > 0.0 {
        p
    } else {
        -p
    }
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

// ─── Kolmogorov ──────────────────────────────────────────────────────

/// Survival function of the Kolmogorov distribution, Q_KS(z) = P(K > z).
pub fn kolmogorov_sf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z <= 0.0 {
        return 1.0;
    }
    if z < 1.18 {
        // Small-z form: 1 - sqrt(2 pi)/z * sum exp(-(2j-1)^2 pi^2 / (8 z^2))
        let y = (-std::f64::consts::PI.powi(2) / (8.0 * z * z)).exp();
        let cdf = (2.0 * std::f64::consts::PI).sqrt() / z
            * (y + y.powi(9) + y.powi(25) + y.powi(49));
        (1.0 - cdf).clamp(0.0, 1.0)
    } else {
        // Alternating series: 2 sum (-1)^(j-1) exp(-2 j^2 z^2)
        let x = (-2.0 * z * z).exp();
        (2.0 * (x - x.powi(4) + x.powi(9))).clamp(0.0, 1.0)
    }
}

// ─── Descriptive ─────────────────────────────────────────────────────

/// Arithmetic mean, or None for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by n).
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Sample variance (divides by n - 1), or None for fewer than 2 values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    Some(values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64)
}
