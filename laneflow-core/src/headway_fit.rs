//! Distribution fit for headway samples.
//!
//! Two candidate models are fitted by maximum likelihood and scored with a
//! one-sample Kolmogorov-Smirnov test:
//! - **Exponential**: the headway law of Poisson arrivals, rate = 1 / mean
//! - **Lognormal**: the usual shape for car-following headways, μ and σ over ln(h)
//!
//! The p-value uses the asymptotic Kolmogorov distribution with Stephens'
//! small-sample correction. Parameters are estimated from the same sample, so
//! the p-values are optimistic; they are meant for ranking the two models.

use serde::{Deserialize, Serialize};

use crate::error::InsufficientDataError;
use crate::stats::{kolmogorov_sf, mean, normal_cdf, population_std_dev};

/// Headway fit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadwayFitConfig {
    /// Minimum number of headways before a fit is attempted.
    pub min_headways: usize,
}

impl Default for HeadwayFitConfig {
    fn default() -> Self {
        Self { min_headways: 5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadwayModel {
    Exponential,
    Lognormal,
}

impl std::fmt::Display for HeadwayModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exponential => write!(f, "exponential"),
            Self::Lognormal => write!(f, "lognormal"),
        }
    }
}

/// K-S score of one fitted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsScore {
    pub statistic: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialFit {
    /// Arrivals per second.
    pub rate: f64,
    pub score: KsScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LognormalFit {
    pub mu: f64,
    pub sigma: f64,
    pub score: KsScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadwayDistributionFit {
    pub sample_size: usize,
    pub exponential: ExponentialFit,
    pub lognormal: LognormalFit,
    /// Model with the higher K-S p-value; exponential wins ties.
    pub best: HeadwayModel,
}

/// Fit exponential and lognormal models to a headway series.
pub fn fit_headway_distribution(
    headways: &[f64],
    config: &HeadwayFitConfig,
) -> Result<HeadwayDistributionFit, InsufficientDataError> {
    if headways.len() < config.min_headways {
        return Err(InsufficientDataError::TooFewHeadways {
            headways: headways.len(),
            required: config.min_headways,
        });
    }
    if headways.iter().any(|&h| !(h > 0.0)) {
        return Err(InsufficientDataError::NonPositiveHeadway);
    }

    let mut sorted = headways.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean_hw = mean(&sorted).ok_or(InsufficientDataError::TooFewHeadways {
        headways: 0,
        required: config.min_headways,
    })?;
    let rate = 1.0 / mean_hw;
    let exponential = ExponentialFit {
        rate,
        score: ks_score(&sorted, |x| 1.0 - (-rate * x).exp()),
    };

    let logs: Vec<f64> = sorted.iter().map(|h| h.ln()).collect();
    let mu = mean(&logs).unwrap_or(0.0);
    let sigma = population_std_dev(&logs).unwrap_or(0.0);
    let lognormal = LognormalFit {
        mu,
        sigma,
        score: ks_score(&sorted, |x| lognormal_cdf(x, mu, sigma)),
    };

    let best = if lognormal.score.p_value > exponential.score.p_value {
        HeadwayModel::Lognormal
    } else {
        HeadwayModel::Exponential
    };

    Ok(HeadwayDistributionFit {
        sample_size: sorted.len(),
        exponential,
        lognormal,
        best,
    })
}

fn lognormal_cdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if sigma > 0.0 {
        normal_cdf((x.ln() - mu) / sigma)
    } else if x.ln() >= mu {
        1.0
    } else {
        0.0
    }
}

/// One-sample K-S statistic over an ascending sample.
fn ks_score(sorted: &[f64], cdf: impl Fn(f64) -> f64) -> KsScore {
    let n = sorted.len() as f64;
    let statistic = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let f = cdf(x);
            let below = f - i as f64 / n;
            let above = (i + 1) as f64 / n - f;
            below.max(above)
        })
        .fold(0.0_f64, f64::max);

    let root_n = n.sqrt();
    let p_value = kolmogorov_sf((root_n + 0.12 + 0.11 / root_n) * statistic);
    KsScore { statistic, p_value }
}
