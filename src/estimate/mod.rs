pub mod polyfit;
pub mod roots;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EtaError, Result};
use crate::store::Dataset;
use polyfit::{Polynomial, polyfit};

/// Number of evenly spaced points the fitted curve is sampled at between the
/// first sample and the predicted zero crossing.
pub const CURVE_SAMPLES: usize = 100;

pub const LABEL_FORMAT: &str = "%H:%M";

/// Which real root of the fitted polynomial counts as the zero crossing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RootPolicy {
    /// First real root in root-finder order (descending real part).
    #[default]
    First,
    /// Smallest real root.
    Earliest,
    /// Smallest real root at or after the last recorded sample.
    AfterLastSample,
}

impl RootPolicy {
    /// `roots` in root-finder order; `last` is the last sample's coordinate.
    pub fn select(self, roots: &[f64], last: f64) -> Option<f64> {
        match self {
            RootPolicy::First => roots.first().copied(),
            RootPolicy::Earliest => roots.iter().copied().reduce(f64::min),
            RootPolicy::AfterLastSample => roots
                .iter()
                .copied()
                .filter(|&r| r >= last)
                .reduce(f64::min),
        }
    }
}

/// Least-squares trend through a dataset.
///
/// The polynomial lives in `u = (t - t0) / span` where `t0` is the first
/// sample time and `span` the largest offset from it, which keeps the
/// Vandermonde system well conditioned at epoch-second magnitudes.
#[derive(Clone, Debug)]
pub struct TrendFit {
    pub degree: usize,
    origin: NaiveDateTime,
    span_secs: f64,
    poly: Polynomial,
    last_u: f64,
}

impl TrendFit {
    pub fn fit(dataset: &Dataset, degree: usize) -> Result<Self> {
        if degree == 0 {
            return Err(EtaError::InvalidDegree(degree));
        }
        if dataset.len() < degree + 1 {
            return Err(EtaError::InsufficientSamples {
                degree,
                samples: dataset.len(),
            });
        }

        let origin = dataset.times()[0];
        let offsets: Vec<f64> = dataset
            .times()
            .iter()
            .map(|t| seconds_between(origin, *t))
            .collect();
        let span = offsets.iter().fold(0.0f64, |m, o| m.max(o.abs()));
        let span_secs = if span > 0.0 { span } else { 1.0 };
        let us: Vec<f64> = offsets.iter().map(|o| o / span_secs).collect();

        let poly = polyfit(&us, dataset.remaining(), degree).ok_or_else(|| {
            EtaError::NoConvergence(format!(
                "sample times are not distinct enough for a degree {degree} fit"
            ))
        })?;
        debug!(degree, coefficients = ?poly.descending(), span_secs, "fitted trend");

        Ok(Self {
            degree,
            origin,
            span_secs,
            poly,
            last_u: us.last().copied().unwrap_or(0.0),
        })
    }

    /// Predicted remaining count at `t`.
    pub fn predict(&self, t: NaiveDateTime) -> f64 {
        self.poly
            .eval(seconds_between(self.origin, t) / self.span_secs)
    }

    /// Coefficients over seconds since 1970-01-01T00:00:00, highest power
    /// first. Precision degrades quickly with degree at these magnitudes, so
    /// these are for reporting only.
    pub fn epoch_coefficients(&self) -> Vec<f64> {
        let origin_secs = epoch_seconds(self.origin);
        self.poly
            .compose_affine(origin_secs, self.span_secs)
            .descending()
    }

    /// Real zero crossings, in root-finder order.
    pub fn zero_crossings(&self) -> Vec<NaiveDateTime> {
        roots::real_roots(&self.poly)
            .into_iter()
            .filter_map(|u| self.instant_at(u))
            .collect()
    }

    fn instant_at(&self, u: f64) -> Option<NaiveDateTime> {
        offset_instant(self.origin, u * self.span_secs)
    }

    /// Pick the zero crossing under `policy`, sample the curve up to it, and
    /// label the sampled point nearest zero.
    pub fn extrapolate(&self, policy: RootPolicy) -> Result<Estimate> {
        let real = roots::real_roots(&self.poly);
        let u_end = policy.select(&real, self.last_u).ok_or_else(|| {
            EtaError::NoConvergence(format!(
                "fitted degree {} curve has no real root matching {policy:?} ({} real roots)",
                self.degree,
                real.len()
            ))
        })?;
        let completion_instant = self.instant_at(u_end).ok_or_else(|| {
            EtaError::NoConvergence("zero crossing is outside the representable time range".into())
        })?;

        let mut curve_points = Vec::with_capacity(CURVE_SAMPLES);
        for i in 0..CURVE_SAMPLES {
            let u = u_end * i as f64 / (CURVE_SAMPLES - 1) as f64;
            if let Some(t) = self.instant_at(u) {
                curve_points.push((t, self.poly.eval(u)));
            }
        }
        let values: Vec<f64> = curve_points.iter().map(|(_, v)| *v).collect();
        let nearest = nearest_to_zero(&values).ok_or_else(|| {
            EtaError::NoConvergence("fitted curve has no numeric points".into())
        })?;
        let nearest_zero_instant = curve_points[nearest].0;
        debug!(%completion_instant, %nearest_zero_instant, "extrapolated zero crossing");

        Ok(Estimate {
            degree: self.degree,
            policy,
            completion_instant,
            nearest_zero_instant,
            completion_label: nearest_zero_instant.format(LABEL_FORMAT).to_string(),
            curve_points,
            coefficients: self.epoch_coefficients(),
        })
    }
}

/// Result of one fit-and-extrapolate run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Estimate {
    pub degree: usize,
    pub policy: RootPolicy,
    /// Selected root of the fitted polynomial.
    pub completion_instant: NaiveDateTime,
    /// Sampled curve point closest to zero remaining; the label comes from this.
    pub nearest_zero_instant: NaiveDateTime,
    pub completion_label: String,
    pub curve_points: Vec<(NaiveDateTime, f64)>,
    pub coefficients: Vec<f64>,
}

/// Fit a `degree` polynomial to the dataset and extrapolate to zero remaining.
pub fn fit_and_extrapolate(
    dataset: &Dataset,
    degree: usize,
    policy: RootPolicy,
) -> Result<Estimate> {
    TrendFit::fit(dataset, degree)?.extrapolate(policy)
}

/// Index of the smallest `|v|`, skipping NaN. Ties go to the earliest index.
pub fn nearest_to_zero(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if b <= v.abs() => best,
            _ => Some((i, v.abs())),
        })
        .map(|(i, _)| i)
}

/// Seconds since 1970-01-01T00:00:00, reading the naive time as UTC.
pub fn epoch_seconds(t: NaiveDateTime) -> f64 {
    t.and_utc().timestamp_micros() as f64 / 1e6
}

fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

fn offset_instant(origin: NaiveDateTime, secs: f64) -> Option<NaiveDateTime> {
    let micros = (secs * 1e6).round();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return None;
    }
    origin.checked_add_signed(Duration::microseconds(micros as i64))
}
