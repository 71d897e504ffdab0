pub mod chart;
pub mod pdf;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use tracing::info;

use crate::error::{EtaError, Result};
use crate::estimate::{Estimate, LABEL_FORMAT};
use crate::store::Dataset;

pub use chart::render_chart;

pub fn plot_file_name(degree: usize) -> String {
    format!("completion_time_k{degree}.pdf")
}

/// Write the scatter-plus-fit PDF for `estimate` into `dir`.
pub fn render_pdf(dataset: &Dataset, estimate: &Estimate, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(plot_file_name(estimate.degree));
    let bytes = pdf::render(dataset, estimate);
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).map_err(|e| EtaError::persistence(dir, e))?;
    }
    fs::write(&path, bytes).map_err(|e| EtaError::persistence(&path, e))?;
    info!(path = %path.display(), "saved plot");
    Ok(path)
}

/// Axis ranges shared by the PDF and terminal renderings. X is seconds after
/// `origin`; the x range stops at the predicted zero crossing and y starts
/// at zero.
#[derive(Clone, Debug)]
pub(crate) struct Frame {
    pub origin: NaiveDateTime,
    pub x_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    pub samples: Vec<(f64, f64)>,
    pub curve: Vec<(f64, f64)>,
}

impl Frame {
    pub fn new(dataset: &Dataset, estimate: &Estimate) -> Self {
        let origin = dataset
            .times()
            .first()
            .copied()
            .or_else(|| estimate.curve_points.first().map(|(t, _)| *t))
            .unwrap_or(estimate.completion_instant);
        let secs = |t: NaiveDateTime| (t - origin).num_milliseconds() as f64 / 1e3;

        let samples: Vec<(f64, f64)> = dataset
            .iter()
            .map(|s| (secs(s.timestamp), s.remaining))
            .collect();
        let curve: Vec<(f64, f64)> = estimate
            .curve_points
            .iter()
            .filter(|(_, v)| v.is_finite())
            .map(|(t, v)| (secs(*t), *v))
            .collect();

        let end = secs(estimate.completion_instant);
        let all_x = samples.iter().chain(&curve).map(|(x, _)| *x);
        let x_min = all_x.clone().fold(end.min(0.0), f64::min);
        let x_max = if end > x_min {
            end
        } else {
            all_x.fold(x_min, f64::max)
        };
        let x_max = if x_max > x_min { x_max } else { x_min + 60.0 };

        let y_top = samples
            .iter()
            .chain(&curve)
            .filter(|(x, _)| *x >= x_min && *x <= x_max)
            .map(|(_, y)| *y)
            .fold(0.0f64, f64::max);
        let y_max = if y_top > 0.0 { y_top * 1.05 } else { 1.0 };

        Self {
            origin,
            x_min,
            x_max,
            y_max,
            samples,
            curve,
        }
    }

    pub fn time_label(&self, x: f64) -> String {
        let t = self.origin + Duration::milliseconds((x * 1e3).round() as i64);
        t.format(LABEL_FORMAT).to_string()
    }

    /// Roughly `count` evenly spaced x positions across the range.
    pub fn x_ticks(&self, count: usize) -> Vec<f64> {
        let count = count.max(2);
        (0..count)
            .map(|i| self.x_min + (self.x_max - self.x_min) * i as f64 / (count - 1) as f64)
            .collect()
    }

    /// Tick values on a 1/2/5 step from zero up to `y_max`.
    pub fn y_ticks(&self, target: usize) -> Vec<f64> {
        let raw = self.y_max / target.max(1) as f64;
        let magnitude = 10f64.powf(raw.log10().floor());
        let step = [1.0, 2.0, 5.0, 10.0]
            .iter()
            .map(|m| m * magnitude)
            .find(|s| *s >= raw)
            .unwrap_or(raw);
        let mut ticks = Vec::new();
        let mut v = 0.0;
        while v <= self.y_max + step * 1e-9 {
            ticks.push(v);
            v += step;
        }
        ticks
    }
}
