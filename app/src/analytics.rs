use serde::Serialize;

use crate::models::sensor_reading::ClimateSampleDao;

/// Relative change below this percentage counts as stable
const STABLE_PCT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rising,
    Falling,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub direction: Direction,
    /// Change over the window, relative to the mean
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub current: Option<f64>,
    pub avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub period_hours: i32,
    pub data_points: usize,
    pub temperature: MetricSummary,
    pub humidity: MetricSummary,
    pub vpd: MetricSummary,
    pub soil_moisture: MetricSummary,
}

/// Summarizes the climate samples of a window, oldest first
pub fn report(period_hours: i32, samples: &[ClimateSampleDao]) -> TrendReport {
    let series = |pick: fn(&ClimateSampleDao) -> Option<f64>| -> Vec<f64> {
        samples.iter().filter_map(pick).collect()
    };

    TrendReport {
        period_hours,
        data_points: samples.len(),
        temperature: summarize(&series(|s| s.air_temp), true),
        humidity: summarize(&series(|s| s.humidity), false),
        vpd: summarize(&series(|s| s.vpd), false),
        soil_moisture: summarize(&series(|s| s.soil_moisture), false),
    }
}

fn summarize(values: &[f64], with_range: bool) -> MetricSummary {
    let range = |fold: fn(f64, f64) -> f64| {
        values
            .iter()
            .copied()
            .reduce(fold)
            .filter(|_| with_range)
    };

    MetricSummary {
        current: values.last().copied(),
        avg: mean(values).map(round2),
        min: range(f64::min),
        max: range(f64::max),
        trend: trend(values),
    }
}

/// Least-squares slope over the sample index, scaled to the whole window
pub fn trend(values: &[f64]) -> Trend {
    let stable = Trend {
        direction: Direction::Stable,
        change_pct: 0.0,
    };
    let Some(mean_y) = mean(values).filter(|_| values.len() >= 2) else {
        return stable;
    };

    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let (cov, var) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(cov, var), (i, y)| {
            let dx = i as f64 - mean_x;
            (cov + dx * (y - mean_y), var + dx * dx)
        });
    let slope = cov / var;

    let change_pct = round2(slope * n / mean_y.max(1.0) * 100.0);
    let direction = if change_pct.abs() < STABLE_PCT {
        Direction::Stable
    } else if change_pct > 0.0 {
        Direction::Rising
    } else {
        Direction::Falling
    };
    Trend {
        direction,
        change_pct,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
