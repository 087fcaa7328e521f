// 📊 Trend reports - period filtering and chart-ready series
// Everything here is derived in memory from a slice of stored observations.

use chrono::{DateTime, Duration, Utc, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::Observation;
use crate::pricing::{self, Classification, WEEKS_PER_MONTH};

// ============================================================================
// ANALYSIS PERIOD
// ============================================================================

/// How far back a trend view looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    All,
    LastWeek,
    LastTwoWeeks,
    LastMonth,
    TwoMonths,
    ThreeMonths,
    FourMonths,
}

impl Period {
    /// Display/cycling order for the dashboard
    pub const ALL: [Period; 7] = [
        Period::All,
        Period::LastWeek,
        Period::LastTwoWeeks,
        Period::LastMonth,
        Period::TwoMonths,
        Period::ThreeMonths,
        Period::FourMonths,
    ];

    /// Cutoff in days; `None` means no cutoff.
    pub fn days(&self) -> Option<u32> {
        match self {
            Period::All => None,
            Period::LastWeek => Some(7),
            Period::LastTwoWeeks => Some(15),
            Period::LastMonth => Some(30),
            Period::TwoMonths => Some(60),
            Period::ThreeMonths => Some(90),
            Period::FourMonths => Some(120),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::All => "All records",
            Period::LastWeek => "Last week",
            Period::LastTwoWeeks => "Last 15 days",
            Period::LastMonth => "Last month",
            Period::TwoMonths => "Last 2 months",
            Period::ThreeMonths => "Last 3 months",
            Period::FourMonths => "Last 4 months",
        }
    }
}

/// In-memory counterpart of `db::observations_since`, for data already
/// loaded into the dashboard.
pub fn filter_by_period(observations: &[Observation], period: Period) -> Vec<Observation> {
    match period.days() {
        None => observations.to_vec(),
        Some(days) => {
            let cutoff = Utc::now() - Duration::days(i64::from(days));
            observations
                .iter()
                .filter(|obs| obs.recorded_at >= cutoff)
                .cloned()
                .collect()
        }
    }
}

// ============================================================================
// TREND REPORT
// ============================================================================

/// Chart-ready views over a set of observations, in insertion-time order.
pub struct TrendReport {
    observations: Vec<Observation>,
}

/// Headline numbers for the status panel and the stats endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TrendSummary {
    pub total_observations: usize,
    pub with_elasticity: usize,
    pub mean_elasticity: Option<f64>,
    pub latest_elasticity: Option<f64>,
    pub latest_classification: Classification,
}

impl TrendReport {
    pub fn new(observations: Vec<Observation>) -> Self {
        TrendReport { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Points for the elasticity trend line; rows that never got a computed
    /// elasticity are skipped rather than drawn as zero.
    pub fn elasticity_series(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.observations
            .iter()
            .filter_map(|obs| obs.elasticity.map(|epd| (obs.recorded_at, epd)))
            .collect()
    }

    /// (time, start, end) price pairs for the price-evolution chart.
    pub fn price_series(&self) -> Vec<(DateTime<Utc>, f64, f64)> {
        self.observations
            .iter()
            .map(|obs| (obs.recorded_at, obs.price_start, obs.price_end))
            .collect()
    }

    /// (time, start, end) quantity pairs for the sales-comparison chart.
    pub fn quantity_series(&self) -> Vec<(DateTime<Utc>, f64, f64)> {
        self.observations
            .iter()
            .map(|obs| (obs.recorded_at, obs.quantity_start, obs.quantity_end))
            .collect()
    }

    /// Distribution of computed elasticity values, bucketed by `bucket_width`.
    /// Returns (bucket lower bound, count) sorted by bound. Empty when no
    /// elasticity has been computed yet or the width is not positive.
    pub fn sensitivity_histogram(&self, bucket_width: f64) -> Vec<(f64, usize)> {
        if bucket_width <= 0.0 || !bucket_width.is_finite() {
            return Vec::new();
        }

        let mut buckets: BTreeMap<i64, usize> = BTreeMap::new();
        for obs in &self.observations {
            if let Some(epd) = obs.elasticity {
                let index = (epd / bucket_width).floor() as i64;
                *buckets.entry(index).or_insert(0) += 1;
            }
        }

        buckets
            .into_iter()
            .map(|(index, count)| (index as f64 * bucket_width, count))
            .collect()
    }

    pub fn summary(&self) -> TrendSummary {
        let computed: Vec<f64> = self
            .observations
            .iter()
            .filter_map(|obs| obs.elasticity)
            .collect();

        let mean_elasticity = if computed.is_empty() {
            None
        } else {
            Some(computed.iter().sum::<f64>() / computed.len() as f64)
        };

        let latest_elasticity = computed.last().copied();

        TrendSummary {
            total_observations: self.observations.len(),
            with_elasticity: computed.len(),
            mean_elasticity,
            latest_elasticity,
            latest_classification: pricing::classify(latest_elasticity),
        }
    }
}

// ============================================================================
// WEEKLY SALES LOG
// ============================================================================

/// Seven per-day sales counters, projected to a month-equivalent figure.
#[derive(Debug, Clone, Default)]
pub struct WeeklySales {
    counts: [u32; 7],
}

impl WeeklySales {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, day: Weekday, sold: u32) {
        self.counts[day.num_days_from_monday() as usize] = sold;
    }

    pub fn sold_on(&self, day: Weekday) -> u32 {
        self.counts[day.num_days_from_monday() as usize]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// Week total scaled by the average number of weeks in a month.
    pub fn monthly_estimate(&self) -> f64 {
        f64::from(self.total()) * WEEKS_PER_MONTH
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn obs_with(elasticity: Option<f64>, days_ago: i64) -> Observation {
        let mut obs = Observation::new(5.0, 6.0, 100.0, 80.0);
        obs.recorded_at = Utc::now() - Duration::days(days_ago);
        obs.elasticity = elasticity;
        obs
    }

    #[test]
    fn test_period_day_mapping() {
        let days: Vec<Option<u32>> = Period::ALL.iter().map(|p| p.days()).collect();
        assert_eq!(
            days,
            vec![
                None,
                Some(7),
                Some(15),
                Some(30),
                Some(60),
                Some(90),
                Some(120)
            ]
        );
    }

    #[test]
    fn test_filter_by_period() {
        let observations = vec![obs_with(None, 40), obs_with(None, 2)];

        assert_eq!(filter_by_period(&observations, Period::All).len(), 2);
        assert_eq!(filter_by_period(&observations, Period::LastWeek).len(), 1);
        assert_eq!(filter_by_period(&observations, Period::TwoMonths).len(), 2);
    }

    #[test]
    fn test_elasticity_series_skips_unset_rows() {
        let report = TrendReport::new(vec![
            obs_with(Some(-1.2), 3),
            obs_with(None, 2),
            obs_with(Some(-0.4), 1),
        ]);

        let series = report.elasticity_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].1, -1.2);
        assert_eq!(series[1].1, -0.4);
    }

    #[test]
    fn test_summary() {
        let report = TrendReport::new(vec![
            obs_with(Some(-1.5), 3),
            obs_with(None, 2),
            obs_with(Some(-0.5), 1),
        ]);

        let summary = report.summary();
        assert_eq!(summary.total_observations, 3);
        assert_eq!(summary.with_elasticity, 2);
        assert!((summary.mean_elasticity.unwrap() - (-1.0)).abs() < 1e-9);
        assert_eq!(summary.latest_elasticity, Some(-0.5));
        // -0.5 sits in the loyal-demand band
        assert_eq!(
            summary.latest_classification.category,
            crate::pricing::Category::Success
        );
    }

    #[test]
    fn test_summary_with_no_data() {
        let report = TrendReport::new(Vec::new());
        let summary = report.summary();

        assert_eq!(summary.total_observations, 0);
        assert_eq!(summary.mean_elasticity, None);
        assert_eq!(
            summary.latest_classification.category,
            crate::pricing::Category::Info
        );
    }

    #[test]
    fn test_sensitivity_histogram() {
        let report = TrendReport::new(vec![
            obs_with(Some(-1.4), 4),
            obs_with(Some(-1.1), 3),
            obs_with(Some(-0.3), 2),
            obs_with(None, 1),
        ]);

        let histogram = report.sensitivity_histogram(0.5);
        // -1.4 and -1.1 share the [-1.5, -1.0) bucket, -0.3 lands in [-0.5, 0.0)
        assert_eq!(histogram, vec![(-1.5, 2), (-0.5, 1)]);
    }

    #[test]
    fn test_sensitivity_histogram_rejects_bad_width() {
        let report = TrendReport::new(vec![obs_with(Some(-1.0), 1)]);
        assert!(report.sensitivity_histogram(0.0).is_empty());
        assert!(report.sensitivity_histogram(-1.0).is_empty());
    }

    #[test]
    fn test_weekly_sales_monthly_estimate() {
        let mut week = WeeklySales::new();
        week.record(Weekday::Mon, 40);
        week.record(Weekday::Sat, 60);

        assert_eq!(week.total(), 100);
        assert!((week.monthly_estimate() - 430.0).abs() < 1e-9);
        assert_eq!(week.sold_on(Weekday::Sat), 60);
        assert_eq!(week.sold_on(Weekday::Sun), 0);
    }
}
