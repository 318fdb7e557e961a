//! Sample statistics and grouped run summaries.
//!
//! The summary of a run is an overall mean and an unbiased (`n - 1`)
//! standard deviation over every sample, plus a count and mean per group.
//! Groups are declared up front so that a group nobody fell into still
//! shows up with a count of 0 and a mean of 0.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// Arithmetic mean. Fails on an empty sample.
pub fn mean(samples: &[f64]) -> Result<f64, MetricsError> {
    if samples.is_empty() {
        return Err(MetricsError::EmptySample("mean of zero samples".to_string()));
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Sample standard deviation with the `n - 1` divisor.
///
/// A single sample has no spread and yields 0. Fails on an empty sample.
pub fn sample_std_dev(samples: &[f64]) -> Result<f64, MetricsError> {
    let m = mean(samples)?;
    if samples.len() == 1 {
        return Ok(0.0);
    }
    let squared: f64 = samples.iter().map(|x| (x - m).powi(2)).sum();
    Ok((squared / (samples.len() - 1) as f64).sqrt())
}

/// Count and mean of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub label: String,
    pub count: usize,
    /// 0 when the group is empty.
    pub mean: f64,
}

/// Summary statistics of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub overall_mean: f64,
    pub std_dev: f64,
    /// One entry per declared group, in key order.
    pub groups: Vec<GroupSummary>,
}

impl RunSummary {
    /// Find a group by label.
    pub fn group(&self, label: &str) -> Option<&GroupSummary> {
        self.groups.iter().find(|g| g.label == label)
    }
}

/// Samples partitioned by key.
#[derive(Debug, Clone)]
pub struct GroupedSamples<K: Ord> {
    groups: BTreeMap<K, Vec<f64>>,
    all: Vec<f64>,
}

impl<K: Ord> Default for GroupedSamples<K> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
            all: Vec::new(),
        }
    }
}

impl<K: Ord> GroupedSamples<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `key` appears in the summary even if it never gets a sample.
    pub fn declare(&mut self, key: K) {
        self.groups.entry(key).or_default();
    }

    pub fn record(&mut self, key: K, value: f64) {
        self.groups.entry(key).or_default().push(value);
        self.all.push(value);
    }

    /// Samples recorded for `key`, in recording order.
    pub fn group(&self, key: &K) -> &[f64] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every sample, in recording order.
    pub fn all(&self) -> &[f64] {
        &self.all
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Summarize every group, labelling each with `label`.
    ///
    /// Fails with [`MetricsError::EmptySample`] if nothing was recorded.
    pub fn summarize(&self, label: impl Fn(&K) -> String) -> Result<RunSummary, MetricsError> {
        let overall_mean = mean(&self.all)?;
        let std_dev = sample_std_dev(&self.all)?;
        let groups = self
            .groups
            .iter()
            .map(|(key, samples)| GroupSummary {
                label: label(key),
                count: samples.len(),
                mean: mean(samples).unwrap_or(0.0),
            })
            .collect();

        Ok(RunSummary {
            total: self.all.len(),
            overall_mean,
            std_dev,
            groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let xs = [10.0, 20.0, 30.0];
        assert_eq!(mean(&xs).unwrap(), 20.0);
        assert!((sample_std_dev(&xs).unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_sample_has_zero_spread() {
        assert_eq!(sample_std_dev(&[42.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_sample_is_an_error() {
        assert!(matches!(mean(&[]), Err(MetricsError::EmptySample(_))));
        assert!(matches!(sample_std_dev(&[]), Err(MetricsError::EmptySample(_))));

        let grouped: GroupedSamples<u8> = GroupedSamples::new();
        assert!(matches!(
            grouped.summarize(|k| k.to_string()),
            Err(MetricsError::EmptySample(_))
        ));
    }

    #[test]
    fn test_grouped_summary() {
        let mut grouped = GroupedSamples::new();
        for key in 1..=4u8 {
            grouped.declare(key);
        }
        grouped.record(2, 10.0);
        grouped.record(1, 20.0);
        grouped.record(2, 30.0);

        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped.group(&2), &[10.0, 30.0]);
        assert!(grouped.group(&9).is_empty());

        let summary = grouped.summarize(|k| format!("Type {k}")).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.overall_mean, 20.0);
        assert!((summary.std_dev - 10.0).abs() < 1e-12);

        let labels: Vec<&str> = summary.groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Type 1", "Type 2", "Type 3", "Type 4"]);
        assert_eq!(summary.group("Type 1").unwrap().count, 1);
        assert_eq!(summary.group("Type 2").unwrap().mean, 20.0);
        // Declared but empty group: no division by zero.
        let empty = summary.group("Type 3").unwrap();
        assert_eq!((empty.count, empty.mean), (0, 0.0));
    }
}
