//! Running mean and standard deviation of scalar targets.
//!
//! Welford's online update keeps the statistics numerically stable over long
//! runs; `merge` combines statistics gathered by separate workers. The result
//! is fed into [`crate::NormalizedDeterministicVfunc::sync_stats`].

use serde::{Deserialize, Serialize};

use crate::error::StatsCodecError;

const DEFAULT_EPSILON: f64 = 1e-8;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunningMeanStd {
    mean: f64,
    /// Sum of squared deviations from the mean.
    var_sum: f64,
    count: f64,
    epsilon: f64,
}

impl Default for RunningMeanStd {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningMeanStd {
    pub fn new() -> Self {
        Self::with_epsilon(DEFAULT_EPSILON)
    }

    /// `epsilon` is the floor applied to the standard deviation.
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            mean: 0.0,
            var_sum: 0.0,
            count: 0.0,
            epsilon,
        }
    }

    pub fn update(&mut self, value: f32) {
        let x = value as f64;
        self.count += 1.0;
        let delta = x - self.mean;
        self.mean += delta / self.count;
        self.var_sum += delta * (x - self.mean);
    }

    pub fn update_batch(&mut self, values: &[f32]) {
        for &value in values {
            self.update(value);
        }
    }

    /// Parallel Welford combination of two sets of statistics.
    pub fn merge(&mut self, other: &RunningMeanStd) {
        if other.count == 0.0 {
            return;
        }
        if self.count == 0.0 {
            self.mean = other.mean;
            self.var_sum = other.var_sum;
            self.count = other.count;
            return;
        }
        let total = self.count + other.count;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count / total;
        self.var_sum += other.var_sum + delta * delta * self.count * other.count / total;
        self.count = total;
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance; 1 until two samples have been seen.
    pub fn variance(&self) -> f64 {
        if self.count < 2.0 {
            1.0
        } else {
            self.var_sum / self.count
        }
    }

    pub fn std(&self) -> f64 {
        self.variance().sqrt().max(self.epsilon)
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    pub fn reset(&mut self) {
        self.mean = 0.0;
        self.var_sum = 0.0;
        self.count = 0.0;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StatsCodecError> {
        Ok(bincode::serde::encode_to_vec(self, bincode::config::standard())?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StatsCodecError> {
        let (stats, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn update_tracks_population_statistics() {
        let mut stats = RunningMeanStd::new();
        stats.update_batch(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.count(), 8.0);
        assert!(approx(stats.mean(), 5.0));
        assert!(approx(stats.variance(), 4.0));
        assert!(approx(stats.std(), 2.0));
    }

    #[test]
    fn fresh_statistics_are_identity() {
        let stats = RunningMeanStd::default();
        assert_eq!(stats.mean(), 0.0);
        assert_eq!(stats.std(), 1.0);
    }

    #[test]
    fn merge_matches_sequential_updates() {
        let values = [1.0f32, -3.0, 2.5, 8.0, 0.5, 4.0];
        let mut sequential = RunningMeanStd::new();
        sequential.update_batch(&values);

        let mut left = RunningMeanStd::new();
        left.update_batch(&values[..2]);
        let mut right = RunningMeanStd::new();
        right.update_batch(&values[2..]);
        left.merge(&right);

        assert_eq!(left.count(), sequential.count());
        assert!(approx(left.mean(), sequential.mean()));
        assert!(approx(left.variance(), sequential.variance()));
    }

    #[test]
    fn merge_into_empty_copies_other() {
        let mut other = RunningMeanStd::new();
        other.update_batch(&[3.0, 5.0]);
        let mut empty = RunningMeanStd::new();
        empty.merge(&other);
        assert_eq!(empty, other);
    }

    #[test]
    fn bytes_restore_statistics() {
        let mut stats = RunningMeanStd::with_epsilon(1e-4);
        stats.update_batch(&[0.25, 0.75, 1.5]);
        let bytes = stats.to_bytes().expect("encode");
        let restored = RunningMeanStd::from_bytes(&bytes).expect("decode");
        assert_eq!(restored, stats);
        assert!(RunningMeanStd::from_bytes(&[]).is_err());
    }
}
